//! Banking assistant CLI
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! export BANK_DATA_DIR="Data"
//!
//! # Interactive tool-chaining chat
//! cargo run --bin bank-assistant -- chat
//!
//! # One routed question
//! cargo run --bin bank-assistant -- ask "What was ACB ROE in 1Q24?"
//!
//! # Fill the commentary cache
//! cargo run --bin bank-assistant -- generate-comments --start 1Q24 --end 2Q24
//! ```

use anyhow::Context;
use bank_assistant::{
    Assistant, AssistantConfig, BulkOptions, ChainStatus, CommentaryGenerator, ParserKind, Session,
};
use bank_core::Period;
use bank_data::BankData;
use bank_llm::LLMProvider;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bank-assistant")]
#[command(about = "Question answering over Vietnamese banking data", long_about = None)]
struct Args {
    /// Data directory, overrides BANK_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat through the tool-chaining loop
    Chat,
    /// Answer one question through the router path
    Ask {
        question: String,
        #[arg(long, value_enum, default_value_t = ParserArg::Llm)]
        parser: ParserArg,
    },
    /// Print the tool schemas as JSON
    Tools,
    /// Generate missing bank commentary
    GenerateComments {
        /// First quarter, e.g. 1Q24
        #[arg(long)]
        start: Option<String>,
        /// Last quarter, e.g. 2Q24
        #[arg(long)]
        end: Option<String>,
        /// Regenerate comments that already exist
        #[arg(long)]
        overwrite: bool,
        /// Comma-separated tickers
        #[arg(long, value_delimiter = ',')]
        banks: Option<Vec<String>>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ParserArg {
    Llm,
    Rules,
}

impl From<ParserArg> for ParserKind {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Llm => Self::Llm,
            ParserArg::Rules => Self::Rules,
        }
    }
}

fn print_banner() {
    println!(
        r"
Vietnamese Banking Assistant

  Commands:
    /reset          - clear the conversation
    /export <file>  - save the conversation as JSON
    /tools          - list available tools
    /quit           - exit
"
    );
}

fn quarter_arg(raw: Option<String>) -> anyhow::Result<Option<Period>> {
    raw.map(|q| {
        let period = Period::parse(&q).with_context(|| format!("invalid quarter: {q}"))?;
        anyhow::ensure!(period.is_quarter(), "not a quarter: {q}");
        Ok(period)
    })
    .transpose()
}

async fn chat(assistant: &Assistant) -> anyhow::Result<()> {
    print_banner();
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            },
            Ok(_) => {},
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            },
        }

        let input = input.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => {
                println!("Goodbye!");
                break;
            },
            "/reset" => {
                session.reset();
                println!("Conversation cleared.\n");
                continue;
            },
            "/tools" => {
                for name in assistant.registry().names() {
                    println!("  {name}");
                }
                println!();
                continue;
            },
            _ => {},
        }
        if let Some(path) = input.strip_prefix("/export") {
            let path = path.trim();
            if path.is_empty() {
                eprintln!("Usage: /export <file>\n");
            } else {
                match session.export_to(path) {
                    Ok(()) => println!("Exported to {path}\n"),
                    Err(e) => eprintln!("Export failed: {e}\n"),
                }
            }
            continue;
        }

        match assistant.chat(&mut session, input).await {
            Ok(outcome) => {
                println!("{}\n", outcome.answer);
                if outcome.status == ChainStatus::CeilingReached {
                    info!(tool_calls = outcome.tool_calls(), "Question stopped at the tool call ceiling");
                }
            },
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.json_logs {
        bank_utils::init_tracing_json();
    } else {
        bank_utils::init_tracing();
    }

    let mut config = AssistantConfig::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    match args.command {
        Command::Chat => {
            let assistant = Assistant::from_config(config, ParserKind::Rules)?;
            chat(&assistant).await?;
        },
        Command::Ask { question, parser } => {
            let assistant = Assistant::from_config(config, parser.into())?;
            match assistant.ask(&question).await {
                Ok(routed) => println!("{}", routed.answer),
                Err(e) if e.is_generation() => {
                    return Err(anyhow::Error::new(e).context("data was retrieved but no answer could be generated"));
                },
                Err(e) => return Err(e.into()),
            }
        },
        Command::Tools => {
            let data = Arc::new(BankData::load(&config.data_dir)?);
            let prices = Arc::new(bank_assistant::TcbsPriceClient::new(&config)?);
            let registry = bank_assistant::build_registry(data, prices, config.price_concurrency)?;
            let functions: Vec<_> = registry.definitions().iter().map(|d| d.to_function_json()).collect();
            println!("{}", serde_json::to_string_pretty(&functions)?);
        },
        Command::GenerateComments {
            start,
            end,
            overwrite,
            banks,
        } => {
            let options = BulkOptions {
                start: quarter_arg(start)?,
                end: quarter_arg(end)?,
                overwrite,
                banks,
            };
            let data = BankData::load(&config.data_dir)?;
            let provider: Arc<dyn LLMProvider> = Arc::new(config.provider()?);
            let report = CommentaryGenerator::new(provider, &config).run(&data, &options).await?;
            println!(
                "Generated {} comments ({} already cached, {} without data, {} failed)",
                report.generated, report.already_cached, report.no_data, report.failed
            );
        },
    }
    Ok(())
}
