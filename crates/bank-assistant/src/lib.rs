//! Vietnamese banking data assistant
//!
//! Answers natural-language questions about Vietnamese banks from the CSV
//! datasets loaded by `bank-data`, in two ways:
//!
//! - Router path: a [`router`] turns the question into a [`QueryIntent`],
//!   the [`fetcher`] retrieves the metric table or commentary together with
//!   valuation context on a two-worker pool, and the [`response`] generator
//!   makes one model call for the answer.
//! - Tool loop: the model chains calls to the eleven [`tools`] through the
//!   [`orchestrator`], bounded by a ceiling on dispatched calls.
//!
//! [`commentary_generator`] fills the per-bank commentary cache in bulk.
//!
//! # Example
//!
//! ```rust,ignore
//! use bank_assistant::{Assistant, AssistantConfig, ParserKind, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AssistantConfig::from_env()?;
//!     let assistant = Assistant::from_config(config, ParserKind::Llm)?;
//!
//!     let routed = assistant.ask("What was ACB ROE in 1Q24?").await?;
//!     println!("{}", routed.answer);
//!
//!     let mut session = Session::new();
//!     let outcome = assistant.chat(&mut session, "Compare VCB and BID valuation").await?;
//!     println!("{}", outcome.answer);
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod batch;
pub mod commentary_generator;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod prices;
pub mod prompts;
pub mod response;
pub mod router;
pub mod session;
pub mod tools;

#[cfg(test)]
mod testing;

pub use assistant::{Assistant, ParserKind, RoutedAnswer};
pub use commentary_generator::{BulkOptions, BulkReport, CommentaryGenerator};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use fetcher::ParallelFetcher;
pub use orchestrator::{ChainOutcome, ChainStatus, ToolChainExecutor, ToolExecution};
pub use prices::{PriceSource, TcbsPriceClient};
pub use response::ResponseGenerator;
pub use router::{IntentParser, LlmQueryParser, QueryIntent, QueryMode, QueryRouter};
pub use session::Session;
pub use tools::build_registry;
