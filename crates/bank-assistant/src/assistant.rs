//! Assistant facade
//!
//! Wires the loaded data, the model provider and the price source into the
//! two ways of answering a question:
//!
//! - [`Assistant::ask`]: route the question, fetch the primary data and the
//!   optional valuation context in parallel, then generate one answer
//! - [`Assistant::chat`]: let the model chain tool calls inside a [`Session`]

use crate::batch::{self, CommentarySources};
use crate::config::AssistantConfig;
use crate::discovery::{self, QuantitativeData};
use crate::error::Result;
use crate::fetcher::{self, FetchTask, ParallelFetcher};
use crate::orchestrator::{ChainOutcome, ToolChainConfig, ToolChainExecutor};
use crate::prices::{PriceSource, TcbsPriceClient};
use crate::response::ResponseGenerator;
use crate::router::{IntentParser, LlmQueryParser, QueryIntent, QueryMode, QueryRouter};
use crate::session::Session;
use crate::tools::build_registry;
use bank_core::{Entity, Period};
use bank_data::dataset::{COMMENTS_FILE, KEY_ITEMS_FILE, SECTOR_ANALYSIS_FILE, VALUATION_FILE};
use bank_data::{BankData, CommentaryCache, Granularity, KeyItems, MetricTable, SectorAnalysisTable, ValuationTable};
use bank_llm::LLMProvider;
use bank_tools::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Answer used when the router path finds no rows for the question
pub const NO_DATA_ANSWER: &str =
    "No data found for this question. Try naming a bank or sector and a period that exists in the dataset.";

/// How questions are turned into intents on the router path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserKind {
    /// Model-backed JSON parser with the keyword router as fallback
    #[default]
    Llm,
    /// Keyword router only
    Rules,
}

/// Answer from the router path
#[derive(Debug, Clone)]
pub struct RoutedAnswer {
    pub answer: String,
    pub intent: QueryIntent,
    /// Whether the primary retrieval returned anything
    pub data_found: bool,
    pub valuation_included: bool,
}

/// Question-answering front door
pub struct Assistant {
    config: AssistantConfig,
    data: Arc<BankData>,
    parser: Arc<dyn IntentParser>,
    fetcher: ParallelFetcher,
    responder: ResponseGenerator,
    executor: ToolChainExecutor,
}

impl Assistant {
    /// Assemble from already-built parts
    pub fn new(
        config: AssistantConfig,
        data: Arc<BankData>,
        provider: Arc<dyn LLMProvider>,
        prices: Arc<dyn PriceSource>,
        parser_kind: ParserKind,
    ) -> Result<Self> {
        let registry = build_registry(Arc::clone(&data), prices, config.price_concurrency)?;
        let router = QueryRouter::with_tickers(data.sectors.tickers());
        let parser: Arc<dyn IntentParser> = match parser_kind {
            ParserKind::Llm => Arc::new(LlmQueryParser::new(
                Arc::clone(&provider),
                &config.parser_model,
                router,
            )),
            ParserKind::Rules => Arc::new(router),
        };

        info!(
            tools = registry.len(),
            parser = ?parser_kind,
            model = %config.model,
            "Assistant ready"
        );
        Ok(Self {
            fetcher: ParallelFetcher::from_config(&config),
            responder: ResponseGenerator::from_config(Arc::clone(&provider), &config),
            executor: ToolChainExecutor::new(provider, Arc::new(registry), ToolChainConfig::from_config(&config)),
            parser,
            data,
            config,
        })
    }

    /// Load the data directory and connect to the configured provider
    pub fn from_config(config: AssistantConfig, parser: ParserKind) -> Result<Self> {
        let data = Arc::new(BankData::load(&config.data_dir)?);
        let provider: Arc<dyn LLMProvider> = Arc::new(config.provider()?);
        let prices: Arc<dyn PriceSource> = Arc::new(TcbsPriceClient::new(&config)?);
        Self::new(config, data, provider, prices, parser)
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn data(&self) -> &BankData {
        &self.data
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Answer through the tool-chaining loop, recording into `session`
    pub async fn chat(&self, session: &mut Session, question: &str) -> Result<ChainOutcome> {
        session.ask(&self.executor, question).await
    }

    /// Answer through routing, parallel retrieval and one generation call.
    ///
    /// The primary and valuation retrievals read their files from the data
    /// directory on every call.
    pub async fn ask(&self, question: &str) -> Result<RoutedAnswer> {
        let latest = self.data.quarterly.latest_period();
        let intent = self.parser.parse(question, latest).await;
        let entities = self.entities(&intent);
        info!(
            mode = ?intent.mode,
            entities = entities.len(),
            valuation = intent.valuation,
            "Question routed"
        );

        let valuation_task = (intent.valuation && !entities.is_empty())
            .then(|| valuation_task(self.config.data_dir.clone(), entities.clone()));

        let (context, valuation) = match intent.mode {
            QueryMode::Quantitative => {
                let primary = quantitative_task(self.data_source(&intent), self.config.data_dir.clone(), intent.clone());
                let (data, valuation) = self.fetcher.fetch_pair(primary, valuation_task).await;
                (data.flatten().map(|d| d.table_text), valuation)
            },
            QueryMode::Qualitative => {
                let primary = qualitative_task(
                    self.config.data_dir.clone(),
                    entities,
                    intent.quarters(),
                    intent.has_sectors(),
                );
                let (text, valuation) = self.fetcher.fetch_pair(primary, valuation_task).await;
                (text.filter(|t| !t.is_empty()), valuation)
            },
        };
        let valuation = valuation.unwrap_or_default();

        let Some(context) = context else {
            warn!(mode = ?intent.mode, "No data found for question");
            return Ok(RoutedAnswer {
                answer: NO_DATA_ANSWER.to_string(),
                intent,
                data_found: false,
                valuation_included: false,
            });
        };

        let answer = self
            .responder
            .respond(intent.mode, question, &context, &valuation)
            .await?;
        Ok(RoutedAnswer {
            answer,
            data_found: true,
            valuation_included: !valuation.is_empty(),
            intent,
        })
    }

    /// Named entities, or every mapped bank for "all banks" questions
    fn entities(&self, intent: &QueryIntent) -> Vec<Entity> {
        if intent.all_banks && intent.entities.is_empty() {
            return self
                .data
                .sectors
                .tickers()
                .map(|t| Entity::Bank(t.to_string()))
                .collect();
        }
        intent.entities.clone()
    }

    fn data_source(&self, intent: &QueryIntent) -> PathBuf {
        match intent.granularity() {
            Granularity::Quarterly => self.data.quarterly.source().to_path_buf(),
            Granularity::Yearly => self.data.yearly.source().to_path_buf(),
        }
    }
}

fn quantitative_task(source: PathBuf, dir: PathBuf, intent: QueryIntent) -> FetchTask<Option<QuantitativeData>> {
    fetcher::task(move || {
        let table = MetricTable::load(&source)?;
        let key_items = KeyItems::load(&dir.join(KEY_ITEMS_FILE))?;
        Ok(discovery::discover(&table, &intent, &key_items))
    })
}

fn qualitative_task(dir: PathBuf, entities: Vec<Entity>, quarters: Vec<Period>, with_analysis: bool) -> FetchTask<String> {
    fetcher::task(move || {
        let comments = CommentaryCache::load_or_empty(&dir.join(COMMENTS_FILE))?;
        let analysis = if with_analysis {
            match SectorAnalysisTable::load(&dir.join(SECTOR_ANALYSIS_FILE)) {
                Ok(table) => Some(table),
                Err(e) if e.is_missing() => None,
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };
        let sources = CommentarySources {
            comments: Some(&comments),
            analysis: analysis.as_ref(),
        };
        Ok(batch::collect_commentary(&entities, &quarters, sources))
    })
}

fn valuation_task(dir: PathBuf, entities: Vec<Entity>) -> FetchTask<String> {
    fetcher::task(move || {
        let table = ValuationTable::load(&dir.join(VALUATION_FILE))?;
        Ok(match entities.as_slice() {
            [entity] => batch::valuation_context_single(&table, entity),
            _ => batch::valuation_context(&table, &entities),
        })
    })
}
