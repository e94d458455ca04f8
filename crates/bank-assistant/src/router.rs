//! Question routing
//!
//! Turns a free-text question into a [`QueryIntent`]: which entities, which
//! periods, which metrics, and whether valuation context or sector
//! components are needed. [`QueryRouter`] does this with keywords and
//! regular expressions; [`LlmQueryParser`] asks the model for JSON and falls
//! back to the router whenever the model call or its output is unusable.
//! Neither ever fails: unparseable text yields the default intent.

use crate::prompts;
use async_trait::async_trait;
use bank_core::{Entity, Period, SectorKind, latest_quarters};
use bank_data::Granularity;
use bank_llm::{CompletionRequest, LLMProvider};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Banks recognised in questions when no sector map is supplied
pub const KNOWN_TICKERS: [&str; 24] = [
    "VCB", "BID", "CTG", "TCB", "MBB", "VPB", "ACB", "STB", "HDB", "TPB", "SHB", "VIB", "LPB",
    "MSB", "OCB", "EIB", "SSB", "NAB", "BAB", "VAB", "PGB", "KLB", "NCB", "ABB",
];

/// Tickers that are also English words; matched only when written in capitals
const AMBIGUOUS_TICKERS: &[&str] = &["BID", "NAB"];

/// Quarters shown when a question names no period
pub const DEFAULT_WINDOW: usize = 4;

static QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:[1-4]Q\d{2}|Q[1-4]\s*20\d{2}|20\d{2}-Q[1-4])\b").expect("valid regex")
});
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b20\d{2}\b").expect("valid regex"));
static SUB_SECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:socb|private[\s_-]?[1-3])\b").expect("valid regex"));
static TICKER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z]{3}\b").expect("valid regex"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9/]+").expect("valid regex"));

const METRIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("NPL", &["npl", "non-performing"]),
    ("ROE", &["roe", "return on equity"]),
    ("ROA", &["roa", "return on assets"]),
    ("NIM", &["nim", "net interest margin"]),
    ("CAR", &["car", "capital adequacy"]),
    ("LDR", &["ldr", "loan deposit ratio", "loan-to-deposit"]),
    ("CIR", &["cir", "cost income ratio", "cost-to-income"]),
    ("Loan", &["loan", "loans", "lending"]),
    ("Deposit", &["deposit", "deposits"]),
    ("Provision expense", &["provision", "provisions", "provisioning"]),
    ("NPATMI", &["npatmi", "net profit"]),
];

const VALUATION_KEYWORDS: &[&str] = &[
    "valuation", "p/e", "p/b", "pe", "pb", "invest", "buy", "cheap", "expensive",
];
const COMPONENT_KEYWORDS: &[&str] = &["which", "among", "best", "worst", "rank"];
const QUALITATIVE_KEYWORDS: &[&str] = &["why", "outlook", "explain", "analysis", "comment"];
const LATEST_KEYWORDS: &[&str] = &["latest", "current"];
const ALL_BANKS_PHRASES: &[&str] = &["all banks", "all the banks", "every bank", "each bank"];

/// Whether the answer is built from numbers or from commentary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Quantitative,
    Qualitative,
}

/// Structured reading of a question
#[derive(Debug, Clone, PartialEq)]
pub struct QueryIntent {
    /// Banks and sectors named, in order of appearance
    pub entities: Vec<Entity>,
    /// Every individual bank rather than named entities
    pub all_banks: bool,
    /// Requested periods, oldest first; empty means no restriction
    pub timeframe: Vec<Period>,
    /// Requested metric names; empty means all metrics
    pub metrics: Vec<String>,
    pub valuation: bool,
    /// Sector questions that need the member banks as well
    pub need_components: bool,
    pub mode: QueryMode,
}

impl QueryIntent {
    /// Whole sector, most recent quarters, every metric
    pub fn default_for(latest: Option<Period>) -> Self {
        Self {
            entities: vec![Entity::Sector(SectorKind::Sector)],
            all_banks: false,
            timeframe: latest.map(|p| latest_quarters(p, DEFAULT_WINDOW)).unwrap_or_default(),
            metrics: Vec::new(),
            valuation: false,
            need_components: false,
            mode: QueryMode::Quantitative,
        }
    }

    /// Table the numbers come from: yearly only when every requested
    /// period is a full year
    pub fn granularity(&self) -> Granularity {
        if !self.timeframe.is_empty() && self.timeframe.iter().all(|p| !p.is_quarter()) {
            Granularity::Yearly
        } else {
            Granularity::Quarterly
        }
    }

    /// Requested quarters; full years expand to their four quarters
    pub fn quarters(&self) -> Vec<Period> {
        let mut quarters: Vec<Period> = self
            .timeframe
            .iter()
            .flat_map(|p| match *p {
                Period::Quarter { .. } => vec![*p],
                Period::Year(year) => latest_quarters(Period::Year(year), 4),
            })
            .collect();
        quarters.sort();
        quarters.dedup();
        quarters
    }

    /// Requested full years
    pub fn years(&self) -> Vec<Period> {
        self.timeframe.iter().copied().filter(|p| !p.is_quarter()).collect()
    }

    pub fn has_sectors(&self) -> bool {
        self.entities.iter().any(Entity::is_sector)
    }
}

/// Anything that can turn a question into an intent
#[async_trait]
pub trait IntentParser: Send + Sync {
    /// Best-effort extraction; never fails
    async fn parse(&self, question: &str, latest: Option<Period>) -> QueryIntent;
}

/// Deterministic keyword and pattern router
#[derive(Debug, Clone)]
pub struct QueryRouter {
    tickers: HashSet<String>,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::with_tickers(KNOWN_TICKERS)
    }
}

impl QueryRouter {
    /// Router recognising the given bank tickers
    pub fn with_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tickers: tickers
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .filter(|t| t.len() == 3)
                .collect(),
        }
    }

    /// Route a question relative to the latest available quarter
    pub fn route(&self, question: &str, latest: Option<Period>) -> QueryIntent {
        let lower = question.to_lowercase();
        let words: HashSet<&str> = WORD.find_iter(&lower).map(|m| m.as_str()).collect();
        let mut intent = QueryIntent::default_for(latest);

        let entities = self.entities(question, &lower);
        intent.all_banks = ALL_BANKS_PHRASES.iter().any(|p| lower.contains(p));
        if !entities.is_empty() {
            intent.entities = entities;
        } else if intent.all_banks {
            intent.entities.clear();
        }

        intent.timeframe = timeframe(question, &words, latest);
        intent.metrics = METRIC_KEYWORDS
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| mentions(&lower, &words, p)))
            .map(|(metric, _)| (*metric).to_string())
            .collect();
        intent.valuation = VALUATION_KEYWORDS.iter().any(|k| mentions_stem(&lower, &words, k));
        intent.need_components = COMPONENT_KEYWORDS.iter().any(|k| mentions_stem(&lower, &words, k));
        if QUALITATIVE_KEYWORDS.iter().any(|k| mentions_stem(&lower, &words, k)) {
            intent.mode = QueryMode::Qualitative;
        }

        debug!(
            entities = ?intent.entities,
            timeframe = ?intent.timeframe,
            metrics = ?intent.metrics,
            valuation = intent.valuation,
            mode = ?intent.mode,
            "Routed question"
        );
        intent
    }

    fn entities(&self, question: &str, lower: &str) -> Vec<Entity> {
        let mut found: Vec<(usize, Entity)> = Vec::new();

        for m in TICKER_WORD.find_iter(question) {
            let ticker = m.as_str().to_uppercase();
            if !self.tickers.contains(&ticker) {
                continue;
            }
            if m.as_str() != ticker && AMBIGUOUS_TICKERS.contains(&ticker.as_str()) {
                continue;
            }
            found.push((m.start(), Entity::Bank(ticker)));
        }
        for m in SUB_SECTOR.find_iter(question) {
            if let Some(sector) = SectorKind::parse(m.as_str()) {
                found.push((m.start(), Entity::Sector(sector)));
            }
        }
        if found.is_empty() && lower.contains("sector") {
            found.push((0, Entity::Sector(SectorKind::Sector)));
        }

        found.sort_by_key(|(pos, _)| *pos);
        let mut seen = HashSet::new();
        found
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| seen.insert(e.clone()))
            .collect()
    }
}

#[async_trait]
impl IntentParser for QueryRouter {
    async fn parse(&self, question: &str, latest: Option<Period>) -> QueryIntent {
        self.route(question, latest)
    }
}

fn timeframe(question: &str, words: &HashSet<&str>, latest: Option<Period>) -> Vec<Period> {
    let mut periods: Vec<Period> = QUARTER
        .find_iter(question)
        .filter_map(|m| Period::parse(m.as_str()).ok())
        .collect();

    let without_quarters = QUARTER.replace_all(question, " ");
    periods.extend(
        YEAR.find_iter(&without_quarters)
            .filter_map(|m| Period::parse(m.as_str()).ok()),
    );

    if periods.is_empty() {
        if LATEST_KEYWORDS.iter().any(|k| words.contains(k)) {
            return latest.into_iter().collect();
        }
        return latest.map(|p| latest_quarters(p, DEFAULT_WINDOW)).unwrap_or_default();
    }

    periods.sort();
    periods.dedup();
    periods
}

/// Phrase match on the lowered text, whole-word match for single words
fn mentions(lower: &str, words: &HashSet<&str>, pattern: &str) -> bool {
    if pattern.contains(' ') || pattern.contains('-') {
        lower.contains(pattern)
    } else {
        words.contains(pattern)
    }
}

/// Like [`mentions`], also accepting words that start with the keyword
/// (`invest` matches `investment`, `rank` matches `ranking`)
fn mentions_stem(lower: &str, words: &HashSet<&str>, keyword: &str) -> bool {
    if keyword.len() <= 3 || keyword.contains('/') {
        return mentions(lower, words, keyword);
    }
    words.iter().any(|w| w.starts_with(keyword))
}

/// JSON produced by the model-backed parser
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParsedQuestion {
    tickers: Vec<String>,
    timeframe: Vec<String>,
    metrics: Vec<String>,
    valuation: Option<bool>,
    need_components: Option<bool>,
}

/// Model-backed parser with the router as fallback
pub struct LlmQueryParser {
    provider: Arc<dyn LLMProvider>,
    model: String,
    fallback: QueryRouter,
}

impl LlmQueryParser {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, fallback: QueryRouter) -> Self {
        Self {
            provider,
            model: model.into(),
            fallback,
        }
    }

    async fn ask_model(&self, question: &str, latest: Option<Period>) -> Option<ParsedQuestion> {
        let window = latest.map(|p| latest_quarters(p, DEFAULT_WINDOW)).unwrap_or_default();
        let request = CompletionRequest::builder(&self.model)
            .system(prompts::PARSER_SYSTEM)
            .user(prompts::parser_prompt(question, latest, &window))
            .temperature(0.0)
            .max_tokens(500)
            .json_output()
            .build();

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Query parser call failed, using keyword router");
                return None;
            },
        };
        let text = response.message.text()?;
        match serde_json::from_str::<ParsedQuestion>(text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "Query parser returned invalid JSON, using keyword router");
                None
            },
        }
    }
}

#[async_trait]
impl IntentParser for LlmQueryParser {
    async fn parse(&self, question: &str, latest: Option<Period>) -> QueryIntent {
        let rules = self.fallback.route(question, latest);
        let Some(parsed) = self.ask_model(question, latest).await else {
            return rules;
        };

        let all_banks = parsed.tickers.iter().any(|t| t.eq_ignore_ascii_case("ALL_BANKS"));
        let entities: Vec<Entity> = parsed
            .tickers
            .iter()
            .filter(|t| !t.eq_ignore_ascii_case("ALL_BANKS"))
            .filter_map(|t| Entity::parse(t).ok())
            .collect();
        if entities.is_empty() && !all_banks {
            debug!("Query parser found no entities, using keyword router");
            return rules;
        }

        let mut timeframe: Vec<Period> = parsed
            .timeframe
            .iter()
            .filter_map(|p| Period::parse(p).ok())
            .collect();
        timeframe.sort();
        timeframe.dedup();

        QueryIntent {
            entities,
            all_banks,
            timeframe: if timeframe.is_empty() { rules.timeframe } else { timeframe },
            metrics: if parsed.metrics.is_empty() { rules.metrics } else { parsed.metrics },
            valuation: parsed.valuation.unwrap_or(rules.valuation),
            need_components: parsed.need_components.unwrap_or(rules.need_components),
            mode: rules.mode,
        }
    }
}
