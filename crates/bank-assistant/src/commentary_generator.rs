//! Bulk commentary generation
//!
//! Writes one model comment per (bank, quarter) into the commentary cache.
//! Pairs already cached are skipped unless overwriting. The cache is saved
//! every `bulk_save_interval` new comments and once more at the end, so an
//! interrupted run keeps most of its work. A failed model call skips that
//! pair and the run continues.

use crate::config::AssistantConfig;
use crate::discovery::format_cell;
use crate::error::{AssistantError, Result};
use crate::prompts;
use bank_core::{Period, normalize_ticker};
use bank_data::{BankData, CommentRecord, CommentaryCache, KeyItems, MetricRow, MetricTable};
use bank_llm::{CompletionRequest, LLMError, LLMProvider};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::fmt::Write as _;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Metrics shown to the model, by display name
pub const COMMENTARY_METRICS: &[&str] = &[
    "Loan",
    "TOI",
    "Provision expense",
    "PBT",
    "ROA",
    "ROE",
    "NIM",
    "Loan yield",
    "NPL",
    "NPL Formation (%)",
    "GROUP 2",
    "G2 Formation (%)",
    "NPL Coverage ratio",
];

/// Quarters of history in each prompt, target quarter included
const HISTORY_QUARTERS: usize = 6;

const COMMENT_MAX_TOKENS: usize = 300;

/// What to generate
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// First quarter, inclusive; defaults to the oldest available
    pub start: Option<Period>,
    /// Last quarter, inclusive; defaults to the latest available
    pub end: Option<Period>,
    /// Regenerate pairs that are already cached
    pub overwrite: bool,
    /// Restrict to these tickers; defaults to every mapped bank
    pub banks: Option<Vec<String>>,
}

/// Counters of one bulk run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub quarters: usize,
    pub banks: usize,
    pub planned: usize,
    pub already_cached: usize,
    pub generated: usize,
    pub no_data: usize,
    pub failed: usize,
    pub saves: usize,
}

/// Generates and caches per-bank quarterly commentary
pub struct CommentaryGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    save_interval: usize,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl CommentaryGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AssistantConfig) -> Self {
        let per_second = NonZeroU32::new(config.bulk_requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            provider,
            model: config.commentary_model.clone(),
            temperature: config.answer_temperature,
            save_interval: config.bulk_save_interval.max(1),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }

    /// One comment for `ticker` in `quarter` from pre-rendered history
    pub async fn generate_comment(&self, ticker: &str, sector: &str, quarter: Period, history: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let request = CompletionRequest::builder(&self.model)
            .system(prompts::COMMENTARY_SYSTEM)
            .user(prompts::commentary_prompt(
                ticker,
                sector,
                &quarter.to_string(),
                history,
            ))
            .temperature(self.temperature)
            .max_tokens(COMMENT_MAX_TOKENS)
            .build();

        let response = self.provider.complete(request).await?;
        match response.message.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(AssistantError::Llm(LLMError::UnexpectedResponse(
                "model returned an empty comment".to_string(),
            ))),
        }
    }

    /// Generate every missing comment of the requested range
    pub async fn run(&self, data: &BankData, options: &BulkOptions) -> Result<BulkReport> {
        let path = data.comments_path();
        let mut cache = CommentaryCache::load_or_empty(&path)?;

        let quarters = quarters_in_range(&data.quarterly, options.start, options.end);
        let banks: Vec<String> = match &options.banks {
            Some(banks) => banks.iter().map(|b| normalize_ticker(b)).collect(),
            None => data.sectors.tickers().map(ToString::to_string).collect(),
        };

        let mut report = BulkReport {
            quarters: quarters.len(),
            banks: banks.len(),
            ..BulkReport::default()
        };
        let mut pending: Vec<(Period, &str)> = Vec::new();
        for quarter in &quarters {
            for bank in &banks {
                if !options.overwrite && cache.contains(bank, &quarter.to_string()) {
                    report.already_cached += 1;
                } else {
                    pending.push((*quarter, bank.as_str()));
                }
            }
        }
        report.planned = pending.len();
        info!(
            quarters = report.quarters,
            banks = report.banks,
            planned = report.planned,
            already_cached = report.already_cached,
            "Starting bulk comment generation"
        );

        for (index, (quarter, ticker)) in pending.into_iter().enumerate() {
            let Some(history) = quarter_history(&data.quarterly, &data.key_items, ticker, quarter) else {
                debug!(ticker, quarter = %quarter, "No quarterly data, skipping");
                report.no_data += 1;
                continue;
            };
            let sector = data.sectors.sector_of(ticker).unwrap_or("Unknown");

            match self.generate_comment(ticker, sector, quarter, &history).await {
                Ok(comment) => {
                    cache.upsert(CommentRecord::new(ticker, sector, quarter.to_string(), comment));
                    report.generated += 1;
                    info!(ticker, quarter = %quarter, progress = index + 1, planned = report.planned, "Comment generated");
                    if report.generated % self.save_interval == 0 {
                        cache.save(&path)?;
                        report.saves += 1;
                    }
                },
                Err(e) => {
                    warn!(ticker, quarter = %quarter, error = %e, "Comment generation failed, skipping");
                    report.failed += 1;
                },
            }
        }

        if report.generated > 0 && report.generated % self.save_interval != 0 {
            cache.save(&path)?;
            report.saves += 1;
        }
        info!(
            generated = report.generated,
            failed = report.failed,
            no_data = report.no_data,
            total_comments = cache.len(),
            "Bulk comment generation finished"
        );
        Ok(report)
    }
}

/// Quarters of `table` between `start` and `end`, oldest first
pub fn quarters_in_range(table: &MetricTable, start: Option<Period>, end: Option<Period>) -> Vec<Period> {
    table
        .periods()
        .into_iter()
        .filter(|p| p.is_quarter())
        .filter(|p| start.is_none_or(|s| *p >= s))
        .filter(|p| end.is_none_or(|e| *p <= e))
        .collect()
}

fn change_pct(current: Option<f64>, previous: Option<f64>) -> String {
    match (current, previous) {
        (Some(cur), Some(prev)) if prev != 0.0 => format!("{:+.1}%", (cur / prev - 1.0) * 100.0),
        _ => "n/a".to_string(),
    }
}

/// The last quarters of `ticker` up to `quarter`, one line per quarter with
/// QoQ and YoY changes; `None` when the bank has no data by then
pub fn quarter_history(table: &MetricTable, key_items: &KeyItems, ticker: &str, quarter: Period) -> Option<String> {
    let mut rows: Vec<&MetricRow> = table
        .rows_for(ticker)
        .filter(|r| r.period.is_quarter() && r.period <= quarter)
        .collect();
    rows.sort_by_key(|r| r.period);
    let window = &rows[rows.len().saturating_sub(HISTORY_QUARTERS)..];
    if window.is_empty() {
        return None;
    }

    let columns: Vec<(&str, String)> = COMMENTARY_METRICS
        .iter()
        .filter_map(|name| table.resolve_column(name, key_items).map(|column| (*name, column)))
        .collect();

    let mut text = String::new();
    for (i, row) in window.iter().enumerate() {
        let previous = i.checked_sub(1).map(|j| window[j]);
        let year_ago = i.checked_sub(4).map(|j| window[j]);
        let cells: Vec<String> = columns
            .iter()
            .filter_map(|(name, column)| {
                let value = row.value(column)?;
                Some(format!(
                    "{name}={} (QoQ {}, YoY {})",
                    format_cell(value),
                    change_pct(Some(value), previous.and_then(|r| r.value(column))),
                    change_pct(Some(value), year_ago.and_then(|r| r.value(column))),
                ))
            })
            .collect();
        let _ = writeln!(text, "{}: {}", row.period, cells.join("; "));
    }
    Some(text)
}
