use super::canonical_tickers;
use async_trait::async_trait;
use bank_data::{BankData, SeriesStats, ValuationMetric};
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Current valuation multiple against its own history
pub struct ValuationAnalysisTool {
    data: Arc<BankData>,
}

impl ValuationAnalysisTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

fn stats_json(stats: &SeriesStats) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("current_value".to_string(), json!(stats.current));
    out.insert("mean".to_string(), json!(stats.mean));
    out.insert("median".to_string(), json!(stats.median));
    out.insert("std".to_string(), json!(stats.std));
    out.insert("z_score".to_string(), json!(stats.z_score));
    out.insert("percentile_rank".to_string(), json!(stats.percentile_rank));
    out.insert("min".to_string(), json!(stats.min));
    out.insert("max".to_string(), json!(stats.max));
    out.insert("interpretation".to_string(), json!(stats.interpretation()));
    out
}

#[async_trait]
impl Tool for ValuationAnalysisTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let table = self
            .data
            .valuation
            .as_ref()
            .ok_or_else(|| ToolError::failed("Valuation data not available"))?;
        let requested = args.require_list("tickers")?;
        let tickers = canonical_tickers(&requested);
        let metric = args
            .str("metric")
            .and_then(ValuationMetric::parse)
            .unwrap_or_default();
        if !table.has_metric(metric) {
            return Err(ToolError::failed(format!("Metric {metric} not found")));
        }

        let mut results = Map::new();
        let mut comparison: Vec<(String, SeriesStats)> = Vec::new();
        for ticker in &tickers {
            let values: Vec<f64> = table.series(ticker, metric).into_iter().map(|(_, v)| v).collect();
            if let Some(stats) = SeriesStats::of(&values) {
                results.insert(ticker.clone(), Value::Object(stats_json(&stats)));
                comparison.push((ticker.clone(), stats));
            }
        }

        if let (1, [ticker], Some(stats)) = (requested.len(), tickers.as_slice(), comparison.first()) {
            let mut single = stats_json(&stats.1);
            single.insert("ticker".to_string(), json!(ticker));
            single.insert("metric".to_string(), json!(metric.code()));
            return Ok(Value::Object(single));
        }
        if results.is_empty() {
            return Err(ToolError::failed(format!(
                "No {metric} valuation data for {}",
                tickers.join(", ")
            )));
        }

        comparison.sort_by(|a, b| a.1.z_score.total_cmp(&b.1.z_score));
        let ranked: Vec<Value> = comparison
            .iter()
            .map(|(ticker, stats)| {
                json!({
                    "ticker": ticker,
                    "current": stats.current,
                    "z_score": stats.z_score,
                    "percentile": stats.percentile_rank,
                    "interpretation": stats.interpretation(),
                })
            })
            .collect();

        Ok(json!({
            "metric": metric.code(),
            "detailed_results": results,
            "comparison": ranked,
            "most_undervalued": comparison.first().map(|(t, _)| t),
            "most_overvalued": comparison.last().map(|(t, _)| t),
            "requested": requested.len(),
            "found": comparison.len(),
        }))
    }

    fn name(&self) -> &str {
        "get_valuation_analysis"
    }

    fn description(&self) -> &str {
        "Get valuation analysis with Z-score and percentiles for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Bank ticker (string) or list of tickers (array)"),
            Param::string("metric", "Valuation metric")
                .optional()
                .one_of(&["PE", "PB", "PS"]),
        ])
    }
}
