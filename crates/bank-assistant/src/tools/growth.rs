use super::{canonical_tickers, round2};
use async_trait::async_trait;
use bank_data::{BankData, MetricRow};
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const DEFAULT_PERIODS: i64 = 5;

#[derive(Debug, Serialize)]
struct YearGrowth {
    year: u16,
    value: f64,
    growth_rate: f64,
}

#[derive(Debug, Serialize)]
struct GrowthSummary {
    growth_data: Vec<YearGrowth>,
    cagr: Option<f64>,
    average_growth: Option<f64>,
    latest_value: Option<f64>,
}

/// Year-over-year growth and CAGR of one metric
pub struct GrowthMetricsTool {
    data: Arc<BankData>,
}

impl GrowthMetricsTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }

    /// Growth over the last `periods + 1` years with a value; `None` when the
    /// bank has no such values
    fn summarize(&self, ticker: &str, column: &str, periods: usize) -> Option<GrowthSummary> {
        let mut rows: Vec<&MetricRow> = self
            .data
            .yearly
            .rows_for(ticker)
            .filter(|r| r.value(column).is_some())
            .collect();
        if rows.is_empty() {
            return None;
        }
        rows.sort_by_key(|r| r.period);
        let skip = rows.len().saturating_sub(periods + 1);
        let series: Vec<(u16, f64)> = rows[skip..]
            .iter()
            .filter_map(|r| r.value(column).map(|v| (r.period.year_number(), v)))
            .collect();

        let growth_data: Vec<YearGrowth> = series
            .windows(2)
            .filter(|pair| pair[0].1 != 0.0)
            .map(|pair| YearGrowth {
                year: pair[1].0,
                value: pair[1].1,
                growth_rate: (pair[1].1 - pair[0].1) / pair[0].1 * 100.0,
            })
            .collect();

        let first = series.first().map(|(_, v)| *v);
        let last = series.last().map(|(_, v)| *v);
        let cagr = match (first, last) {
            (Some(first), Some(last)) if series.len() >= 2 && first > 0.0 => {
                let years = (series.len() - 1) as f64;
                Some(((last / first).powf(1.0 / years) - 1.0) * 100.0)
            },
            _ => None,
        };
        let average_growth = (!growth_data.is_empty())
            .then(|| growth_data.iter().map(|g| g.growth_rate).sum::<f64>() / growth_data.len() as f64);

        Some(GrowthSummary {
            growth_data,
            cagr,
            average_growth,
            latest_value: last,
        })
    }
}

#[async_trait]
impl Tool for GrowthMetricsTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let requested = args.require_list("tickers")?;
        let tickers = canonical_tickers(&requested);
        let metric = args.require_str("metric")?.trim().to_string();
        let periods = args.integer("periods").unwrap_or(DEFAULT_PERIODS);
        if periods < 1 {
            return Err(ToolError::failed("periods must be at least 1"));
        }
        let column = self
            .data
            .yearly
            .resolve_column(&metric, &self.data.key_items)
            .ok_or_else(|| ToolError::failed(format!("Metric {metric} not found")))?;

        let mut results = Map::new();
        let mut ranking: Vec<Value> = Vec::new();
        for ticker in &tickers {
            let Some(summary) = self.summarize(ticker, &column, periods as usize) else {
                continue;
            };
            if let Some(cagr) = summary.cagr {
                ranking.push(json!({
                    "ticker": ticker,
                    "cagr": round2(cagr),
                    "avg_growth": summary.average_growth.map(round2),
                    "latest_value": summary.latest_value,
                }));
            }
            results.insert(ticker.clone(), serde_json::to_value(&summary).map_err(|e| ToolError::failed(e.to_string()))?);
        }

        if let (1, [ticker], Some(Value::Object(single))) =
            (requested.len(), tickers.as_slice(), results.values().next())
        {
            let mut single = single.clone();
            single.insert("ticker".to_string(), json!(ticker));
            single.insert("metric".to_string(), json!(metric));
            single.insert("periods".to_string(), json!(periods));
            return Ok(Value::Object(single));
        }
        if results.is_empty() {
            return Err(ToolError::failed(format!("No {metric} history for {}", tickers.join(", "))));
        }

        ranking.sort_by(|a, b| {
            let cagr = |v: &Value| v["cagr"].as_f64().unwrap_or(f64::NEG_INFINITY);
            cagr(b).total_cmp(&cagr(a))
        });
        let best_growth = ranking.first().map(|r| r["ticker"].clone());

        Ok(json!({
            "metric": metric,
            "periods": periods,
            "detailed_results": results,
            "ranking": ranking,
            "best_growth": best_growth,
            "requested": requested.len(),
            "analyzed": results.len(),
        }))
    }

    fn name(&self) -> &str {
        "calculate_growth_metrics"
    }

    fn description(&self) -> &str {
        "Calculate growth rates and CAGR for metrics for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Bank ticker (string) or list of tickers (array)"),
            Param::string("metric", "Metric name (e.g., Loan, Deposit)"),
            Param::integer("periods", "Number of periods to analyze").optional(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, fixtures};

    #[tokio::test]
    async fn test_single_bank_growth_and_cagr() {
        let tool = GrowthMetricsTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": "ACB", "metric": "Loan"})))
            .await
            .unwrap();

        assert_eq!(value["ticker"], "ACB");
        assert_eq!(value["periods"], 5);
        assert_eq!(value["latest_value"], 500.0);
        let growth = value["growth_data"].as_array().unwrap();
        assert_eq!(growth.len(), 2);
        assert_eq!(growth[0]["year"], 2022);
        assert!((growth[0]["growth_rate"].as_f64().unwrap() - 25.0).abs() < 1e-9);
        assert!((value["cagr"].as_f64().unwrap() - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_periods_limits_window() {
        let tool = GrowthMetricsTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": "ACB", "metric": "Loan", "periods": 1})))
            .await
            .unwrap();
        assert_eq!(value["growth_data"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["growth_data"][0]["year"], 2023);
    }

    #[tokio::test]
    async fn test_batch_ranking_by_cagr() {
        let tool = GrowthMetricsTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": ["TCB", "ACB", "VCB", "XYZ"], "metric": "Loan"})))
            .await
            .unwrap();

        assert_eq!(value["best_growth"], "ACB");
        assert_eq!(value["requested"], 4);
        assert_eq!(value["analyzed"], 3);
        let order: Vec<&str> = value["ranking"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["ticker"].as_str())
            .collect();
        assert_eq!(order, vec!["ACB", "VCB", "TCB"]);
    }

    #[tokio::test]
    async fn test_unknown_metric() {
        let tool = GrowthMetricsTool::new(fixtures::bank_data());
        let err = tool
            .execute(args(json!({"tickers": "ACB", "metric": "Foo"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Metric Foo not found");
    }
}
