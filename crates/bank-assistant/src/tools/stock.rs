use super::{round2, upper_median};
use crate::prices::{PriceSource, StockPerformance, stock_performance};
use async_trait::async_trait;
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::warn;

/// Share price change between two dates, looked up concurrently
pub struct StockPerformanceTool {
    prices: Arc<dyn PriceSource>,
    concurrency: usize,
}

impl StockPerformanceTool {
    pub fn new(prices: Arc<dyn PriceSource>, concurrency: usize) -> Self {
        Self {
            prices,
            concurrency: concurrency.max(1),
        }
    }
}

fn summary(ranking: &[StockPerformance]) -> Value {
    let (Some(best), Some(worst)) = (ranking.first(), ranking.last()) else {
        return Value::Null;
    };
    let mut sorted: Vec<f64> = ranking.iter().map(|p| p.performance_pct).collect();
    sorted.sort_by(f64::total_cmp);
    let average = sorted.iter().sum::<f64>() / sorted.len() as f64;
    json!({
        "best_performer": best.ticker,
        "worst_performer": worst.ticker,
        "average_performance": round2(average),
        "median_performance": upper_median(&sorted).map(round2),
    })
}

#[async_trait]
impl Tool for StockPerformanceTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let mut tickers: Vec<String> = Vec::new();
        for ticker in args.require_list("tickers")? {
            let ticker = ticker.to_uppercase();
            if !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        let start = args.require_str("start_date")?;
        let end = args.require_str("end_date")?;

        let outcomes: Vec<(String, crate::error::Result<StockPerformance>)> = stream::iter(tickers.iter().cloned())
            .map(|ticker| {
                let prices = Arc::clone(&self.prices);
                async move {
                    let outcome = stock_performance(prices.as_ref(), &ticker, start, end).await;
                    (ticker, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        if tickers.len() == 1 {
            return match outcomes.into_iter().next() {
                Some((_, Ok(perf))) => serde_json::to_value(perf).map_err(|e| ToolError::failed(e.to_string())),
                Some((_, Err(e))) => Err(ToolError::failed(e.to_string())),
                None => Err(ToolError::failed("No price data requested")),
            };
        }

        let mut detailed = Map::new();
        let mut ranking: Vec<StockPerformance> = Vec::new();
        for ticker in &tickers {
            let Some((_, outcome)) = outcomes.iter().find(|(t, _)| t == ticker) else {
                continue;
            };
            match outcome {
                Ok(perf) => {
                    detailed.insert(ticker.clone(), json!(perf));
                    ranking.push(perf.clone());
                },
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Price lookup failed");
                    detailed.insert(ticker.clone(), json!({"error": e.to_string()}));
                },
            }
        }
        if ranking.is_empty() {
            return Err(ToolError::failed(format!(
                "No price data available for {}",
                tickers.join(", ")
            )));
        }
        ranking.sort_by(|a, b| b.performance_pct.total_cmp(&a.performance_pct));

        let ranked: Vec<Value> = ranking
            .iter()
            .map(|p| {
                json!({
                    "ticker": p.ticker,
                    "start_price": p.start_price,
                    "end_price": p.end_price,
                    "performance_pct": p.performance_pct,
                })
            })
            .collect();

        Ok(json!({
            "period": {"start": start, "end": end},
            "detailed_results": detailed,
            "ranking": ranked,
            "summary": summary(&ranking),
            "requested": tickers.len(),
            "successful": ranking.len(),
        }))
    }

    fn name(&self) -> &str {
        "get_stock_performance"
    }

    fn description(&self) -> &str {
        "Get stock price performance between two dates for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Stock ticker (string) or list of tickers (array)"),
            Param::string("start_date", "Start date in YYYY-MM-DD format"),
            Param::string("end_date", "End date in YYYY-MM-DD format"),
        ])
    }
}
