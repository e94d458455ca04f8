//! Banking data tools for the tool-chaining loop
//!
//! Every tool reads the shared, immutable [`BankData`] snapshot; only
//! [`StockPerformanceTool`] talks to the network. Tools that accept a
//! ticker or a list of tickers return a flat record for a single ticker and
//! a batch summary for several.

mod availability;
mod banks;
mod commentary;
mod forecast;
mod growth;
mod historical;
mod sector;
mod stock;
mod valuation;

pub use availability::DataAvailabilityTool;
pub use banks::{BankInfoTool, ListBanksTool};
pub use commentary::AiCommentaryTool;
pub use forecast::ForecastDataTool;
pub use growth::GrowthMetricsTool;
pub use historical::{CompareBanksTool, HistoricalDataTool};
pub use sector::SectorPerformanceTool;
pub use stock::StockPerformanceTool;
pub use valuation::ValuationAnalysisTool;

use crate::prices::PriceSource;
use bank_core::{Period, normalize_ticker};
use bank_data::{BankData, MetricRow};
use bank_tools::{Result, ToolError, ToolRegistry};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Registry holding every banking tool, in the order they are advertised
pub fn build_registry(
    data: Arc<BankData>,
    prices: Arc<dyn PriceSource>,
    price_concurrency: usize,
) -> Result<ToolRegistry> {
    ToolRegistry::builder()
        .register(DataAvailabilityTool::new(Arc::clone(&data)))
        .register(ListBanksTool::new(Arc::clone(&data)))
        .register(BankInfoTool::new(Arc::clone(&data)))
        .register(HistoricalDataTool::new(Arc::clone(&data)))
        .register(ForecastDataTool::new(Arc::clone(&data)))
        .register(GrowthMetricsTool::new(Arc::clone(&data)))
        .register(ValuationAnalysisTool::new(Arc::clone(&data)))
        .register(CompareBanksTool::new(Arc::clone(&data)))
        .register(AiCommentaryTool::new(Arc::clone(&data)))
        .register(SectorPerformanceTool::new(data))
        .register(StockPerformanceTool::new(prices, price_concurrency))
        .build()
}

/// Canonical tickers, duplicates removed, request order kept
pub(crate) fn canonical_tickers(raw: &[String]) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::with_capacity(raw.len());
    for ticker in raw.iter().map(|t| normalize_ticker(t)) {
        if !tickers.contains(&ticker) {
            tickers.push(ticker);
        }
    }
    tickers
}

/// JSON value of a period as it appears in its table column
pub(crate) fn period_value(period: Period) -> Value {
    if period.is_quarter() {
        json!(period.to_string())
    } else {
        json!(period.year_number())
    }
}

/// A row as a JSON record: `TICKER`, `Type`, the period column, then
/// `metrics` in order; blank cells become `null`
pub(crate) fn row_record(row: &MetricRow, period_column: &str, metrics: &[String]) -> Value {
    let mut record = Map::new();
    record.insert("TICKER".to_string(), json!(row.ticker));
    record.insert("Type".to_string(), json!(row.sector));
    record.insert(period_column.to_string(), period_value(row.period));
    for metric in metrics {
        record.insert(metric.clone(), json!(row.value(metric)));
    }
    Value::Object(record)
}

/// Parse a year argument such as `"2024"`
pub(crate) fn parse_year(raw: &str) -> Result<Period> {
    match Period::parse(raw) {
        Ok(period) if !period.is_quarter() => Ok(period),
        _ => Err(ToolError::failed(format!("Invalid year: {raw}"))),
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ascending median of a non-empty slice; the upper middle for even counts
pub(crate) fn upper_median(sorted: &[f64]) -> Option<f64> {
    sorted.get(sorted.len() / 2).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::MockPriceSource;
    use crate::testing::fixtures;

    #[test]
    fn test_registry_advertises_every_tool() {
        let dir = fixtures::data_dir();
        let data = Arc::new(BankData::load(dir.path()).unwrap());
        let registry = build_registry(data, Arc::new(MockPriceSource::new()), 5).unwrap();

        assert_eq!(
            registry.names(),
            &[
                "get_data_availability",
                "list_all_banks",
                "get_bank_info",
                "query_historical_data",
                "query_forecast_data",
                "calculate_growth_metrics",
                "get_valuation_analysis",
                "compare_banks",
                "get_ai_commentary",
                "get_sector_performance",
                "get_stock_performance",
            ]
        );

        let compare = registry
            .definitions()
            .into_iter()
            .find(|d| d.name == "compare_banks")
            .unwrap();
        assert_eq!(compare.input_schema["required"], json!(["tickers"]));
        assert_eq!(compare.input_schema["properties"]["tickers"]["type"], "array");
    }

    #[test]
    fn test_canonical_tickers() {
        let raw = vec!["acb".to_string(), "ACB".to_string(), "private_1".to_string()];
        assert_eq!(canonical_tickers(&raw), vec!["ACB", "Private_1"]);
    }

    #[test]
    fn test_row_record_keeps_column_order() {
        let row = MetricRow::new("ACB", Some("Private_1".to_string()), Period::quarter(2024, 1).unwrap())
            .with_value("ROE", 0.18);
        let record = row_record(&row, "Date_Quarter", &["ROE".to_string(), "NIM".to_string()]);
        let keys: Vec<&str> = record.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["TICKER", "Type", "Date_Quarter", "ROE", "NIM"]);
        assert_eq!(record["NIM"], Value::Null);
        assert_eq!(record["Date_Quarter"], "1Q24");
    }
}
