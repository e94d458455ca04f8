use super::{canonical_tickers, round2};
use async_trait::async_trait;
use bank_data::{BankData, MetricRow};
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use std::sync::Arc;

const KEY_METRICS: &[&str] = &["Loan", "NPL", "ROA", "ROE", "NIM", "PBT"];

/// Every forecast year next to the latest actual year
pub struct ForecastDataTool {
    data: Arc<BankData>,
}

impl ForecastDataTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

fn year_record(row: &MetricRow, metrics: &[&str]) -> Value {
    let mut record = Map::new();
    record.insert("TICKER".to_string(), json!(row.ticker));
    record.insert("Year".to_string(), json!(row.period.year_number()));
    for metric in metrics {
        record.insert((*metric).to_string(), json!(row.value(metric)));
    }
    Value::Object(record)
}

/// Forecast versus actual for each forecast year, `None` when no metric of
/// any year can be compared
fn growth_comparison(actual: &MetricRow, forecasts: &[&MetricRow], metrics: &[&str]) -> Option<Map<String, Value>> {
    let mut comparison = Map::new();
    for forecast in forecasts {
        let mut year = Map::new();
        for metric in metrics {
            let (Some(hist), Some(projected)) = (actual.value(metric), forecast.value(metric)) else {
                continue;
            };
            if hist == 0.0 || projected == 0.0 {
                continue;
            }
            year.insert(
                (*metric).to_string(),
                json!({
                    "actual": hist,
                    "forecast": projected,
                    "growth_pct": round2((projected - hist) / hist * 100.0),
                }),
            );
        }
        if !year.is_empty() {
            comparison.insert(format!("year_{}", forecast.period.year_number()), Value::Object(year));
        }
    }
    (!comparison.is_empty()).then_some(comparison)
}

#[async_trait]
impl Tool for ForecastDataTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let forecast_table = &self.data.forecast;
        let yearly = &self.data.yearly;
        let tickers = args.string_list("tickers").map(|t| canonical_tickers(&t));
        let selected = |row: &MetricRow| tickers.as_ref().is_none_or(|t| t.contains(&row.ticker));

        let latest_actual = yearly
            .latest_period()
            .ok_or_else(|| ToolError::failed("No historical data available"))?;
        let forecast_years: Vec<u16> = forecast_table.periods().iter().map(|p| p.year_number()).collect();

        let forecasts = forecast_table.filter(selected);
        if forecasts.is_empty() {
            return Err(ToolError::failed("No forecast data found"));
        }
        let actuals = yearly.filter(|row| selected(row) && row.period == latest_actual);

        let metrics: Vec<&str> = KEY_METRICS
            .iter()
            .copied()
            .filter(|m| forecast_table.has_column(m) && yearly.has_column(m))
            .collect();

        let mut response = json!({
            "latest_actual_year": latest_actual.year_number(),
            "forecast_years": forecast_years,
            "requested_tickers": tickers.as_ref().map_or(json!("All"), |t| json!(t)),
            "metrics_included": metrics,
        });

        if !actuals.is_empty() {
            let records: Vec<Value> = actuals.iter().map(|r| year_record(r, &metrics)).collect();
            response["actual_data"] = json!({
                "year": latest_actual.year_number(),
                "records": records.len(),
                "data": records,
            });
        }

        let mut years: Vec<u16> = forecasts.iter().map(|r| r.period.year_number()).collect();
        years.sort_unstable();
        years.dedup();
        let records: Vec<Value> = forecasts.iter().map(|r| year_record(r, &metrics)).collect();
        response["forecast_data"] = json!({
            "years": years,
            "records": records.len(),
            "data": records,
        });

        if let (Some([_]), Some(actual)) = (tickers.as_deref(), actuals.first()) {
            if let Some(comparison) = growth_comparison(actual, &forecasts, &metrics) {
                response["comparison"] = Value::Object(comparison);
            }
        }

        Ok(response)
    }

    fn name(&self) -> &str {
        "query_forecast_data"
    }

    fn description(&self) -> &str {
        "Query ALL forecast years with latest historical year for comparison - accepts single or multiple tickers"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Bank ticker (string) or list of tickers (array)").optional(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, fixtures};

    #[tokio::test]
    async fn test_single_ticker_adds_comparison() {
        let tool = ForecastDataTool::new(fixtures::bank_data());
        let value = tool.execute(args(json!({"tickers": "acb"}))).await.unwrap();

        assert_eq!(value["latest_actual_year"], 2023);
        assert_eq!(value["forecast_years"], json!([2024, 2025]));
        assert_eq!(value["requested_tickers"], json!(["ACB"]));
        // PBT is forecast only
        assert_eq!(value["metrics_included"], json!(["Loan", "NPL", "ROA", "ROE", "NIM"]));
        assert_eq!(value["actual_data"]["records"], 1);
        assert_eq!(value["forecast_data"]["records"], 2);
        assert_eq!(value["comparison"]["year_2024"]["Loan"]["growth_pct"], 15.0);
    }

    #[tokio::test]
    async fn test_all_tickers_without_comparison() {
        let tool = ForecastDataTool::new(fixtures::bank_data());
        let value = tool.execute(Arguments::default()).await.unwrap();
        assert_eq!(value["requested_tickers"], "All");
        assert_eq!(value["forecast_data"]["records"], 3);
        assert!(value.get("comparison").is_none());
    }

    #[tokio::test]
    async fn test_missing_forecast() {
        let tool = ForecastDataTool::new(fixtures::bank_data());
        let err = tool.execute(args(json!({"tickers": "TCB"}))).await.unwrap_err();
        assert_eq!(err.to_string(), "No forecast data found");
    }
}
