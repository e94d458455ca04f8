use super::{canonical_tickers, parse_year, row_record};
use async_trait::async_trait;
use bank_core::Period;
use bank_data::{BankData, MetricRow, MetricTable};
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Rows returned in full; `records` still counts every match
const PREVIEW_ROWS: usize = 10;

const PROFITABILITY: &[&str] = &["ROA", "ROE", "NIM", "CIR"];
const ASSET_QUALITY: &[&str] = &["NPL", "NPL Coverage ratio", "Provision/ Total Loan", "GROUP 2"];
const GROWTH: &[&str] = &["Loan", "Deposit", "Total Assets", "NPATMI"];

const COMPARE_DEFAULT: &[&str] = &["ROA", "ROE", "NPL", "NIM", "Loan", "Deposit"];

/// Metrics where a lower value ranks first
const LOWER_IS_BETTER: &[&str] = &["NPL", "CIR"];

fn metric_group(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "profitability" => Some(PROFITABILITY),
        "asset_quality" => Some(ASSET_QUALITY),
        "growth" => Some(GROWTH),
        _ => None,
    }
}

/// Columns of `table` holding `metrics`, skipping any it lacks
fn available_columns<S: AsRef<str>>(data: &BankData, table: &MetricTable, metrics: &[S]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for metric in metrics {
        if let Some(column) = table.resolve_column(metric.as_ref(), &data.key_items) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }
    columns
}

/// Historical metrics for one or several banks
pub struct HistoricalDataTool {
    data: Arc<BankData>,
}

impl HistoricalDataTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for HistoricalDataTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let period = args.str("period").map(str::trim).filter(|p| !p.is_empty());
        let quarterly = period.is_some_and(|p| p.to_uppercase().contains('Q'));
        let table = if quarterly { &self.data.quarterly } else { &self.data.yearly };

        let period = match period {
            Some(raw) if quarterly => Some(
                Period::parse(raw)
                    .ok()
                    .filter(Period::is_quarter)
                    .ok_or_else(|| ToolError::failed(format!("Invalid quarter: {raw}")))?,
            ),
            Some(raw) => Some(parse_year(raw)?),
            None => None,
        };
        let tickers = args.string_list("tickers").map(|t| canonical_tickers(&t));

        let rows = table.filter(|row| {
            tickers.as_ref().is_none_or(|t| t.contains(&row.ticker))
                && period.is_none_or(|p| row.period == p)
        });
        if rows.is_empty() {
            return Err(ToolError::failed("No data found"));
        }

        let group = args.str("metric_group").and_then(metric_group);
        let metrics = match group.map(|g| available_columns(&self.data, table, g)) {
            Some(selected) if !selected.is_empty() => selected,
            _ => table.columns().to_vec(),
        };

        let period_column = table.granularity().period_column();
        let mut columns = vec!["TICKER".to_string(), "Type".to_string(), period_column.to_string()];
        columns.extend(metrics.iter().cloned());

        let records: Vec<Value> = rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| row_record(row, period_column, &metrics))
            .collect();

        Ok(json!({
            "records": rows.len(),
            "data": records,
            "columns": columns,
        }))
    }

    fn name(&self) -> &str {
        "query_historical_data"
    }

    fn description(&self) -> &str {
        "Query historical banking metrics for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array("tickers", "Bank ticker (string) or list of tickers (array)").optional(),
            Param::string("period", "Period like 2024-Q3 or 2024").optional(),
            Param::string("metric_group", "Metric group: all, profitability, asset_quality, growth")
                .optional()
                .one_of(&["all", "profitability", "asset_quality", "growth"]),
        ])
    }
}

/// Side-by-side yearly metrics with per-metric rankings
pub struct CompareBanksTool {
    data: Arc<BankData>,
}

impl CompareBanksTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

/// Rank of every value, 1 = best; ties share their average rank and
/// missing values stay unranked
fn rank(values: &[Option<f64>], ascending: bool) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|value| {
            let v = (*value)?;
            let better = values
                .iter()
                .flatten()
                .filter(|other| if ascending { **other < v } else { **other > v })
                .count();
            let tied = values.iter().flatten().filter(|other| **other == v).count();
            Some(better as f64 + (tied as f64 + 1.0) / 2.0)
        })
        .collect()
}

#[async_trait]
impl Tool for CompareBanksTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let tickers = canonical_tickers(&args.require_list("tickers")?);
        let requested: Vec<String> = args
            .string_list("metrics")
            .unwrap_or_else(|| COMPARE_DEFAULT.iter().map(ToString::to_string).collect());
        let table = &self.data.yearly;

        let candidates: Vec<&MetricRow> = match args.str("period") {
            Some(raw) => {
                let year = parse_year(raw)?;
                table.filter(|row| row.period == year)
            },
            None => table.latest_per_ticker(),
        };
        let rows: Vec<&MetricRow> = candidates
            .into_iter()
            .filter(|row| tickers.contains(&row.ticker))
            .collect();
        if rows.is_empty() {
            return Err(ToolError::failed("No data found for comparison"));
        }

        let metrics = available_columns(&self.data, table, &requested);

        let comparison: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert("TICKER".to_string(), json!(row.ticker));
                for metric in &metrics {
                    record.insert(metric.clone(), json!(row.value(metric)));
                }
                Value::Object(record)
            })
            .collect();

        let mut rankings: Vec<Map<String, Value>> = rows.iter().map(|_| Map::new()).collect();
        for metric in &metrics {
            let values: Vec<Option<f64>> = rows.iter().map(|r| r.value(metric)).collect();
            let ranks = rank(&values, LOWER_IS_BETTER.contains(&metric.as_str()));
            for (entry, position) in rankings.iter_mut().zip(ranks) {
                entry.insert(metric.clone(), json!(position));
            }
        }
        for (entry, row) in rankings.iter_mut().zip(&rows) {
            entry.insert("TICKER".to_string(), json!(row.ticker));
        }

        Ok(json!({
            "comparison": comparison,
            "rankings": rankings,
            "metrics_compared": metrics,
        }))
    }

    fn name(&self) -> &str {
        "compare_banks"
    }

    fn description(&self) -> &str {
        "Compare multiple banks on specific metrics"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_array("tickers", "List of bank tickers to compare"),
            Param::string_array("metrics", "List of metrics to compare").optional(),
            Param::string("period", "Period for comparison").optional(),
        ])
    }
}
