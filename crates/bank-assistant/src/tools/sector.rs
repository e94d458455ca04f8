use super::{parse_year, row_record};
use async_trait::async_trait;
use bank_core::{SectorKind, normalize_ticker};
use bank_data::{BankData, MetricRow};
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use statrs::statistics::{Data, Median, Statistics};
use std::sync::Arc;

const SECTOR_METRICS: &[&str] = &["Total Assets", "Loan", "Deposit", "NPL", "ROA", "ROE", "NIM"];

/// Yearly metrics of a sector group
pub struct SectorPerformanceTool {
    data: Arc<BankData>,
}

impl SectorPerformanceTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

fn summary(values: Vec<f64>) -> Value {
    let mean = values.iter().mean();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    json!({
        "mean": mean,
        "median": Data::new(values).median(),
        "min": min,
        "max": max,
    })
}

#[async_trait]
impl Tool for SectorPerformanceTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let sector = normalize_ticker(args.require_str("sector")?);
        let whole_sector = sector == SectorKind::Sector.as_str();
        let table = &self.data.yearly;

        let members = self.data.sectors.members(&sector);
        let in_scope = |row: &MetricRow| {
            if whole_sector {
                row.ticker == sector
            } else {
                members.contains(&row.ticker.as_str())
            }
        };

        let year = match args.str("period") {
            Some(raw) => Some(parse_year(raw)?),
            None => table.filter(in_scope).iter().map(|r| r.period).max(),
        };
        let rows: Vec<&MetricRow> = match year {
            Some(year) => table.filter(|row| in_scope(row) && row.period == year),
            None => Vec::new(),
        };
        let (Some(year), false) = (year, rows.is_empty()) else {
            return Err(ToolError::failed(format!("No data for sector {sector}")));
        };

        let metrics: Vec<String> = SECTOR_METRICS
            .iter()
            .filter(|m| table.has_column(m))
            .map(ToString::to_string)
            .collect();
        let period = year.year_number().to_string();

        if !whole_sector && rows.len() > 1 {
            let mut stats = Map::new();
            for metric in &metrics {
                let values: Vec<f64> = rows.iter().filter_map(|r| r.value(metric)).collect();
                if !values.is_empty() {
                    stats.insert(metric.clone(), summary(values));
                }
            }
            return Ok(json!({
                "sector": sector,
                "banks_count": rows.len(),
                "period": period,
                "metrics": stats,
            }));
        }

        let record = row_record(rows[0], table.granularity().period_column(), &metrics);
        Ok(json!({
            "sector": sector,
            "period": period,
            "data": record,
        }))
    }

    fn name(&self) -> &str {
        "get_sector_performance"
    }

    fn description(&self) -> &str {
        "Get aggregated performance metrics for a sector"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string("sector", "Sector name (SOCB, Private_1, Private_2, Private_3, Sector)"),
            Param::string("period", "Period for analysis").optional(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, fixtures};

    #[tokio::test]
    async fn test_whole_sector_uses_aggregate_row() {
        let tool = SectorPerformanceTool::new(fixtures::bank_data());
        let value = tool.execute(args(json!({"sector": "sector"}))).await.unwrap();
        assert_eq!(value["sector"], "Sector");
        assert_eq!(value["period"], "2023");
        assert_eq!(value["data"]["Loan"], 9000.0);
    }

    #[tokio::test]
    async fn test_sub_sector_member_statistics() {
        let tool = SectorPerformanceTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"sector": "Private_1", "period": "2023"})))
            .await
            .unwrap();
        assert_eq!(value["banks_count"], 2);
        // ACB 500 and TCB 550
        assert_eq!(value["metrics"]["Loan"]["mean"], 525.0);
        assert_eq!(value["metrics"]["Loan"]["min"], 500.0);
        assert_eq!(value["metrics"]["Loan"]["max"], 550.0);
    }

    #[tokio::test]
    async fn test_unknown_sector() {
        let tool = SectorPerformanceTool::new(fixtures::bank_data());
        let err = tool.execute(args(json!({"sector": "Private_3"}))).await.unwrap_err();
        assert_eq!(err.to_string(), "No data for sector Private_3");
    }
}
