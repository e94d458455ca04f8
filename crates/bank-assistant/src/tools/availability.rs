use async_trait::async_trait;
use bank_core::Period;
use bank_data::BankData;
use bank_tools::{Arguments, ParamSchema, Result, Tool};
use serde_json::{Value, json};
use std::sync::Arc;

const RECENT_QUARTERS: usize = 8;
const RECENT_YEARS: usize = 5;

/// Today's date and the latest periods present in each table
pub struct DataAvailabilityTool {
    data: Arc<BankData>,
}

impl DataAvailabilityTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

fn tail(periods: Vec<Period>, n: usize) -> Vec<String> {
    let skip = periods.len().saturating_sub(n);
    periods.into_iter().skip(skip).map(|p| p.to_string()).collect()
}

#[async_trait]
impl Tool for DataAvailabilityTool {
    async fn execute(&self, _args: Arguments) -> Result<Value> {
        let quarters = tail(self.data.quarterly.periods(), RECENT_QUARTERS);
        let years = tail(self.data.yearly.periods(), RECENT_YEARS);
        let forecast_years = tail(self.data.forecast.periods(), usize::MAX);

        Ok(json!({
            "current_date": chrono::Local::now().format("%Y-%m-%d").to_string(),
            "latest_quarterly": quarters.last(),
            "latest_yearly": years.last(),
            "recent_quarters": quarters,
            "recent_years": years,
            "forecast_years": forecast_years,
        }))
    }

    fn name(&self) -> &str {
        "get_data_availability"
    }

    fn description(&self) -> &str {
        "Get current date and latest available data periods - ALWAYS call this first for 'latest' or 'current' queries"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_latest_periods_in_period_order() {
        let data = fixtures::bank_data();
        let value = DataAvailabilityTool::new(data).execute(Arguments::default()).await.unwrap();

        assert_eq!(value["latest_quarterly"], "1Q24");
        assert_eq!(value["recent_quarters"], json!(["3Q23", "4Q23", "1Q24"]));
        assert_eq!(value["latest_yearly"], "2023");
        assert_eq!(value["forecast_years"], json!(["2024", "2025"]));
        assert_eq!(value["current_date"].as_str().map(str::len), Some(10));
    }
}
