use super::canonical_tickers;
use async_trait::async_trait;
use bank_data::BankData;
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Every bank grouped by sector
pub struct ListBanksTool {
    data: Arc<BankData>,
}

impl ListBanksTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for ListBanksTool {
    async fn execute(&self, _args: Arguments) -> Result<Value> {
        let sectors: Map<String, Value> = self
            .data
            .sectors
            .grouped()
            .into_iter()
            .map(|(sector, banks)| (sector.to_string(), json!(banks)))
            .collect();

        Ok(json!({
            "sectors": sectors,
            "total_banks": self.data.sectors.len(),
        }))
    }

    fn name(&self) -> &str {
        "list_all_banks"
    }

    fn description(&self) -> &str {
        "List all available banks grouped by sector"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::empty()
    }
}

/// Sector classification of one or more banks
pub struct BankInfoTool {
    data: Arc<BankData>,
}

impl BankInfoTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for BankInfoTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let requested = args.require_list("tickers")?;
        let tickers = canonical_tickers(&requested);

        let mut banks = Map::new();
        let mut by_sector: Map<String, Value> = Map::new();
        for ticker in &tickers {
            let Some(sector) = self.data.sectors.sector_of(ticker) else {
                continue;
            };
            banks.insert(ticker.clone(), json!(sector));
            match by_sector.get_mut(sector).and_then(Value::as_array_mut) {
                Some(members) => members.push(json!(ticker)),
                None => {
                    by_sector.insert(sector.to_string(), json!([ticker]));
                },
            }
        }

        if let (1, [ticker]) = (requested.len(), tickers.as_slice()) {
            return match banks.get(ticker) {
                Some(sector) => Ok(json!({"ticker": ticker, "sector": sector})),
                None => Err(ToolError::failed(format!("Bank {ticker} not found"))),
            };
        }

        if banks.is_empty() {
            return Err(ToolError::failed(format!(
                "None of the requested banks were found: {}",
                tickers.join(", ")
            )));
        }

        Ok(json!({
            "found": banks.len(),
            "banks": banks,
            "by_sector": by_sector,
            "requested": requested.len(),
        }))
    }

    fn name(&self) -> &str {
        "get_bank_info"
    }

    fn description(&self) -> &str {
        "Get bank sector classification for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![Param::string_or_array(
            "tickers",
            "Bank ticker (string) or list of tickers (array)",
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, fixtures};

    #[tokio::test]
    async fn test_list_all_banks() {
        let value = ListBanksTool::new(fixtures::bank_data())
            .execute(Arguments::default())
            .await
            .unwrap();
        assert_eq!(value["total_banks"], 4);
        assert_eq!(value["sectors"]["Private_1"], json!(["ACB", "TCB"]));
        assert_eq!(value["sectors"]["SOCB"], json!(["VCB", "BID"]));
    }

    #[tokio::test]
    async fn test_single_bank() {
        let tool = BankInfoTool::new(fixtures::bank_data());
        let value = tool.execute(args(json!({"tickers": "vcb"}))).await.unwrap();
        assert_eq!(value, json!({"ticker": "VCB", "sector": "SOCB"}));

        let err = tool.execute(args(json!({"tickers": "XYZ"}))).await.unwrap_err();
        assert_eq!(err.to_string(), "Bank XYZ not found");
    }

    #[tokio::test]
    async fn test_batch_groups_by_sector() {
        let tool = BankInfoTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": ["ACB", "VCB", "TCB", "XYZ"]})))
            .await
            .unwrap();
        assert_eq!(value["requested"], 4);
        assert_eq!(value["found"], 3);
        assert_eq!(value["by_sector"]["Private_1"], json!(["ACB", "TCB"]));

        assert!(tool.execute(args(json!({"tickers": ["XYZ", "QQQ"]}))).await.is_err());
    }
}
