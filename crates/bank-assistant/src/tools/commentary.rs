use async_trait::async_trait;
use bank_data::BankData;
use bank_tools::{Arguments, Param, ParamSchema, Result, Tool, ToolError};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Cached model commentary for banks and the sector
pub struct AiCommentaryTool {
    data: Arc<BankData>,
}

impl AiCommentaryTool {
    pub fn new(data: Arc<BankData>) -> Self {
        Self { data }
    }

    fn lookup(&self, ticker: &str, quarter: &str) -> std::result::Result<Value, String> {
        if ticker == "SECTOR" {
            let table = self
                .data
                .sector_analysis
                .as_ref()
                .ok_or_else(|| "Sector analysis data not available".to_string())?;
            let analysis = table
                .for_quarter(quarter)
                .ok_or_else(|| format!("No sector analysis for {quarter}"))?;
            return Ok(json!({
                "type": "sector",
                "quarter": quarter,
                "analysis": analysis,
            }));
        }

        let comments = self
            .data
            .comments
            .as_ref()
            .ok_or_else(|| format!("Comments data not available for {ticker}"))?;
        let record = comments
            .get(ticker, quarter)
            .ok_or_else(|| format!("No commentary for {ticker} in {quarter}"))?;
        Ok(json!({
            "type": "bank",
            "ticker": ticker,
            "quarter": quarter,
            "comment": record.comment,
            "generated_at": record.generated_at,
        }))
    }
}

#[async_trait]
impl Tool for AiCommentaryTool {
    async fn execute(&self, args: Arguments) -> Result<Value> {
        let tickers: Vec<String> = args
            .require_list("tickers")?
            .iter()
            .map(|t| t.trim().to_uppercase())
            .collect();
        let quarter = args.require_str("quarter")?.trim();

        let mut results = Map::new();
        let mut errors: Vec<String> = Vec::new();
        for ticker in &tickers {
            match self.lookup(ticker, quarter) {
                Ok(found) => {
                    results.insert(ticker.clone(), found);
                },
                Err(e) => errors.push(e),
            }
        }

        if tickers.len() == 1 {
            return match results.into_iter().next() {
                Some((_, single)) => Ok(single),
                None => Err(ToolError::failed(errors.join("; "))),
            };
        }
        if results.is_empty() {
            return Err(ToolError::failed(errors.join("; ")));
        }

        Ok(json!({
            "found": results.len(),
            "results": results,
            "requested": tickers.len(),
            "errors": (!errors.is_empty()).then_some(errors),
        }))
    }

    fn name(&self) -> &str {
        "get_ai_commentary"
    }

    fn description(&self) -> &str {
        "Get AI-generated commentary for one or multiple banks"
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::new(vec![
            Param::string_or_array(
                "tickers",
                "Bank ticker (string) or list of tickers (array). Use 'Sector' for sector analysis",
            ),
            Param::string("quarter", "Quarter like 2024-Q3"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, fixtures};

    #[tokio::test]
    async fn test_bank_comment_any_quarter_spelling() {
        let tool = AiCommentaryTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": "acb", "quarter": "2024-Q1"})))
            .await
            .unwrap();
        assert_eq!(value["type"], "bank");
        assert_eq!(value["ticker"], "ACB");
        assert_eq!(value["comment"], "ACB grew loans steadily.");
    }

    #[tokio::test]
    async fn test_sector_analysis() {
        let tool = AiCommentaryTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": "Sector", "quarter": "1Q24"})))
            .await
            .unwrap();
        assert_eq!(value["type"], "sector");
        assert_eq!(value["analysis"]["KEY_CHANGES"], "Credit growth slowed");
    }

    #[tokio::test]
    async fn test_batch_reports_errors() {
        let tool = AiCommentaryTool::new(fixtures::bank_data());
        let value = tool
            .execute(args(json!({"tickers": ["ACB", "TCB", "SECTOR"], "quarter": "1Q24"})))
            .await
            .unwrap();
        assert_eq!(value["requested"], 3);
        assert_eq!(value["found"], 2);
        assert_eq!(value["errors"], json!(["No commentary for TCB in 1Q24"]));

        let err = tool
            .execute(args(json!({"tickers": "TCB", "quarter": "1Q24"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No commentary for TCB in 1Q24");
    }
}
