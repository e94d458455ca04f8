//! Test doubles shared by the unit tests of this crate

use async_trait::async_trait;
use bank_llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason, TokenUsage,
    ToolCall,
};
use bank_tools::Arguments;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Arguments built from a JSON object literal
pub(crate) fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => Arguments::new(map),
        _ => Arguments::default(),
    }
}

/// LLM provider replaying scripted responses and recording every request
pub(crate) struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse, LLMError>>>,
    repeat: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose first call fails
    pub(crate) fn failing(error: LLMError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error)])),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider answering every call with the same response
    pub(crate) fn repeat(response: CompletionResponse) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Final text answer
    pub(crate) fn text(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        }
    }

    /// Turn requesting the given `(id, name, input)` tool calls
    pub(crate) fn tool_calls(calls: Vec<(&str, &str, Value)>) -> CompletionResponse {
        let calls = calls
            .into_iter()
            .map(|(id, name, input)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input,
            })
            .collect();
        CompletionResponse {
            message: Message::assistant_tool_calls(None, calls),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match (next, &self.repeat) {
            (Some(response), _) => response,
            (None, Some(response)) => Ok(response.clone()),
            (None, None) => Err(LLMError::UnexpectedResponse("script exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// CSV fixtures mirroring the layout of the production data directory
pub(crate) mod fixtures {
    use bank_data::BankData;
    use bank_data::dataset::{
        BANK_TYPE_FILE, COMMENTS_FILE, FORECAST_FILE, KEY_ITEMS_FILE, QUARTERLY_FILE,
        SECTOR_ANALYSIS_FILE, VALUATION_FILE, YEARLY_FILE,
    };
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub(crate) const QUARTERLY: &str = "\
TICKER,Type,Date_Quarter,ROA,ROE,NIM,CIR,NPL,Loan,Deposit
ACB,Private_1,3Q23,0.022,0.23,0.04,0.32,0.011,490,470
ACB,Private_1,4Q23,0.021,0.22,0.039,0.33,0.012,500,480
ACB,Private_1,1Q24,0.019,0.18,0.036,0.35,0.014,510,490
TCB,Private_1,1Q24,0.025,0.17,0.042,0.3,0.011,600,550
VCB,SOCB,4Q23,0.018,0.21,0.031,0.3,0.008,1380,1480
VCB,SOCB,1Q24,0.017,0.2,0.03,0.31,0.009,1400,1500
Private_1,Private_1,1Q24,0.018,0.19,0.037,0.34,0.015,4000,3900
Sector,Sector,1Q24,0.015,0.16,0.032,0.36,0.02,9000,9200
";

    pub(crate) const YEARLY: &str = "\
TICKER,Type,Year,ROA,ROE,NIM,CIR,NPL,Loan,Deposit,Total Assets,NPATMI
ACB,Private_1,2021,0.025,0.25,0.041,0.3,0.009,320,310,520,12
ACB,Private_1,2022,0.024,0.24,0.04,0.31,0.01,400,380,600,14
ACB,Private_1,2023,0.022,0.23,0.039,0.32,0.012,500,480,700,16
TCB,Private_1,2022,0.028,0.2,0.045,0.29,0.01,500,450,800,20
TCB,Private_1,2023,0.026,0.19,0.043,0.3,0.011,550,500,850,21
VCB,SOCB,2022,0.018,0.21,0.031,0.3,0.007,1200,1300,1800,30
VCB,SOCB,2023,0.017,0.2,0.03,0.29,0.009,1400,1500,2000,33
Sector,Sector,2023,0.015,0.16,0.032,0.35,0.02,9000,9200,14000,200
";

    pub(crate) const FORECAST: &str = "\
TICKER,Type,Year,ROA,ROE,NIM,NPL,Loan,PBT
ACB,Private_1,2024,0.02,0.21,0.037,0.013,575,25
ACB,Private_1,2025,0.021,0.22,0.038,0.012,650,29
VCB,SOCB,2024,0.018,0.21,0.031,0.008,1600,50
";

    pub(crate) const BANK_TYPE: &str = "TICKER,Type\nACB,Private_1\nTCB,Private_1\nVCB,SOCB\nBID,SOCB\n";

    pub(crate) const KEY_ITEMS: &str = "Name,KeyCode\nNet interest margin,NIM\nLoan,BS.13\n";

    pub(crate) const VALUATION: &str = "\
TICKER,Type,TRADE_DATE,PE_RATIO,PX_TO_BOOK_RATIO,PX_TO_SALES_RATIO
BID,SOCB,2024-01-04,10,2.0,3
BID,SOCB,2024-01-05,12,2.2,3.1
VCB,SOCB,2024-01-02,14,2.6,5
VCB,SOCB,2024-01-03,15,2.7,5.1
VCB,SOCB,2024-01-04,16,2.8,5.2
VCB,SOCB,2024-01-05,19,2.9,5.3
";

    pub(crate) const COMMENTS: &str = "\
TICKER,SECTOR,QUARTER,COMMENT,GENERATED_AT
ACB,Private_1,1Q24,ACB grew loans steadily.,2024-05-01 10:00:00
VCB,SOCB,1Q24,VCB kept asset quality strong.,2024-05-01 10:05:00
";

    pub(crate) const SECTOR_ANALYSIS: &str = "\
QUARTER,KEY_CHANGES,INDIVIDUAL_HIGHLIGHTS,FORWARD_OUTLOOK,FULL_ANALYSIS
1Q24,Credit growth slowed,TCB led on margins,Margins to recover,Sector earnings held up in 1Q24.
";

    /// A data directory holding every dataset file
    pub(crate) fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, body) in [
            (QUARTERLY_FILE, QUARTERLY),
            (YEARLY_FILE, YEARLY),
            (FORECAST_FILE, FORECAST),
            (BANK_TYPE_FILE, BANK_TYPE),
            (KEY_ITEMS_FILE, KEY_ITEMS),
            (VALUATION_FILE, VALUATION),
            (COMMENTS_FILE, COMMENTS),
            (SECTOR_ANALYSIS_FILE, SECTOR_ANALYSIS),
        ] {
            fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    /// Loaded snapshot of [`data_dir`]; the directory is removed afterwards
    pub(crate) fn bank_data() -> Arc<BankData> {
        let dir = data_dir();
        Arc::new(BankData::load(dir.path()).unwrap())
    }
}
