//! User message builders

use bank_core::Period;

/// JSON extraction request for the query parser
pub fn parser_prompt(question: &str, latest: Option<Period>, default_window: &[Period]) -> String {
    let latest = latest.map(|p| p.to_string()).unwrap_or_default();
    let window = default_window
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
Analyze this banking question and extract:
1. TICKERS: List ALL bank codes or sector names mentioned. Valid sectors are:
   - Sector (overall banking sector)
   - SOCB (state-owned commercial banks)
   - Private_1, Private_2, Private_3 (private bank groups)
   IMPORTANT:
   - Return ALL tickers mentioned in the question as a list
   - Preserve the exact format with underscore for Private sectors (e.g., "Private_1" not "Private 1")

2. TIMEFRAME: List of quarters mentioned (e.g., ["1Q24", "2Q24"])
   - If "current" or "latest", return ["{latest}"]
   - If no timeframe, return latest 4 quarters: [{window}]

3. METRICS: List of metric names mentioned (e.g., ["ROE", "NPL"]), empty for all metrics

4. VALUATION: Boolean - true if the question is about valuation metrics (e.g., P/E, P/B)
   - true if mentioned valuation terms like "P/E", "P/B", "valuation", "metrics"
   - true if user ask for investment recommendation
   - false otherwise

5. NEED_COMPONENTS: Boolean - true if the question requires individual bank data within a sector
   - true if asking for comparisons WITHIN a sector (e.g., "which bank in SOCB", "among all Private_1 banks")
   - true if asking "which one", "best among", "worst in", "ranking within"
   - false if only asking about sector-level aggregated analysis

Question: "{question}"

Return JSON: {{"tickers": [...], "timeframe": [...], "metrics": [...], "has_sectors": true/false, "valuation": true/false, "need_components": true/false}}
"#
    )
}

/// Answer request over a rendered data table
pub fn quantitative_prompt(question: &str, table: &str, valuation: &str) -> String {
    format!(
        "
Question: {question}

Data Table:
{table}{valuation}

Instructions:
- Give a concise and punchy answer. If asked for data only provide the most relevant data.
- Convert decimals to percentages (0.02 = 2%, 0.134 = 13.4%)
- Round numbers appropriately (billions, millions, percentages to 1 decimal)
- Be direct and specific with bank names and numbers
"
    )
}

/// Answer request over collected commentary
pub fn qualitative_prompt(question: &str, commentary: &str, valuation: &str) -> String {
    format!(
        "
Question: {question}

Available Analysis and Commentary:
{commentary}{valuation}

Instructions:
- Open with a concise conclusion of key findings, afterward followed with detailed analysis
- Give a concise and punchy answer. If asked for data only provide the most relevant data.
- Use specific examples and data points from the analysis
- Convert decimals to percentages (0.02 = 2%, 0.134 = 13.4%)
- Be punchy and assertive, max 2 paragraphs. Don't divert from the question
- Reference specific quarters and banks when relevant
"
    )
}

/// Commentary request for one bank and quarter
pub fn commentary_prompt(ticker: &str, sector: &str, quarter: &str, data: &str) -> String {
    format!(
        "Analyze the performance of {ticker} ({sector} bank) for {quarter}.

Financial data (last 6 quarters):
{data}

Provide a concise analysis covering:
1. Key performance metrics and trends
2. Asset quality assessment
3. Profitability analysis
4. Main strengths and concerns
5. Forward outlook

Keep the analysis to 200-250 words."
    )
}
