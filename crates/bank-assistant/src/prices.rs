//! Daily share prices
//!
//! Closing prices come from the TCBS long-term bars endpoint. The
//! [`PriceSource`] trait lets tools and tests swap the HTTP client out.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

const TCBS_BARS_URL: &str = "https://apipubaws.tcbs.com.vn/stock-insight/v1/stock/bars-long-term";

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Days fetched before the start date so a holiday start still has a close
const LOOKBACK_DAYS: i64 = 30;

const LOOKAHEAD_DAYS: i64 = 5;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// One trading day's close
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Source of daily closing prices
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Closes between `from` and `to`, in any order
    async fn daily_closes(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<PricePoint>>;
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    data: Vec<Bar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bar {
    trading_date: Value,
    close: Option<f64>,
}

impl Bar {
    fn into_point(self) -> Option<PricePoint> {
        let date = trading_day(&self.trading_date)?;
        Some(PricePoint {
            date,
            close: self.close?,
        })
    }
}

/// `tradingDate` arrives either as an ISO timestamp or as epoch milliseconds
fn trading_day(raw: &Value) -> Option<NaiveDate> {
    match raw {
        Value::String(s) if s.contains('T') => s
            .get(..10)
            .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// TCBS price client
pub struct TcbsPriceClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
}

impl TcbsPriceClient {
    /// Create a client with the configured timeout and request rate
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.price_timeout)
            .default_headers(headers)
            .build()?;

        let per_second = NonZeroU32::new(config.price_requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self { client, rate_limiter })
    }
}

#[async_trait]
impl PriceSource for TcbsPriceClient {
    async fn daily_closes(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<PricePoint>> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("ticker", ticker.to_string()),
            ("type", "stock".to_string()),
            ("resolution", "D".to_string()),
            ("from", unix_seconds(from).to_string()),
            ("to", unix_seconds(to).to_string()),
        ];

        let response = self
            .client
            .get(TCBS_BARS_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| AssistantError::PriceApi(format!("Error fetching stock data: {e}")))?;

        if !response.status().is_success() {
            return Err(AssistantError::PriceApi(format!(
                "Price API error for {ticker}: {}",
                response.status()
            )));
        }

        let bars: BarsResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::PriceApi(format!("Failed to parse price response: {e}")))?;

        let points: Vec<PricePoint> = bars.data.into_iter().filter_map(Bar::into_point).collect();
        debug!(ticker, points = points.len(), "Fetched daily closes");
        Ok(points)
    }
}

/// Price change of one ticker between two dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPerformance {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub start_price: f64,
    pub end_date: NaiveDate,
    pub end_price: f64,
    pub performance_pct: f64,
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| AssistantError::PriceApi(format!("Invalid date format. Use YYYY-MM-DD: {e}")))
}

/// Last close on or before `day`; the earliest close when none precede it
fn close_on_or_before(points: &[PricePoint], day: NaiveDate) -> Option<PricePoint> {
    points
        .iter()
        .rev()
        .find(|p| p.date <= day)
        .or_else(|| points.first())
        .copied()
}

/// Performance between the closest trading days on or before `start` and `end`
pub async fn stock_performance(source: &dyn PriceSource, ticker: &str, start: &str, end: &str) -> Result<StockPerformance> {
    let ticker = ticker.trim().to_uppercase();
    let start_day = parse_day(start)?;
    let end_day = parse_day(end)?;

    let mut points = source
        .daily_closes(
            &ticker,
            start_day - Duration::days(LOOKBACK_DAYS),
            end_day + Duration::days(LOOKAHEAD_DAYS),
        )
        .await?;
    if points.is_empty() {
        return Err(AssistantError::PriceApi(format!("No price data available for {ticker}")));
    }
    points.sort_by_key(|p| p.date);

    let (Some(first), Some(last)) = (
        close_on_or_before(&points, start_day),
        close_on_or_before(&points, end_day),
    ) else {
        return Err(AssistantError::PriceApi(
            "Insufficient data for the requested date range".to_string(),
        ));
    };

    let change = if first.close > 0.0 {
        (last.close - first.close) / first.close * 100.0
    } else {
        0.0
    };

    Ok(StockPerformance {
        ticker,
        start_date: first.date,
        start_price: first.close,
        end_date: last.date,
        end_price: last.close,
        performance_pct: (change * 100.0).round() / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde_json::json;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(date: &str, close: f64) -> PricePoint {
        PricePoint { date: day(date), close }
    }

    #[test]
    fn test_trading_day_formats() {
        assert_eq!(trading_day(&json!("2024-03-29T00:00:00.000Z")), Some(day("2024-03-29")));
        assert_eq!(trading_day(&json!(1_711_670_400_000_i64)), Some(day("2024-03-29")));
        assert_eq!(trading_day(&json!(null)), None);
    }

    #[test]
    fn test_bars_response_parses() {
        let body = json!({"data": [
            {"tradingDate": "2024-01-02T00:00:00.000Z", "close": 84000.0, "open": 83000.0},
            {"tradingDate": "2024-01-03T00:00:00.000Z", "close": null}
        ]});
        let bars: BarsResponse = serde_json::from_value(body).unwrap();
        let points: Vec<_> = bars.data.into_iter().filter_map(Bar::into_point).collect();
        assert_eq!(points, vec![point("2024-01-02", 84000.0)]);
    }

    #[tokio::test]
    async fn test_performance_uses_prior_trading_days() {
        let mut source = MockPriceSource::new();
        source
            .expect_daily_closes()
            .with(eq("VCB"), eq(day("2023-12-02")), eq(day("2024-04-05")))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    point("2024-03-29", 90000.0),
                    point("2023-12-29", 80000.0),
                    point("2024-01-02", 81000.0),
                ])
            });

        // 2024-01-01 and 2024-03-31 are not trading days
        let perf = stock_performance(&source, "vcb", "2024-01-01", "2024-03-31").await.unwrap();
        assert_eq!(perf.ticker, "VCB");
        assert_eq!(perf.start_date, day("2023-12-29"));
        assert_eq!(perf.end_date, day("2024-03-29"));
        assert!((perf.performance_pct - 12.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_performance_errors() {
        let mut source = MockPriceSource::new();
        source.expect_daily_closes().returning(|_, _, _| Ok(Vec::new()));

        let err = stock_performance(&source, "ACB", "2024-01-01", "2024-02-01").await.unwrap_err();
        assert_eq!(err.to_string(), "Price API error: No price data available for ACB");

        let err = stock_performance(&source, "ACB", "01/01/2024", "2024-02-01").await.unwrap_err();
        assert!(err.to_string().contains("Invalid date format. Use YYYY-MM-DD"));
    }

    #[test]
    fn test_start_before_history_uses_first_close() {
        let points = vec![point("2024-01-05", 10.0), point("2024-01-08", 11.0)];
        assert_eq!(close_on_or_before(&points, day("2024-01-01")), Some(points[0]));
        assert_eq!(close_on_or_before(&points, day("2024-01-07")), Some(points[0]));
    }
}
