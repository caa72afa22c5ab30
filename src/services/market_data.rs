use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::utils::http_client;

const YF_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("upstream status {0}")]
    UpstreamStatus(u16),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("no data in response")]
    NoData,
}

/// 1日分の株価バー
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// 株価データの取得口。失敗は空の結果として扱う
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn daily_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyBar>;
}

pub struct YahooMarketData {
    client: Client,
}

impl YahooMarketData {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client::create_yahoo_client()?,
        })
    }
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn daily_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyBar> {
        match fetch_daily_bars(&self.client, ticker, start, end).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!("failed to fetch daily bars for {}: {}", ticker, e);
                Vec::new()
            }
        }
    }
}

pub async fn fetch_daily_bars(
    client: &Client,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DailyBar>, MarketDataError> {
    // period2 は排他的なので翌日 0 時を渡す
    let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let period2 = (end + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();

    let url = format!("{}/{}", YF_CHART_URL, ticker);
    let resp = client
        .get(&url)
        .query(&[
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(MarketDataError::UpstreamStatus(status.as_u16()));
    }

    let body = resp.text().await?;
    let mut bars = parse_chart_body(&body)?;
    bars.retain(|b| b.date >= start && b.date <= end);
    Ok(bars)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

pub fn parse_chart_body(body: &str) -> Result<Vec<DailyBar>, MarketDataError> {
    let parsed: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = &parsed.chart.error {
        return Err(MarketDataError::Upstream(err.to_string()));
    }

    let result = parsed
        .chart
        .result
        .as_ref()
        .and_then(|r| r.first())
        .ok_or(MarketDataError::NoData)?;

    let timestamps = result.timestamp.as_ref().ok_or(MarketDataError::NoData)?;
    let quote = result
        .indicators
        .quote
        .first()
        .ok_or(MarketDataError::NoData)?;

    let mut bars = Vec::new();
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(dt) = DateTime::from_timestamp(ts, 0) else {
            continue;
        };
        // OHLC のいずれかが欠けている行はスキップ
        if let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
            quote.open.get(i),
            quote.high.get(i),
            quote.low.get(i),
            quote.close.get(i),
        ) {
            bars.push(DailyBar {
                date: dt.date_naive(),
                open: *open,
                high: *high,
                low: *low,
                close: *close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2023-01-02 〜 2023-01-04 の 3 営業日分、2 日目は close が欠損
    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "currency": "USD"},
                "timestamp": [1672617600, 1672704000, 1672790400],
                "indicators": {
                    "quote": [{
                        "open": [150.0, 151.0, 153.0],
                        "high": [155.0, 154.0, 156.0],
                        "low": [145.0, 150.5, 152.0],
                        "close": [152.0, null, 154.5],
                        "volume": [1000, 1200, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    const ERROR_BODY: &str = r#"{
        "chart": {
            "result": null,
            "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
        }
    }"#;

    #[test]
    fn parses_bars_and_skips_incomplete_rows() {
        let bars = parse_chart_body(CHART_BODY).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(bars[0].close, 152.0);
        assert_eq!(bars[0].volume, 1000);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2023, 1, 4).unwrap());
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn bars_are_chronological() {
        let bars = parse_chart_body(CHART_BODY).unwrap();
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn upstream_error_is_reported() {
        let err = parse_chart_body(ERROR_BODY).unwrap_err();
        assert!(matches!(err, MarketDataError::Upstream(_)));
    }

    #[test]
    fn malformed_body_is_reported() {
        assert!(parse_chart_body("not json").is_err());
    }
}
