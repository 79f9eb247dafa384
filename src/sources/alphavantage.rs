//! Alpha Vantage API client for intraday and daily bars.
//!
//! Note: Free tier has very limited rate limits (25 requests/day, 5/minute),
//! so the runner spaces calls with a fixed delay.

use crate::sources::DataProvider;
use crate::types::{Bar, BarSeries, RawBar, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

/// Time series response. The series key depends on the endpoint
/// ("Time Series (Daily)", "Time Series (5min)", ...).
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesResponse {
    #[serde(rename = "Meta Data")]
    pub meta_data: Option<TimeSeriesMetaData>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub time_series: HashMap<String, serde_json::Value>,
}

/// Time series meta data.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesMetaData {
    #[serde(rename = "1. Information")]
    pub information: Option<String>,
    #[serde(rename = "2. Symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "3. Last Refreshed")]
    pub last_refreshed: Option<String>,
}

/// Individual time series data point. Volume is absent for some markets.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesDataPoint {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. volume")]
    pub volume: Option<String>,
}

impl TimeSeriesDataPoint {
    fn to_raw(&self, time: i64) -> RawBar {
        RawBar {
            time: Some(time),
            open: self.open.parse().ok(),
            high: self.high.parse().ok(),
            low: self.low.parse().ok(),
            close: self.close.parse().ok(),
            volume: self.volume.as_deref().and_then(|v| v.parse().ok()),
        }
    }
}

/// Alpha Vantage API client.
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Request URL for a timeframe. Four-hour bars are built from hourly ones.
    pub fn url_for(&self, symbol: &str, timeframe: Timeframe) -> String {
        match timeframe {
            Timeframe::D1 => format!(
                "{}?function=TIME_SERIES_DAILY&symbol={}&outputsize=compact&apikey={}",
                ALPHA_VANTAGE_URL, symbol, self.api_key
            ),
            _ => format!(
                "{}?function=TIME_SERIES_INTRADAY&symbol={}&interval={}&outputsize=full&apikey={}",
                ALPHA_VANTAGE_URL,
                symbol,
                Self::interval(timeframe),
                self.api_key
            ),
        }
    }

    fn interval(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M1 => "1min",
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::M30 => "30min",
            Timeframe::H1 | Timeframe::H4 | Timeframe::D1 => "60min",
        }
    }

    /// Fetch bars for a timeframe.
    pub async fn get_bars(&self, symbol: &str, timeframe: Timeframe) -> Result<BarSeries, String> {
        let url = self.url_for(symbol, timeframe);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("API error: {}", response.status()));
        }

        let data: TimeSeriesResponse = response
            .json()
            .await
            .map_err(|e| format!("Parse error: {}", e))?;

        let series = Self::parse_series(data)?;
        if timeframe == Timeframe::H4 {
            return Ok(aggregate(&series, Timeframe::H4));
        }
        Ok(series)
    }

    /// Pull the bars out of a time series response.
    pub fn parse_series(data: TimeSeriesResponse) -> Result<BarSeries, String> {
        if let Some(message) = data.error_message {
            return Err(format!("API error: {}", message));
        }
        if let Some(note) = data.note {
            return Err(format!("Rate limited: {}", note));
        }

        let points = data
            .time_series
            .into_iter()
            .find(|(key, _)| key.starts_with("Time Series"))
            .map(|(_, value)| value)
            .ok_or_else(|| "No time series data available".to_string())?;

        let points: HashMap<String, TimeSeriesDataPoint> =
            serde_json::from_value(points).map_err(|e| format!("Parse error: {}", e))?;

        let raw: Vec<RawBar> = points
            .iter()
            .filter_map(|(stamp, point)| Some(point.to_raw(parse_timestamp(stamp)?)))
            .collect();

        Ok(BarSeries::from_raw(&raw))
    }
}

impl DataProvider for AlphaVantageClient {
    fn name(&self) -> &str {
        "alphavantage"
    }

    fn fetch_bars<'a>(
        &'a self,
        instrument: &'a str,
        timeframe: Timeframe,
    ) -> Pin<Box<dyn Future<Output = BarSeries> + Send + 'a>> {
        Box::pin(async move {
            match self.get_bars(instrument, timeframe).await {
                Ok(series) => {
                    debug!("{} {}: {} bars", instrument, timeframe, series.len());
                    series
                }
                Err(e) => {
                    warn!("Alpha Vantage {} {} failed: {}", instrument, timeframe, e);
                    BarSeries::empty()
                }
            }
        })
    }
}

/// Parse "2024-01-15 16:00:00" or "2024-01-15" into unix milliseconds (UTC).
fn parse_timestamp(stamp: &str) -> Option<i64> {
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    let date = chrono::NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// Merge bars into buckets of `timeframe` aligned to the epoch.
pub fn aggregate(series: &BarSeries, timeframe: Timeframe) -> BarSeries {
    let bucket_ms = timeframe.minutes() * 60_000;
    let mut out: Vec<Bar> = Vec::new();

    for bar in series.bars() {
        let start = bar.time - bar.time.rem_euclid(bucket_ms);
        match out.last_mut() {
            Some(current) if current.time == start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(Bar {
                time: start,
                ..*bar
            }),
        }
    }

    BarSeries::new(out)
}
