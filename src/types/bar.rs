use serde::{Deserialize, Serialize};

/// Bar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    M1,
    #[serde(rename = "5min")]
    M5,
    #[serde(rename = "15min")]
    M15,
    #[serde(rename = "30min")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Parse a timeframe label.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1min" | "1m" => Some(Timeframe::M1),
            "5min" | "5m" => Some(Timeframe::M5),
            "15min" | "15m" => Some(Timeframe::M15),
            "30min" | "30m" => Some(Timeframe::M30),
            "1h" | "60min" | "1hour" => Some(Timeframe::H1),
            "4h" | "240min" | "4hour" => Some(Timeframe::H4),
            "1d" | "1day" | "daily" => Some(Timeframe::D1),
            _ => None,
        }
    }

    /// Canonical label.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1min",
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::M30 => "30min",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Bar duration in minutes.
    pub fn minutes(&self) -> i64 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One OHLCV observation. `time` is a unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bar as delivered by a provider, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBar {
    pub time: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    /// Validate into a [`Bar`]. Missing or non-finite prices, negative volume
    /// and inverted ranges are rejected.
    pub fn validate(&self) -> Option<Bar> {
        let bar = Bar {
            time: self.time?,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume.unwrap_or(0.0),
        };

        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return None;
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 || bar.high < bar.low {
            return None;
        }

        Some(bar)
    }
}

impl From<Bar> for RawBar {
    fn from(bar: Bar) -> Self {
        Self {
            time: Some(bar.time),
            open: Some(bar.open),
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
            volume: Some(bar.volume),
        }
    }
}

/// Time-ordered bars for one instrument/timeframe pair.
///
/// Timestamps are strictly increasing; construction sorts and drops
/// duplicates so downstream code can rely on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series from validated bars.
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.time);
        bars.dedup_by_key(|b| b.time);
        Self { bars }
    }

    /// Build a series from provider bars, dropping malformed entries.
    pub fn from_raw(raw: &[RawBar]) -> Self {
        let bars: Vec<Bar> = raw.iter().filter_map(RawBar::validate).collect();
        let dropped = raw.len() - bars.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} malformed bars", dropped);
        }
        Self::new(bars)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Typical bar interval in minutes: the median spacing, so session and
    /// weekend gaps do not skew it.
    pub fn bar_minutes(&self) -> Option<i64> {
        let mut gaps: Vec<i64> = self
            .bars
            .windows(2)
            .map(|pair| (pair[1].time - pair[0].time) / 60_000)
            .filter(|gap| *gap > 0)
            .collect();
        if gaps.is_empty() {
            return None;
        }
        gaps.sort_unstable();
        Some(gaps[(gaps.len() - 1) / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> Bar {
        Bar {
            time,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_timeframe_parse_labels() {
        assert_eq!(Timeframe::from_str("15min"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str("60min"), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_str("4H"), Some(Timeframe::H4));
        assert_eq!(Timeframe::from_str("weekly"), None);
    }

    #[test]
    fn test_timeframe_ordering_follows_duration() {
        let mut tfs = vec![Timeframe::H4, Timeframe::M5, Timeframe::H1, Timeframe::M15];
        tfs.sort();
        assert_eq!(tfs, vec![Timeframe::M5, Timeframe::M15, Timeframe::H1, Timeframe::H4]);
    }

    #[test]
    fn test_series_sorts_and_dedups() {
        let series = BarSeries::new(vec![bar(3, 3.0), bar(1, 1.0), bar(3, 9.0), bar(2, 2.0)]);
        let times: Vec<i64> = series.bars().iter().map(|b| b.time).collect();
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_raw_drops_malformed_bars() {
        let raw = vec![
            RawBar::from(bar(1, 10.0)),
            RawBar {
                time: Some(2),
                open: Some(10.0),
                high: None,
                low: Some(9.0),
                close: Some(10.0),
                volume: Some(1.0),
            },
            RawBar {
                time: Some(3),
                open: Some(10.0),
                high: Some(f64::NAN),
                low: Some(9.0),
                close: Some(10.0),
                volume: Some(1.0),
            },
            RawBar::from(bar(4, 11.0)),
        ];

        let series = BarSeries::from_raw(&raw);
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().time, 4);
    }

    #[test]
    fn test_bar_minutes_from_spacing() {
        let series = BarSeries::new(vec![bar(0, 1.0), bar(900_000, 1.0)]);
        assert_eq!(series.bar_minutes(), Some(15));
        assert_eq!(BarSeries::empty().bar_minutes(), None);
    }

    #[test]
    fn test_bar_minutes_ignores_gaps() {
        let mut bars: Vec<Bar> = (0..10).map(|i| bar(i * 900_000, 1.0)).collect();
        bars.push(bar(9 * 900_000 + 7_200_000, 1.0));
        bars.push(bar(9 * 900_000 + 7_200_000 + 172_800_000, 1.0));
        assert_eq!(BarSeries::new(bars).bar_minutes(), Some(15));
    }

    #[test]
    fn test_candle_anatomy() {
        let b = Bar {
            time: 0,
            open: 10.0,
            high: 14.0,
            low: 8.0,
            close: 12.0,
            volume: 0.0,
        };
        assert_eq!(b.body(), 2.0);
        assert_eq!(b.range(), 6.0);
        assert_eq!(b.upper_shadow(), 2.0);
        assert_eq!(b.lower_shadow(), 2.0);
        assert!(b.is_bullish());
    }
}
