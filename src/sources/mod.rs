//! Market data providers.

pub mod alphavantage;

pub use alphavantage::AlphaVantageClient;

use crate::types::{BarSeries, Timeframe};
use std::future::Future;
use std::pin::Pin;

/// Source of bar history for one instrument and timeframe.
///
/// Providers never fail: network and parse problems are logged and come
/// back as an empty series, which the engine treats as "no signal".
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_bars<'a>(
        &'a self,
        instrument: &'a str,
        timeframe: Timeframe,
    ) -> Pin<Box<dyn Future<Output = BarSeries> + Send + 'a>>;
}
