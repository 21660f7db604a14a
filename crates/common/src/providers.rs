use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{DailyBar, Result, Timeframe};

/// Abstraction over a remote OHLCV source.
///
/// Concrete network clients (exchange REST APIs, market-data vendors) live
/// outside this workspace and plug in through this trait; `sim::SimProvider`
/// implements it for tests and dry runs. Both `start` and `end` are
/// inclusive calendar dates.
///
/// Any error, empty result, or malformed row set is treated by the fetch
/// layer as a per-instrument failure, never as a batch abort.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
}

/// Source of the instrument universe to scan.
///
/// Implementations are expected to apply their own market-cap / volume /
/// liquidity filtering before returning; the pipeline does not re-validate
/// the list beyond per-row OHLCV checks.
#[async_trait]
pub trait UniverseProvider: Send + Sync {
    /// Ordered list of symbols, truncated to `limit`.
    async fn list_valid_instruments(&self, limit: usize) -> Result<Vec<String>>;
}
