//! Simulated market-data and universe provider.
//!
//! Real provider clients live outside this workspace; `SimProvider` stands
//! in for them in the binary's dry-run mode and in integration tests. No
//! network traffic is ever generated.
//!
//! Bars come from a seeded geometric random walk replayed from a fixed
//! epoch, so the same (seed, symbol) pair always yields the same series
//! and consecutive date ranges line up like a real exchange's history.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use common::{DailyBar, Error, MarketDataProvider, Result, Timeframe, UniverseProvider};

const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "TSLA", "AVGO", "AMD", "NFLX", "CRM",
    "ORCL", "ADBE", "COST", "PEP", "KO", "JPM", "V", "MA", "UNH",
];

pub struct SimProvider {
    seed: u64,
    epoch: NaiveDate,
    universe: Vec<String>,
    fail: HashSet<String>,
}

impl SimProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            epoch: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid epoch"),
            universe: DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect(),
            fail: HashSet::new(),
        }
    }

    pub fn with_universe(mut self, symbols: Vec<String>) -> Self {
        self.universe = symbols;
        self
    }

    /// Inject a per-symbol outage; fetches for these symbols error.
    pub fn with_failures(mut self, symbols: &[&str]) -> Self {
        self.fail = symbols.iter().map(|s| s.to_string()).collect();
        self
    }

    fn symbol_rng(&self, symbol: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }
}

#[async_trait]
impl MarketDataProvider for SimProvider {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        if self.fail.contains(symbol) {
            return Err(Error::Provider(format!("{symbol}: simulated outage")));
        }

        let mut rng = self.symbol_rng(symbol);
        let mut close: f64 = 15.0 + rng.gen_range(0.0..235.0);
        let start = start.max(self.epoch);

        let mut bars = Vec::new();
        let mut date = self.epoch;
        // Replay the walk from the epoch so any requested sub-range is
        // consistent with every other request for the same symbol.
        while date <= end {
            let drift = 0.0006;
            let shock = (rng.gen_range(0.0..1.0) - 0.5) * 0.04;
            let open = close;
            close = (open * (1.0 + drift + shock)).max(0.5);
            let spread_up: f64 = rng.gen_range(0.0..0.015);
            let spread_down: f64 = rng.gen_range(0.0..0.015);
            let high = open.max(close) * (1.0 + spread_up);
            let low = open.min(close) * (1.0 - spread_down);
            let volume = 600_000.0 + rng.gen_range(0.0..2_400_000.0);

            if date >= start {
                bars.push(DailyBar {
                    symbol: symbol.to_string(),
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                });
            }
            date = date + chrono::Days::new(1);
        }

        debug!(symbol, rows = bars.len(), "simulated fetch");
        Ok(bars)
    }
}

#[async_trait]
impl UniverseProvider for SimProvider {
    async fn list_valid_instruments(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self.universe.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn same_seed_and_symbol_reproduce_the_same_series() {
        let provider = SimProvider::new(7);
        let a = provider
            .fetch_ohlcv("AAPL", Timeframe::Daily, date(2024, 1, 1), date(2024, 2, 1))
            .await
            .unwrap();
        let b = provider
            .fetch_ohlcv("AAPL", Timeframe::Daily, date(2024, 1, 1), date(2024, 2, 1))
            .await
            .unwrap();
        assert_eq!(a, b);

        let other = provider
            .fetch_ohlcv("MSFT", Timeframe::Daily, date(2024, 1, 1), date(2024, 2, 1))
            .await
            .unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn adjacent_ranges_continue_the_same_walk() {
        let provider = SimProvider::new(7);
        let whole = provider
            .fetch_ohlcv("NVDA", Timeframe::Daily, date(2024, 3, 1), date(2024, 3, 20))
            .await
            .unwrap();
        let head = provider
            .fetch_ohlcv("NVDA", Timeframe::Daily, date(2024, 3, 1), date(2024, 3, 10))
            .await
            .unwrap();
        let tail = provider
            .fetch_ohlcv("NVDA", Timeframe::Daily, date(2024, 3, 11), date(2024, 3, 20))
            .await
            .unwrap();

        let stitched: Vec<DailyBar> = head.into_iter().chain(tail).collect();
        assert_eq!(whole, stitched);
    }

    #[tokio::test]
    async fn bars_are_well_formed() {
        let provider = SimProvider::new(11);
        let bars = provider
            .fetch_ohlcv("AAPL", Timeframe::Daily, date(2024, 1, 1), date(2024, 4, 1))
            .await
            .unwrap();
        assert!(!bars.is_empty());
        for bar in &bars {
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.low > 0.0);
            assert!(bar.volume >= 600_000.0);
        }
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn injected_failures_error_out() {
        let provider = SimProvider::new(3).with_failures(&["AAPL"]);
        let result = provider
            .fetch_ohlcv("AAPL", Timeframe::Daily, date(2024, 1, 1), date(2024, 2, 1))
            .await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn universe_respects_the_limit() {
        let provider = SimProvider::new(3);
        let universe = provider.list_valid_instruments(5).await.unwrap();
        assert_eq!(universe.len(), 5);
        assert_eq!(universe[0], "AAPL");
    }
}
