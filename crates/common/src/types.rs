use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bar granularity requested from a market-data provider.
///
/// The screener only trades in daily bars today; the enum exists so the
/// provider contract does not have to change when intraday support lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Daily,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Daily => write!(f, "1d"),
        }
    }
}

/// One OHLCV row for a single instrument on a single calendar date.
///
/// Price fields are expected to be positive and volume non-negative; the
/// quality layer repairs or rejects rows that violate this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Derived indicator columns for one bar. Sparse: a field is `None` until
/// its rolling window has enough history behind it.
///
/// The indicator engine always computes the full set so persisted rows are
/// comparable across strategies; each strategy reads only its own subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    // Turtle
    pub atr: Option<f64>,
    pub high_20: Option<f64>,
    pub low_10: Option<f64>,
    pub high_55: Option<f64>,
    pub low_20: Option<f64>,
    pub volume_20: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub momentum_5d: Option<f64>,
    pub momentum_20d: Option<f64>,
    pub rsi: Option<f64>,
    // BNF
    pub sma_25: Option<f64>,
    pub deviation_rate: Option<f64>,
    // Coiled spring
    pub ema_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_100: Option<f64>,
    pub sd_10: Option<f64>,
    pub sd_60: Option<f64>,
    pub vol_ma_10: Option<f64>,
    pub vol_ma_60: Option<f64>,
    pub high_60: Option<f64>,
    pub low_60: Option<f64>,
    pub range_pct_60: Option<f64>,
    pub up_days_120: Option<f64>,
}

/// A bar plus its derived columns: the unit the store persists and loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBar {
    pub bar: DailyBar,
    pub indicators: IndicatorSet,
}

impl EnrichedBar {
    /// Wrap a freshly fetched bar with no indicators computed yet.
    pub fn raw(bar: DailyBar) -> Self {
        Self {
            bar,
            indicators: IndicatorSet::default(),
        }
    }
}
