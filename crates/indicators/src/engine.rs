//! The indicator engine: one pass over a single instrument's bars that
//! appends the full derived-column superset.
//!
//! The engine is deterministic and side-effect free. It never removes or
//! reorders rows, and it never emits a partially-computed set: a column
//! whose window is not yet full is `None`, not stale. Callers detect "no
//! new columns" (all `None`) as the soft-failure signal for series that are
//! too short.

use common::{DailyBar, EnrichedBar, IndicatorSet};

use crate::rolling;

const ATR_PERIOD: usize = 20;
const SYSTEM1_ENTRY: usize = 20;
const SYSTEM1_EXIT: usize = 10;
const SYSTEM2_ENTRY: usize = 55;
const SYSTEM2_EXIT: usize = 20;
const VOLUME_PERIOD: usize = 20;
const MOMENTUM_SHORT: usize = 5;
const MOMENTUM_LONG: usize = 20;
const RSI_PERIOD: usize = 14;
const BNF_MA_PERIOD: usize = 25;
const EMA_SHORT: usize = 20;
const SMA_MID: usize = 50;
const SMA_LONG: usize = 100;
const SD_SHORT: usize = 10;
const SD_LONG: usize = 60;
const VOL_SHORT: usize = 10;
const VOL_LONG: usize = 60;
const RANGE_PERIOD: usize = 60;
const TREND_PERIOD: usize = 120;

/// Compute the indicator superset for one instrument's bars, assumed to be
/// sorted by date ascending (the store and cleaner both guarantee this).
pub fn compute(bars: &[DailyBar]) -> Vec<IndicatorSet> {
    if bars.is_empty() {
        return Vec::new();
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let tr = rolling::true_range(&highs, &lows, &closes);
    let atr = rolling::sma(&tr, ATR_PERIOD);

    // Breakout levels are taken over the *prior* window so a close can
    // meaningfully exceed them.
    let high_20 = rolling::rolling_max_prior(&highs, SYSTEM1_ENTRY);
    let low_10 = rolling::rolling_min_prior(&lows, SYSTEM1_EXIT);
    let high_55 = rolling::rolling_max_prior(&highs, SYSTEM2_ENTRY);
    let low_20 = rolling::rolling_min_prior(&lows, SYSTEM2_EXIT);

    let volume_20 = rolling::sma(&volumes, VOLUME_PERIOD);
    let momentum_5d = rolling::pct_change(&closes, MOMENTUM_SHORT);
    let momentum_20d = rolling::pct_change(&closes, MOMENTUM_LONG);
    let rsi = rolling::wilder_rsi(&closes, RSI_PERIOD);

    let sma_25 = rolling::sma(&closes, BNF_MA_PERIOD);

    let ema_20 = rolling::ema(&closes, EMA_SHORT);
    let sma_50 = rolling::sma(&closes, SMA_MID);
    let sma_100 = rolling::sma(&closes, SMA_LONG);
    let sd_10 = rolling::rolling_std(&closes, SD_SHORT);
    let sd_60 = rolling::rolling_std(&closes, SD_LONG);
    let vol_ma_10 = rolling::sma(&volumes, VOL_SHORT);
    let vol_ma_60 = rolling::sma(&volumes, VOL_LONG);
    let high_60 = rolling::rolling_max(&highs, RANGE_PERIOD);
    let low_60 = rolling::rolling_min(&lows, RANGE_PERIOD);

    let up_flags: Vec<f64> = closes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i > 0 && *c > closes[i - 1] {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let up_days_120 = rolling::rolling_sum(&up_flags, TREND_PERIOD);

    (0..bars.len())
        .map(|i| {
            let volume_ratio = volume_20[i].and_then(|v20| {
                if v20 > 0.0 {
                    Some(volumes[i] / v20)
                } else {
                    None
                }
            });
            let deviation_rate = sma_25[i].and_then(|ma| {
                if ma > 0.0 {
                    Some((closes[i] - ma) / ma)
                } else {
                    None
                }
            });
            let range_pct_60 = match (high_60[i], low_60[i]) {
                (Some(h), Some(l)) if h > 0.0 => Some((h - l) / h),
                _ => None,
            };

            IndicatorSet {
                atr: atr[i],
                high_20: high_20[i],
                low_10: low_10[i],
                high_55: high_55[i],
                low_20: low_20[i],
                volume_20: volume_20[i],
                volume_ratio,
                momentum_5d: momentum_5d[i],
                momentum_20d: momentum_20d[i],
                rsi: rsi[i],
                sma_25: sma_25[i],
                deviation_rate,
                ema_20: ema_20[i],
                sma_50: sma_50[i],
                sma_100: sma_100[i],
                sd_10: sd_10[i],
                sd_60: sd_60[i],
                vol_ma_10: vol_ma_10[i],
                vol_ma_60: vol_ma_60[i],
                high_60: high_60[i],
                low_60: low_60[i],
                range_pct_60,
                up_days_120: up_days_120[i],
            }
        })
        .collect()
}

/// Zip bars with their computed indicator sets.
pub fn enrich(bars: &[DailyBar]) -> Vec<EnrichedBar> {
    let sets = compute(bars);
    bars.iter()
        .cloned()
        .zip(sets)
        .map(|(bar, indicators)| EnrichedBar { bar, indicators })
        .collect()
}
