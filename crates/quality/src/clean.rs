//! Unconditional series repair.
//!
//! `clean` is idempotent and never fails: it always returns its best
//! effort, dropping only rows that stay unrepairable. It operates on one
//! instrument's bars at a time (deduplication is keyed by date alone).

use std::collections::BTreeMap;

use common::DailyBar;
use tracing::debug;

/// Repair one instrument's series. Steps, in order:
/// dedup by date (last wins) → sort by date → clamp OHLC inversions →
/// zero out negative volume → interpolate zero-volume runs → interpolate
/// remaining non-finite numeric values (column-mean fallback at the
/// edges) → drop rows still violating the hard invariants.
pub fn clean(bars: Vec<DailyBar>) -> Vec<DailyBar> {
    if bars.is_empty() {
        return bars;
    }
    let input_len = bars.len();
    let symbol = bars[0].symbol.clone();

    // Dedup last-wins and sort in one go.
    let mut by_date: BTreeMap<chrono::NaiveDate, DailyBar> = BTreeMap::new();
    for bar in bars {
        by_date.insert(bar.date, bar);
    }
    let mut rows: Vec<DailyBar> = by_date.into_values().collect();

    // Repair OHLC inversions instead of discarding the row. The low clamp
    // deliberately uses the pre-clamp high.
    for row in &mut rows {
        let high_original = row.high;
        row.high = max_of(&[row.high, row.low, row.open, row.close]);
        row.low = min_of(&[row.low, high_original, row.open, row.close]);
        if row.volume < 0.0 {
            row.volume = 0.0;
        }
    }

    // Zero-volume runs become missing values, then interpolate. A series
    // with no positive volume at all keeps its zeros (still a legal value).
    let mut volumes: Vec<f64> = rows
        .iter()
        .map(|r| if r.volume == 0.0 { f64::NAN } else { r.volume })
        .collect();
    if interpolate_column(&mut volumes) {
        for (row, v) in rows.iter_mut().zip(&volumes) {
            row.volume = *v;
        }
    }

    // Remaining non-finite numeric values (bad quotes from the provider).
    for field in [Field::Open, Field::High, Field::Low, Field::Close, Field::Volume] {
        let mut column: Vec<f64> = rows.iter().map(|r| field.get(r)).collect();
        if column.iter().any(|v| !v.is_finite()) && interpolate_column(&mut column) {
            for (row, v) in rows.iter_mut().zip(&column) {
                field.set(row, *v);
            }
        }
    }

    // Drop what repair could not save.
    rows.retain(|r| {
        r.open.is_finite()
            && r.high.is_finite()
            && r.low.is_finite()
            && r.close.is_finite()
            && r.volume.is_finite()
            && r.open > 0.0
            && r.high > 0.0
            && r.low > 0.0
            && r.close > 0.0
            && r.volume >= 0.0
            && r.high >= r.low
    });

    if rows.len() != input_len {
        debug!(
            symbol = %symbol,
            before = input_len,
            after = rows.len(),
            "cleaner dropped or merged rows"
        );
    }
    rows
}

/// Linear interpolation of NaN gaps between finite neighbors; edge NaNs
/// fall back to the column mean. Returns false when the column has no
/// finite value to anchor on (caller keeps the original data).
fn interpolate_column(values: &mut [f64]) -> bool {
    let known: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();
    if known.is_empty() {
        return false;
    }

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a > 1 {
            let step = (values[b] - values[a]) / (b - a) as f64;
            for i in a + 1..b {
                values[i] = values[a] + step * (i - a) as f64;
            }
        }
    }

    let mean = known.iter().map(|&i| values[i]).sum::<f64>() / known.len() as f64;
    let (first, last) = (known[0], *known.last().expect("non-empty"));
    for v in &mut values[..first] {
        *v = mean;
    }
    for v in &mut values[last + 1..] {
        *v = mean;
    }
    true
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::max)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::min)
}

#[derive(Clone, Copy)]
enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    fn get(self, bar: &DailyBar) -> f64 {
        match self {
            Field::Open => bar.open,
            Field::High => bar.high,
            Field::Low => bar.low,
            Field::Close => bar.close,
            Field::Volume => bar.volume,
        }
    }

    fn set(self, bar: &mut DailyBar, value: f64) {
        match self {
            Field::Open => bar.open = value,
            Field::High => bar.high = value,
            Field::Low => bar.low = value,
            Field::Close => bar.close = value,
            Field::Volume => bar.volume = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{validate, QualityConfig};
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> DailyBar {
        DailyBar {
            symbol: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Days::new(day as u64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn inverted_ohlc_row_is_repaired_not_dropped() {
        let out = clean(vec![bar(0, 100.0, 95.0, 105.0, 102.0, -5.0)]);
        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert!(r.high >= r.close && r.high >= r.open, "high={}", r.high);
        assert!(r.low <= r.open && r.low <= r.close, "low={}", r.low);
        assert_eq!(r.volume, 0.0);
        assert!(validate(&out, &QualityConfig::default()).valid);
    }

    #[test]
    fn duplicate_dates_keep_the_last_row() {
        let mut second = bar(0, 100.0, 102.0, 99.0, 101.0, 2_000_000.0);
        second.close = 150.0;
        second.high = 151.0;
        let out = clean(vec![bar(0, 100.0, 102.0, 99.0, 101.0, 1_000_000.0), second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].close, 150.0);
    }

    #[test]
    fn rows_are_sorted_by_date() {
        let out = clean(vec![
            bar(2, 100.0, 102.0, 99.0, 101.0, 1e6),
            bar(0, 100.0, 102.0, 99.0, 101.0, 1e6),
            bar(1, 100.0, 102.0, 99.0, 101.0, 1e6),
        ]);
        assert!(out.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn zero_volume_run_is_interpolated() {
        let out = clean(vec![
            bar(0, 100.0, 102.0, 99.0, 101.0, 1000.0),
            bar(1, 100.0, 102.0, 99.0, 101.0, 0.0),
            bar(2, 100.0, 102.0, 99.0, 101.0, 0.0),
            bar(3, 100.0, 102.0, 99.0, 101.0, 4000.0),
        ]);
        assert_eq!(out[1].volume, 2000.0);
        assert_eq!(out[2].volume, 3000.0);
    }

    #[test]
    fn all_zero_volume_series_keeps_zeros() {
        let out = clean(vec![
            bar(0, 100.0, 102.0, 99.0, 101.0, 0.0),
            bar(1, 100.0, 102.0, 99.0, 101.0, 0.0),
        ]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.volume == 0.0));
    }

    #[test]
    fn nan_close_is_interpolated() {
        let out = clean(vec![
            bar(0, 100.0, 102.0, 99.0, 100.0, 1e6),
            bar(1, 100.0, 102.0, 99.0, f64::NAN, 1e6),
            bar(2, 100.0, 102.0, 99.0, 110.0, 1e6),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].close, 105.0);
    }

    #[test]
    fn unrepairable_rows_are_dropped() {
        let out = clean(vec![
            bar(0, 100.0, 102.0, 99.0, 101.0, 1e6),
            bar(1, -3.0, -1.0, -5.0, -2.0, 1e6),
        ]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn clean_is_idempotent() {
        let messy = vec![
            bar(0, 100.0, 95.0, 105.0, 102.0, -5.0),
            bar(2, 100.0, 102.0, 99.0, 101.0, 0.0),
            bar(1, 100.0, 102.0, 99.0, 101.0, 3000.0),
            bar(1, 100.0, 103.0, 98.0, 102.0, 2500.0),
        ];
        let once = clean(messy);
        let twice = clean(once.clone());
        assert_eq!(once, twice);
    }
}
