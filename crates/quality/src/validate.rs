//! Per-instrument series validation.
//!
//! Errors reject the series outright; warnings flag it but let it through.
//! Validation never mutates; repair belongs to [`crate::clean`].

use std::collections::HashSet;

use common::DailyBar;
use tracing::debug;

use crate::QualityConfig;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate(bars: &[DailyBar], cfg: &QualityConfig) -> ValidationReport {
    let mut report = ValidationReport {
        valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    if bars.is_empty() {
        report.errors.push("series is empty".into());
        report.valid = false;
        return report;
    }

    check_values(bars, &mut report);
    check_ohlc_shape(bars, &mut report);
    check_price_anomalies(bars, cfg, &mut report);
    check_volume_anomalies(bars, cfg, &mut report);
    check_dates(bars, cfg, &mut report);

    if report.valid {
        debug!(symbol = %bars[0].symbol, rows = bars.len(), "series passed validation");
    } else {
        debug!(
            symbol = %bars[0].symbol,
            errors = ?report.errors,
            "series failed validation"
        );
    }
    report
}

fn check_values(bars: &[DailyBar], report: &mut ValidationReport) {
    let bad_price = bars
        .iter()
        .filter(|b| {
            !(b.open > 0.0) || !(b.high > 0.0) || !(b.low > 0.0) || !(b.close > 0.0)
                || !b.open.is_finite()
                || !b.high.is_finite()
                || !b.low.is_finite()
                || !b.close.is_finite()
        })
        .count();
    if bad_price > 0 {
        report
            .errors
            .push(format!("{bad_price} rows with non-positive price fields"));
        report.valid = false;
    }

    let negative_volume = bars.iter().filter(|b| b.volume < 0.0).count();
    if negative_volume > 0 {
        report
            .errors
            .push(format!("{negative_volume} rows with negative volume"));
        report.valid = false;
    }
}

fn check_ohlc_shape(bars: &[DailyBar], report: &mut ValidationReport) {
    let inverted = bars.iter().filter(|b| b.high < b.low).count();
    if inverted > 0 {
        report.errors.push(format!("{inverted} rows with high < low"));
        report.valid = false;
    }

    let high_below_open = bars.iter().filter(|b| b.high < b.open).count();
    if high_below_open > 0 {
        report
            .warnings
            .push(format!("{high_below_open} rows with high < open"));
    }
    let high_below_close = bars.iter().filter(|b| b.high < b.close).count();
    if high_below_close > 0 {
        report
            .warnings
            .push(format!("{high_below_close} rows with high < close"));
    }
    let low_above_open = bars.iter().filter(|b| b.low > b.open).count();
    if low_above_open > 0 {
        report
            .warnings
            .push(format!("{low_above_open} rows with low > open"));
    }
    let low_above_close = bars.iter().filter(|b| b.low > b.close).count();
    if low_above_close > 0 {
        report
            .warnings
            .push(format!("{low_above_close} rows with low > close"));
    }
}

fn check_price_anomalies(bars: &[DailyBar], cfg: &QualityConfig, report: &mut ValidationReport) {
    let mut jumps = 0usize;
    let mut max_jump = 0.0f64;
    for pair in bars.windows(2) {
        if pair[0].close > 0.0 {
            let change = ((pair[1].close - pair[0].close) / pair[0].close).abs();
            if change > cfg.max_price_deviation {
                jumps += 1;
                max_jump = max_jump.max(change);
            }
        }
    }
    if jumps > 0 {
        report.warnings.push(format!(
            "{jumps} single-day price moves above {:.0}% (max {:.1}%)",
            cfg.max_price_deviation * 100.0,
            max_jump * 100.0
        ));
    }

    if let Some(min_close) = bars
        .iter()
        .map(|b| b.close)
        .min_by(|a, b| a.total_cmp(b))
    {
        if min_close < cfg.min_close && min_close > 0.0 {
            report
                .warnings
                .push(format!("suspiciously low close observed: {min_close}"));
        }
    }
}

fn check_volume_anomalies(bars: &[DailyBar], cfg: &QualityConfig, report: &mut ValidationReport) {
    let zero_volume = bars.iter().filter(|b| b.volume == 0.0).count();
    if zero_volume > 0 {
        report
            .warnings
            .push(format!("{zero_volume} zero-volume rows"));
    }

    if bars.len() >= 2 {
        let n = bars.len() as f64;
        let mean = bars.iter().map(|b| b.volume).sum::<f64>() / n;
        let var = bars
            .iter()
            .map(|b| (b.volume - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let std = var.sqrt();
        if std > 0.0 {
            let outliers = bars
                .iter()
                .filter(|b| (b.volume - mean) / std > cfg.volume_outlier_sigma)
                .count();
            if outliers > 0 {
                report.warnings.push(format!(
                    "{outliers} volume outliers beyond {:.0} sigma",
                    cfg.volume_outlier_sigma
                ));
            }
        }
    }
}

fn check_dates(bars: &[DailyBar], cfg: &QualityConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    let duplicates = bars.iter().filter(|b| !seen.insert(b.date)).count();
    if duplicates > 0 {
        report.errors.push(format!("{duplicates} duplicate dates"));
        report.valid = false;
    }

    let unsorted = bars.windows(2).any(|w| w[1].date < w[0].date);
    if unsorted {
        report.warnings.push("dates are not in ascending order".into());
    }

    let gaps = bars
        .windows(2)
        .filter(|w| (w[1].date - w[0].date).num_days() > cfg.max_gap_days)
        .count();
    if gaps > 0 {
        report.warnings.push(format!(
            "{gaps} date gaps longer than {} days",
            cfg.max_gap_days
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn clean_series(n: u32) -> Vec<DailyBar> {
        (0..n)
            .map(|i| bar(i, 100.0, 102.0, 99.0, 101.0, 1_000_000.0))
            .collect()
    }

    #[test]
    fn well_formed_series_is_valid() {
        let report = validate(&clean_series(10), &QualityConfig::default());
        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn empty_series_is_rejected() {
        let report = validate(&[], &QualityConfig::default());
        assert!(!report.valid);
    }

    #[test]
    fn non_positive_price_is_an_error() {
        let mut bars = clean_series(5);
        bars[2].close = 0.0;
        let report = validate(&bars, &QualityConfig::default());
        assert!(!report.valid);
    }

    #[test]
    fn negative_volume_is_an_error() {
        let mut bars = clean_series(5);
        bars[1].volume = -10.0;
        assert!(!validate(&bars, &QualityConfig::default()).valid);
    }

    #[test]
    fn duplicate_dates_are_an_error() {
        let mut bars = clean_series(5);
        bars[3].date = bars[2].date;
        assert!(!validate(&bars, &QualityConfig::default()).valid);
    }

    #[test]
    fn inverted_high_low_is_an_error() {
        let mut bars = clean_series(5);
        bars[0].high = 95.0;
        bars[0].low = 105.0;
        assert!(!validate(&bars, &QualityConfig::default()).valid);
    }

    #[test]
    fn high_below_close_is_only_a_warning() {
        let mut bars = clean_series(5);
        bars[4].close = 103.0; // above high of 102
        let report = validate(&bars, &QualityConfig::default());
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("high < close")));
    }

    #[test]
    fn price_jump_and_gap_are_warnings() {
        let mut bars = clean_series(6);
        bars[3].close = 250.0; // > 50% jump
        bars[3].high = 255.0;
        bars[5].date = bars[4].date + chrono::Days::new(10);
        let report = validate(&bars, &QualityConfig::default());
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("price moves")));
        assert!(report.warnings.iter().any(|w| w.contains("date gaps")));
    }

    #[test]
    fn zero_volume_is_a_warning() {
        let mut bars = clean_series(5);
        bars[2].volume = 0.0;
        let report = validate(&bars, &QualityConfig::default());
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("zero-volume")));
    }
}
