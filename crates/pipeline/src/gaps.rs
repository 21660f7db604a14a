//! Per-instrument gap resolution: what range is missing locally?
//!
//! Only the *latest* stored date per instrument is considered. An internal
//! hole strictly before the latest date is never detected or backfilled;
//! coverage only ever extends forward.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use tracing::warn;

use common::{Error, Result};

/// Compute the fetch start for one instrument, or `None` when it is
/// already up to date. Never starts further back than the lookback
/// horizon, and never re-fetches already-covered trailing days.
///
/// Fails with [`Error::InvalidRange`] when the computed start lands after
/// `as_of`; callers must treat that as "skip this instrument".
pub fn fetch_start(
    symbol: &str,
    latest: Option<NaiveDate>,
    as_of: NaiveDate,
    lookback_days: i64,
) -> Result<Option<NaiveDate>> {
    let horizon = as_of - Duration::days(lookback_days);
    let start = match latest {
        None => horizon,
        Some(latest) if latest >= as_of => return Ok(None),
        Some(latest) => (latest + Duration::days(1)).max(horizon),
    };

    if as_of < start {
        return Err(Error::InvalidRange {
            symbol: symbol.to_string(),
            start,
            end: as_of,
        });
    }
    Ok(Some(start))
}

/// Map [`fetch_start`] over an instrument set. Up-to-date instruments are
/// omitted; invalid ranges are skipped with a warning.
pub fn resolve(
    instruments: &[String],
    latest_dates: &HashMap<String, NaiveDate>,
    as_of: NaiveDate,
    lookback_days: i64,
) -> HashMap<String, NaiveDate> {
    let mut plan = HashMap::new();
    for symbol in instruments {
        match fetch_start(symbol, latest_dates.get(symbol).copied(), as_of, lookback_days) {
            Ok(Some(start)) => {
                plan.insert(symbol.clone(), start);
            }
            Ok(None) => {}
            Err(error) => {
                warn!(symbol = %symbol, error = %error, "skipping instrument");
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unknown_instrument_starts_at_the_lookback_horizon() {
        let start = fetch_start("X", None, date(2024, 6, 1), 190).unwrap();
        assert_eq!(start, Some(date(2023, 11, 24)));
    }

    #[test]
    fn up_to_date_instrument_is_omitted() {
        assert_eq!(
            fetch_start("X", Some(date(2024, 6, 1)), date(2024, 6, 1), 190).unwrap(),
            None
        );
        assert_eq!(
            fetch_start("X", Some(date(2024, 6, 3)), date(2024, 6, 1), 190).unwrap(),
            None
        );
    }

    #[test]
    fn partially_covered_instrument_resumes_the_day_after_its_latest_row() {
        let start = fetch_start("X", Some(date(2024, 5, 20)), date(2024, 6, 1), 190).unwrap();
        assert_eq!(start, Some(date(2024, 5, 21)));
    }

    #[test]
    fn very_stale_instrument_is_clamped_to_the_horizon() {
        let start = fetch_start("X", Some(date(2023, 1, 15)), date(2024, 6, 1), 190).unwrap();
        assert_eq!(start, Some(date(2023, 11, 24)));
    }

    #[test]
    fn negative_lookback_is_an_invalid_range() {
        let err = fetch_start("X", None, date(2024, 6, 1), -5).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));
    }

    #[test]
    fn resolve_omits_covered_and_keeps_missing() {
        let instruments = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let mut latest = HashMap::new();
        latest.insert("A".to_string(), date(2024, 6, 1));
        latest.insert("B".to_string(), date(2024, 5, 25));

        let plan = resolve(&instruments, &latest, date(2024, 6, 1), 190);
        assert!(!plan.contains_key("A"));
        assert_eq!(plan.get("B"), Some(&date(2024, 5, 26)));
        assert_eq!(plan.get("C"), Some(&date(2023, 11, 24)));
    }

    proptest! {
        /// More stored history never widens the fetch window: the computed
        /// start never moves earlier as `latest` advances.
        #[test]
        fn later_coverage_never_moves_the_start_earlier(
            latest_a in 0i64..400,
            advance in 0i64..200,
            lookback in 1i64..400,
        ) {
            let as_of = date(2024, 6, 1);
            let base = as_of - Duration::days(400);
            let first = base + Duration::days(latest_a);
            let second = first + Duration::days(advance);

            let start_a = fetch_start("X", Some(first), as_of, lookback).unwrap();
            let start_b = fetch_start("X", Some(second), as_of, lookback).unwrap();

            // `None` means "nothing left to fetch", the latest possible start.
            match (start_a, start_b) {
                (Some(a), Some(b)) => prop_assert!(b >= a),
                (None, Some(_)) => prop_assert!(false, "coverage regressed"),
                _ => {}
            }
        }

        /// The start never precedes the lookback horizon.
        #[test]
        fn start_never_precedes_the_horizon(
            latest in proptest::option::of(0i64..500),
            lookback in 1i64..400,
        ) {
            let as_of = date(2024, 6, 1);
            let latest = latest.map(|d| as_of - Duration::days(d));
            if let Some(start) = fetch_start("X", latest, as_of, lookback).unwrap() {
                prop_assert!(start >= as_of - Duration::days(lookback));
                prop_assert!(start <= as_of);
            }
        }
    }
}
