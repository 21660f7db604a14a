//! End-to-end scan over the simulated provider and an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use common::{Error, StrategyName};
use fetch::{Fetcher, FetcherConfig, RateLimiter};
use pipeline::{gaps, Freshness, Pipeline, PipelineConfig, ScanOptions};
use sim::SimProvider;
use store::Store;
use strategies::StrategyParams;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn scan_options() -> ScanOptions {
    ScanOptions {
        strategies: StrategyName::ALL.to_vec(),
        ..ScanOptions::default()
    }
}

async fn build_pipeline(provider: SimProvider, universe_limit: usize) -> (Pipeline, Store) {
    let store = Store::connect("sqlite::memory:").await.unwrap();
    let provider = Arc::new(provider);
    let limiter = Arc::new(RateLimiter::new(10_000, Duration::from_secs(60)));
    let fetcher_cfg = FetcherConfig {
        max_workers: 4,
        batch_cooldown: Duration::from_millis(0),
        retry_delay: Duration::from_millis(10),
        ..FetcherConfig::default()
    };
    let fetcher = Fetcher::new(provider.clone(), limiter, fetcher_cfg);
    let cfg = PipelineConfig {
        universe_limit,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(store.clone(), fetcher, provider, StrategyParams::default(), cfg);
    (pipeline, store)
}

#[tokio::test]
async fn full_scan_syncs_enriches_and_evaluates() {
    let (pipeline, store) = build_pipeline(SimProvider::new(42), 5).await;

    let outcome = pipeline.run_scan(&scan_options(), as_of()).await.unwrap();
    assert_eq!(outcome.updated_instruments, 5);
    assert!(outcome.failed_instruments.is_empty());
    assert_eq!(outcome.signals.len(), 3);

    // Raw rows were persisted and enriched in place.
    let rows = store.load(None, None, None).await.unwrap();
    assert!(!rows.is_empty());
    let last = rows
        .iter()
        .filter(|r| r.bar.symbol == "AAPL")
        .last()
        .unwrap();
    assert!(last.indicators.atr.is_some());
    assert!(last.indicators.sma_25.is_some());

    // Signals are ranked by total score, and sub-scores always compose.
    for signals in outcome.signals.values() {
        assert!(signals
            .windows(2)
            .all(|w| w[0].total_score() >= w[1].total_score()));
        for signal in signals {
            assert_eq!(signal.sub_score_sum(), signal.total_score());
            assert!((0.0..=100.0).contains(&signal.total_score()));
        }
    }

    let status = pipeline.database_status(as_of()).await.unwrap();
    assert_eq!(status.instrument_count, 5);
    assert_eq!(status.freshness, Freshness::Current);
    assert_eq!(status.latest_date, Some(as_of()));
}

#[tokio::test]
async fn second_scan_skips_the_sync_when_fresh() {
    let (pipeline, _store) = build_pipeline(SimProvider::new(42), 3).await;

    let first = pipeline.run_scan(&scan_options(), as_of()).await.unwrap();
    assert_eq!(first.updated_instruments, 3);

    let second = pipeline.run_scan(&scan_options(), as_of()).await.unwrap();
    assert_eq!(second.updated_instruments, 0);
}

#[tokio::test]
async fn failing_instruments_are_reported_not_fatal() {
    let provider = SimProvider::new(42).with_failures(&["MSFT"]);
    let (pipeline, store) = build_pipeline(provider, 4).await;

    let outcome = pipeline.run_scan(&scan_options(), as_of()).await.unwrap();
    assert_eq!(outcome.failed_instruments, vec!["MSFT".to_string()]);
    assert_eq!(outcome.updated_instruments, 3);

    let msft = ["MSFT".to_string()];
    let rows = store.load(Some(&msft), None, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn resolver_returns_nothing_after_a_full_sync() {
    let (pipeline, store) = build_pipeline(SimProvider::new(42), 2).await;

    // Empty store: the resolver asks for the full lookback window.
    let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];
    let latest = store.latest_dates(&symbols).await.unwrap();
    let plan = gaps::resolve(&symbols, &latest, as_of(), 190);
    assert_eq!(
        plan.get("AAPL"),
        Some(&NaiveDate::from_ymd_opt(2023, 11, 24).unwrap())
    );

    pipeline.run_scan(&scan_options(), as_of()).await.unwrap();

    // Fully covered now: no entries at all.
    let latest = store.latest_dates(&symbols).await.unwrap();
    let plan = gaps::resolve(&symbols, &latest, as_of(), 190);
    assert!(plan.is_empty());
}

#[tokio::test]
async fn empty_strategy_list_is_a_config_error_before_any_fetch() {
    let (pipeline, store) = build_pipeline(SimProvider::new(42), 2).await;

    let opts = ScanOptions::default();
    let err = pipeline.run_scan(&opts, as_of()).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    // Nothing was fetched or stored.
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.record_count, 0);
}

#[tokio::test]
async fn skip_update_evaluates_from_the_store_alone() {
    let (pipeline, store) = build_pipeline(SimProvider::new(42), 2).await;

    let opts = ScanOptions {
        skip_update: true,
        ..scan_options()
    };
    let outcome = pipeline.run_scan(&opts, as_of()).await.unwrap();
    assert_eq!(outcome.updated_instruments, 0);
    assert!(outcome.signals.values().all(|s| s.is_empty()));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.record_count, 0);
}
