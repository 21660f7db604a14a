use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, StrategyName};
use fetch::{Fetcher, FetcherConfig, RateLimiter};
use pipeline::{Pipeline, PipelineConfig, ScanOptions};
use sim::SimProvider;
use store::Store;
use strategies::StrategyParams;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ───────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(db = %cfg.database_url, "screener starting");

    let strategies: Vec<StrategyName> = match std::env::var("STRATEGIES") {
        Ok(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse())
            .collect::<Result<_, _>>()?,
        Err(_) => StrategyName::ALL.to_vec(),
    };

    // ── Storage ──────────────────────────────────────────────────────────────
    let store = Store::connect(&cfg.database_url).await?;

    // ── Providers ────────────────────────────────────────────────────────────
    // Live exchange/vendor clients plug in behind the provider traits;
    // the deterministic simulator keeps the binary runnable offline.
    let provider = Arc::new(SimProvider::new(42));

    // ── Fetch layer ──────────────────────────────────────────────────────────
    let limiter = Arc::new(RateLimiter::new(
        cfg.rate_limit_max_requests,
        Duration::from_secs(cfg.rate_limit_window_secs),
    ));
    let fetcher = Fetcher::new(
        provider.clone(),
        limiter,
        FetcherConfig {
            max_workers: cfg.fetch_max_workers,
            batch_size: cfg.fetch_batch_size,
            batch_cooldown: Duration::from_secs(cfg.fetch_batch_cooldown_secs),
            fetch_timeout: Duration::from_secs(cfg.fetch_timeout_secs),
            max_retries: cfg.fetch_max_retries,
            retry_delay: Duration::from_millis(cfg.fetch_retry_delay_ms),
            overall_timeout: Duration::from_secs(cfg.fetch_overall_timeout_secs),
        },
    );

    // ── Pipeline ─────────────────────────────────────────────────────────────
    let pipeline = Pipeline::new(
        store,
        fetcher,
        provider,
        StrategyParams::default(),
        PipelineConfig {
            universe_limit: cfg.universe_limit,
            lookback_days: cfg.lookback_days,
            retain_days: cfg.retain_days,
            stale_after_days: cfg.stale_after_days,
            account_value: cfg.account_value,
        },
    );

    let today = chrono::Utc::now().date_naive();

    let status = pipeline.database_status(today).await?;
    info!(
        records = status.record_count,
        instruments = status.instrument_count,
        freshness = %status.freshness,
        "database status"
    );

    // ── Scan ─────────────────────────────────────────────────────────────────
    let opts = ScanOptions {
        strategies,
        ..ScanOptions::default()
    };
    let outcome = pipeline.run_scan(&opts, today).await?;

    for (strategy, signals) in &outcome.signals {
        info!(strategy = %strategy, count = signals.len(), "signals");
        for signal in signals.iter().take(5) {
            info!(
                symbol = signal.symbol(),
                score = signal.total_score(),
                price = signal.reference_price(),
                "  candidate"
            );
        }
    }
    info!(
        updated = outcome.updated_instruments,
        failed = outcome.failed_instruments.len(),
        "scan finished"
    );

    Ok(())
}
