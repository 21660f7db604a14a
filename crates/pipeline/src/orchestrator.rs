//! The scan orchestrator: resolve gaps → fetch → validate → persist raw →
//! enrich → persist enriched → evaluate strategies → ranked signals.
//!
//! Only the fetch phase is concurrent; everything downstream iterates
//! instruments sequentially and is keyed by symbol, never by position.
//! All collaborators are injected with caller-owned lifetimes; there is
//! no process-wide instance of anything here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{DailyBar, EnrichedBar, Error, Result, Signal, StrategyName, UniverseProvider};
use fetch::{FetchRequest, Fetcher};
use quality::QualityConfig;
use store::Store;
use strategies::{build_strategies, StrategyParams};

use crate::gaps;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub universe_limit: usize,
    pub lookback_days: i64,
    pub retain_days: i64,
    /// Store data older than this many days triggers a sync.
    pub stale_after_days: i64,
    pub account_value: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            universe_limit: 200,
            lookback_days: 190,
            retain_days: 190,
            stale_after_days: 1,
            account_value: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub strategies: Vec<StrategyName>,
    /// Sync even when the store looks fresh.
    pub force_update: bool,
    /// Evaluate straight from the store without touching the provider.
    pub skip_update: bool,
    pub lookback_days: Option<i64>,
    pub account_value: Option<f64>,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    /// Per strategy, sorted by total score descending.
    pub signals: HashMap<StrategyName, Vec<Signal>>,
    pub failed_instruments: Vec<String>,
    pub updated_instruments: usize,
}

/// How stale the newest stored row is relative to the scan date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Current,
    Yesterday,
    Recent,
    Outdated,
    NoData,
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::Current => write!(f, "current"),
            Freshness::Yesterday => write!(f, "yesterday"),
            Freshness::Recent => write!(f, "recent"),
            Freshness::Outdated => write!(f, "outdated"),
            Freshness::NoData => write!(f, "no_data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseStatus {
    pub record_count: i64,
    pub instrument_count: i64,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub size_bytes: i64,
    pub latest_date: Option<NaiveDate>,
    pub freshness: Freshness,
}

pub struct Pipeline {
    store: Store,
    fetcher: Fetcher,
    universe: Arc<dyn UniverseProvider>,
    params: StrategyParams,
    quality: QualityConfig,
    cfg: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Store,
        fetcher: Fetcher,
        universe: Arc<dyn UniverseProvider>,
        params: StrategyParams,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            universe,
            params,
            quality: QualityConfig::default(),
            cfg,
        }
    }

    /// Run one scan as of the given date.
    ///
    /// Configuration problems (no strategies, unknown names upstream) and
    /// storage faults are the only errors; per-instrument fetch or
    /// validation failures are collected in the outcome instead.
    pub async fn run_scan(&self, opts: &ScanOptions, as_of: NaiveDate) -> Result<ScanOutcome> {
        if opts.strategies.is_empty() {
            return Err(Error::Config("no strategies requested".into()));
        }
        let strategies = build_strategies(&opts.strategies, &self.params);
        let lookback_days = opts.lookback_days.unwrap_or(self.cfg.lookback_days);
        let account_value = opts.account_value.unwrap_or(self.cfg.account_value);

        let run_id = Uuid::new_v4();
        info!(%run_id, %as_of, lookback_days, "scan starting");

        let symbols = self
            .universe
            .list_valid_instruments(self.cfg.universe_limit)
            .await?;
        if symbols.is_empty() {
            return Err(Error::Provider("universe provider returned no instruments".into()));
        }

        let (failed_instruments, updated_instruments) = if opts.skip_update {
            info!("skipping data sync on request");
            (Vec::new(), 0)
        } else {
            self.sync(&symbols, as_of, lookback_days, opts.force_update)
                .await?
        };

        // Evaluation: load the window once, enrich per instrument, then
        // let each strategy look at the latest row.
        let horizon = as_of - chrono::Duration::days(lookback_days);
        let rows = self
            .store
            .load(Some(&symbols), Some(horizon), Some(as_of))
            .await?;

        let mut bars_by_symbol: BTreeMap<String, Vec<DailyBar>> = BTreeMap::new();
        for row in rows {
            bars_by_symbol
                .entry(row.bar.symbol.clone())
                .or_default()
                .push(row.bar);
        }
        let enriched_by_symbol: BTreeMap<&String, Vec<EnrichedBar>> = bars_by_symbol
            .iter()
            .map(|(symbol, bars)| (symbol, indicators::enrich(bars)))
            .collect();

        let mut signals: HashMap<StrategyName, Vec<Signal>> = HashMap::new();
        for strategy in &strategies {
            let mut found = Vec::new();
            for series in enriched_by_symbol.values() {
                found.extend(strategy.detect(series, account_value));
            }
            found.sort_by(|a, b| {
                b.total_score()
                    .partial_cmp(&a.total_score())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            info!(
                strategy = %strategy.name(),
                signals = found.len(),
                "{}",
                strategy.describe()
            );
            signals.insert(strategy.name(), found);
        }

        info!(
            %run_id,
            updated = updated_instruments,
            failed = failed_instruments.len(),
            "scan complete"
        );
        Ok(ScanOutcome {
            run_id,
            as_of,
            signals,
            failed_instruments,
            updated_instruments,
        })
    }

    /// Incremental sync: fetch what is missing, repair and validate it,
    /// persist raw rows, then write enriched rows back over the full
    /// window and prune old history.
    async fn sync(
        &self,
        symbols: &[String],
        as_of: NaiveDate,
        lookback_days: i64,
        force: bool,
    ) -> Result<(Vec<String>, usize)> {
        if !force {
            if let Some(latest) = self.store.latest_date(None).await? {
                if (as_of - latest).num_days() <= self.cfg.stale_after_days {
                    info!(%latest, "store is fresh; skipping sync");
                    return Ok((Vec::new(), 0));
                }
            }
        }

        let latest_dates = self.store.latest_dates(symbols).await?;
        let plan = gaps::resolve(symbols, &latest_dates, as_of, lookback_days);
        if plan.is_empty() {
            info!("all instruments are up to date");
            return Ok((Vec::new(), 0));
        }
        info!(instruments = plan.len(), "fetching missing ranges");

        let requests: Vec<FetchRequest> = plan
            .into_iter()
            .map(|(symbol, start)| FetchRequest {
                symbol,
                start,
                end: as_of,
            })
            .collect();
        let outcome = self.fetcher.fetch_batch(requests).await;

        let mut failures = outcome.failures;
        let mut updated: Vec<String> = Vec::new();
        for (symbol, bars) in outcome.successes {
            let cleaned = quality::clean(bars);
            let report = quality::validate(&cleaned, &self.quality);
            if !report.valid {
                warn!(symbol = %symbol, errors = ?report.errors, "series rejected by validator");
                failures.push(symbol);
                continue;
            }
            for warning in &report.warnings {
                debug!(symbol = %symbol, warning = %warning, "data quality warning");
            }

            let raw: Vec<EnrichedBar> = cleaned.into_iter().map(EnrichedBar::raw).collect();
            self.store.save(&raw).await?;
            updated.push(symbol);
        }

        // Enrichment write-back over the full stored window, so indicator
        // columns stay consistent across the fetch boundary.
        let horizon = as_of - chrono::Duration::days(lookback_days);
        for symbol in &updated {
            let filter = [symbol.clone()];
            let stored = self
                .store
                .load(Some(&filter), Some(horizon), Some(as_of))
                .await?;
            let bars: Vec<DailyBar> = stored.into_iter().map(|r| r.bar).collect();
            let enriched = indicators::enrich(&bars);
            self.store.save(&enriched).await?;
        }

        let pruned = self.store.prune(self.cfg.retain_days, as_of).await?;
        info!(
            updated = updated.len(),
            failed = failures.len(),
            pruned,
            "sync complete"
        );
        Ok((failures, updated.len()))
    }

    /// Storage summary plus a freshness classification of the newest row.
    pub async fn database_status(&self, as_of: NaiveDate) -> Result<DatabaseStatus> {
        let stats = self.store.stats().await?;
        let latest_date = self.store.latest_date(None).await?;

        let freshness = match latest_date {
            None => Freshness::NoData,
            Some(latest) => match (as_of - latest).num_days() {
                n if n <= 0 => Freshness::Current,
                1 => Freshness::Yesterday,
                n if n <= 3 => Freshness::Recent,
                _ => Freshness::Outdated,
            },
        };

        Ok(DatabaseStatus {
            record_count: stats.record_count,
            instrument_count: stats.instrument_count,
            date_range: stats.date_range,
            size_bytes: stats.size_bytes,
            latest_date,
            freshness,
        })
    }
}
