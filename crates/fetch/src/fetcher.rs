//! Concurrent fetch orchestration: chunked batches against the remote
//! provider, a bounded worker pool per batch, per-call retry with
//! exponential backoff, and completion-order collection.
//!
//! A failing instrument never aborts its batch; it lands in the failure
//! list and the caller decides whether to retry on a later run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use common::{DailyBar, Error, MarketDataProvider, Result, Timeframe};

use crate::RateLimiter;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Concurrent workers within one batch.
    pub max_workers: usize,
    /// Requests per batch; bounds the burst against the provider.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_cooldown: Duration,
    /// Per-call timeout on the provider.
    pub fetch_timeout: Duration,
    /// Retries after the first attempt, per instrument.
    pub max_retries: u32,
    /// Base backoff delay; doubles per retry.
    pub retry_delay: Duration,
    /// Deadline for the whole `fetch_batch` call, enforced only at the
    /// wait-for-completion boundary.
    pub overall_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            batch_size: 50,
            batch_cooldown: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            overall_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: NaiveDate,
    /// Inclusive end date.
    pub end: NaiveDate,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub successes: HashMap<String, Vec<DailyBar>>,
    pub failures: Vec<String>,
}

pub struct Fetcher {
    provider: Arc<dyn MarketDataProvider>,
    limiter: Arc<RateLimiter>,
    cfg: FetcherConfig,
}

impl Fetcher {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        limiter: Arc<RateLimiter>,
        cfg: FetcherConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            cfg,
        }
    }

    /// Fetch a set of per-instrument ranges. Per-instrument errors are
    /// collected, never propagated; the outcome always covers every
    /// request either as a success or a failure.
    pub async fn fetch_batch(&self, requests: Vec<FetchRequest>) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        // A zero- or negative-length range is a caller bug, rejected
        // before submission rather than retried.
        let (valid, invalid): (Vec<_>, Vec<_>) =
            requests.into_iter().partition(|r| r.start < r.end);
        for request in invalid {
            warn!(
                symbol = %request.symbol,
                start = %request.start,
                end = %request.end,
                "rejecting invalid fetch range"
            );
            outcome.failures.push(request.symbol);
        }

        if valid.is_empty() {
            return outcome;
        }

        let total = valid.len();
        let batch_size = self.cfg.batch_size.max(1);
        let deadline = Instant::now() + self.cfg.overall_timeout;
        info!(
            requests = total,
            batches = total.div_ceil(batch_size),
            "starting batched fetch"
        );

        for (batch_index, chunk) in valid.chunks(batch_size).enumerate() {
            if batch_index > 0 {
                debug!(cooldown = ?self.cfg.batch_cooldown, "cooling down between batches");
                tokio::time::sleep(self.cfg.batch_cooldown).await;
            }
            if Instant::now() >= deadline {
                warn!(batch = batch_index, "fetch deadline reached before batch start");
                outcome
                    .failures
                    .extend(chunk.iter().map(|r| r.symbol.clone()));
                continue;
            }

            self.run_batch(chunk, deadline, &mut outcome).await;
        }

        info!(
            ok = outcome.successes.len(),
            failed = outcome.failures.len(),
            "batched fetch complete"
        );
        outcome
    }

    async fn run_batch(
        &self,
        chunk: &[FetchRequest],
        deadline: Instant,
        outcome: &mut FetchOutcome,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.cfg.max_workers.max(1)));
        let mut pending: HashSet<String> = chunk.iter().map(|r| r.symbol.clone()).collect();
        let mut tasks: JoinSet<(String, Result<Vec<DailyBar>>)> = JoinSet::new();

        for request in chunk.iter().cloned() {
            let provider = self.provider.clone();
            let limiter = self.limiter.clone();
            let semaphore = semaphore.clone();
            let cfg = self.cfg.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker semaphore closed");
                let result = fetch_one(provider, limiter, &cfg, &request).await;
                (request.symbol, result)
            });
        }

        // Results arrive in completion order, not submission order.
        let mut timed_out = false;
        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((symbol, Ok(bars))))) => {
                    pending.remove(&symbol);
                    debug!(symbol = %symbol, rows = bars.len(), "fetched");
                    outcome.successes.insert(symbol, bars);
                }
                Ok(Some(Ok((symbol, Err(error))))) => {
                    pending.remove(&symbol);
                    warn!(symbol = %symbol, error = %error, "fetch failed");
                    outcome.failures.push(symbol);
                }
                Ok(Some(Err(join_error))) => {
                    // Symbol resolved through `pending` after the loop.
                    warn!(error = %join_error, "fetch worker crashed");
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            // Unfinished work counts as failed, but the workers are not
            // interrupted; cleanup is fire-and-forget.
            warn!(
                outstanding = pending.len(),
                "fetch deadline reached; abandoning outstanding workers"
            );
            tasks.detach_all();
        }
        outcome.failures.extend(pending.into_iter());
    }
}

/// One instrument: rate-limiter admission, provider call under timeout,
/// exponential backoff between attempts. An empty payload is a failure.
async fn fetch_one(
    provider: Arc<dyn MarketDataProvider>,
    limiter: Arc<RateLimiter>,
    cfg: &FetcherConfig,
    request: &FetchRequest,
) -> Result<Vec<DailyBar>> {
    let mut last_error = Error::Provider("no attempt made".into());

    for attempt in 0..=cfg.max_retries {
        if attempt > 0 {
            let backoff = cfg.retry_delay * 2u32.pow(attempt - 1);
            debug!(
                symbol = %request.symbol,
                attempt,
                backoff = ?backoff,
                "retrying fetch"
            );
            tokio::time::sleep(backoff).await;
        }

        limiter.acquire().await;
        let call = provider.fetch_ohlcv(
            &request.symbol,
            Timeframe::Daily,
            request.start,
            request.end,
        );
        match tokio::time::timeout(cfg.fetch_timeout, call).await {
            Ok(Ok(bars)) if !bars.is_empty() => return Ok(bars),
            Ok(Ok(_)) => {
                last_error = Error::Provider(format!("{}: empty payload", request.symbol));
            }
            Ok(Err(error)) => last_error = error,
            Err(_) => {
                last_error = Error::Provider(format!(
                    "{}: no response within {:?}",
                    request.symbol, cfg.fetch_timeout
                ));
            }
        }
    }
    Err(last_error)
}
