/// All operational configuration, loaded from environment variables at
/// startup. Missing or malformed required variables cause an immediate
/// panic with a clear message; everything else has a default.
///
/// Strategy thresholds are not configured here; they live in the strategy
/// parameter structs and are overridable through a flat key/value map.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    pub retain_days: i64,

    // Scan
    pub universe_limit: usize,
    pub lookback_days: i64,
    pub account_value: f64,
    /// Data older than this many days triggers a sync before evaluation.
    pub stale_after_days: i64,

    // Fetch
    pub fetch_max_workers: usize,
    pub fetch_batch_size: usize,
    pub fetch_batch_cooldown_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_retry_delay_ms: u64,
    pub fetch_overall_timeout_secs: u64,

    // Rate limiting
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on a missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            database_url: required_env("DATABASE_URL"),
            retain_days: parsed_env("RETAIN_DAYS", 190),
            universe_limit: parsed_env("UNIVERSE_LIMIT", 200),
            lookback_days: parsed_env("LOOKBACK_DAYS", 190),
            account_value: parsed_env("ACCOUNT_VALUE", 100_000.0),
            stale_after_days: parsed_env("STALE_AFTER_DAYS", 1),
            fetch_max_workers: parsed_env("FETCH_MAX_WORKERS", 2),
            fetch_batch_size: parsed_env("FETCH_BATCH_SIZE", 50),
            fetch_batch_cooldown_secs: parsed_env("FETCH_BATCH_COOLDOWN_SECS", 3),
            fetch_timeout_secs: parsed_env("FETCH_TIMEOUT_SECS", 30),
            fetch_max_retries: parsed_env("FETCH_MAX_RETRIES", 3),
            fetch_retry_delay_ms: parsed_env("FETCH_RETRY_DELAY_MS", 1000),
            fetch_overall_timeout_secs: parsed_env("FETCH_OVERALL_TIMEOUT_SECS", 600),
            rate_limit_max_requests: parsed_env("RATE_LIMIT_MAX_REQUESTS", 50),
            rate_limit_window_secs: parsed_env("RATE_LIMIT_WINDOW_SECS", 60),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable '{key}' has invalid value: '{raw}'")),
        Err(_) => default,
    }
}
