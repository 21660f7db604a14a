pub mod fetcher;
pub mod ratelimit;

pub use fetcher::{FetchOutcome, FetchRequest, Fetcher, FetcherConfig};
pub use ratelimit::RateLimiter;
