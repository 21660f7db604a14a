//! Trailing-window rate limiter for one named provider.
//!
//! Admissions are recorded *before* the remote call executes, so the
//! worst-case burst stays bounded even when call latency varies wildly.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        assert!(max_requests >= 1, "rate limit must admit at least one request");
        Self {
            max_requests,
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until the trailing-window count is below quota, then record
    /// this call as consumed and return. Multiple workers may wait
    /// concurrently; coarse locking is fine since fetch throughput is
    /// bounded by network latency, not lock contention.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut admissions = self
                    .admissions
                    .lock()
                    .expect("rate limiter mutex poisoned");
                let now = Instant::now();
                while let Some(&front) = admissions.front() {
                    if now.duration_since(front) >= self.window {
                        admissions.pop_front();
                    } else {
                        break;
                    }
                }
                if admissions.len() < self.max_requests {
                    admissions.push_back(now);
                    return;
                }
                let oldest = *admissions.front().expect("window is at quota");
                self.window - now.duration_since(oldest)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Number of admissions currently inside the trailing window.
    pub fn current_load(&self) -> usize {
        let mut admissions = self
            .admissions
            .lock()
            .expect("rate limiter mutex poisoned");
        let now = Instant::now();
        while let Some(&front) = admissions.front() {
            if now.duration_since(front) >= self.window {
                admissions.pop_front();
            } else {
                break;
            }
        }
        admissions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_at_most_quota_in_any_trailing_window() {
        let window = Duration::from_secs(60);
        let limiter = RateLimiter::new(3, window);

        let mut admit_times = Vec::new();
        for _ in 0..8 {
            limiter.acquire().await;
            admit_times.push(Instant::now());
        }

        // Any request and the one `quota` places before it must be at
        // least a full window apart.
        for i in 3..admit_times.len() {
            assert!(
                admit_times[i].duration_since(admit_times[i - 3]) >= window,
                "requests {} and {} landed inside one window",
                i - 3,
                i
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_quota_requests_are_not_delayed() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.current_load(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn window_drains_after_the_window_elapses() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.current_load(), 2);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(limiter.current_load(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_all_eventually_admit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(5)));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();
        for i in 2..times.len() {
            assert!(times[i].duration_since(times[i - 2]) >= Duration::from_secs(5));
        }
    }
}
