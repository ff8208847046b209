//! Token-bucket pacing for outbound requests.
//!
//! Every fetch path acquires a token first, so batch scrapes and the live
//! refresh loop share one cap instead of each inventing its own sleep.

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

pub struct RateLimiter {
    state: Mutex<BucketState>,
    min_delay: Duration,
}

struct BucketState {
    tokens: f64,
    max_tokens: f64,
    /// Tokens per second.
    refill_rate: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, min_delay: Duration) -> Self {
        let max_tokens = f64::from(requests_per_minute.max(1));
        Self {
            state: Mutex::new(BucketState {
                tokens: max_tokens,
                max_tokens,
                refill_rate: max_tokens / 60.0,
                last_refill: Instant::now(),
            }),
            min_delay,
        }
    }

    /// Take one token, sleeping until the bucket allows the request. The
    /// minimum delay applies even when tokens are available.
    pub async fn acquire(&self) {
        let wait = {
            let mut state = self.state.lock().await;

            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            state.tokens = (state.tokens + elapsed * state.refill_rate).min(state.max_tokens);
            state.last_refill = now;

            if state.tokens >= 1.0 {
                state.tokens -= 1.0;
                self.min_delay
            } else {
                let refill_wait = (1.0 - state.tokens) / state.refill_rate;
                state.tokens = 0.0;
                Duration::from_secs_f64(refill_wait) + self.min_delay
            }
        };

        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_drains_then_waits_for_refill() {
        let limiter = RateLimiter::new(2, Duration::ZERO);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));

        // Bucket is empty; 2 req/min refills one token in 30s.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn minimum_delay_applies_even_with_tokens() {
        let limiter = RateLimiter::new(600, Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
