use crate::error::ConfigError;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rolling-window limiter for outbound API calls.
///
/// At most `limit` calls are admitted within any window of length `window`.
/// Callers over the limit are delayed, never rejected. The history lock is
/// held across the wait so concurrent callers queue up in order and the
/// accounting cannot race.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    history: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` calls per `window`
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }

        Ok(Self {
            limit: limit as usize,
            window,
            history: Mutex::new(VecDeque::with_capacity(limit as usize)),
        })
    }

    /// Maximum calls per window
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Length of the rolling window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of calls recorded inside the current window
    pub async fn recorded(&self) -> usize {
        let mut history = self.history.lock().await;
        prune(&mut history, Instant::now(), self.window);
        history.len()
    }

    /// Wait until a call is allowed, then record it.
    ///
    /// Returns the instant the call was recorded at.
    pub async fn acquire(&self) -> Instant {
        let mut history = self.history.lock().await;

        loop {
            let now = Instant::now();
            prune(&mut history, now, self.window);

            if history.len() < self.limit {
                history.push_back(now);
                return now;
            }

            // Full window: the oldest entry is younger than `window`, so this
            // wait is bounded by `window`.
            let Some(&oldest) = history.front() else {
                continue;
            };
            let wait = (oldest + self.window).saturating_duration_since(now);
            ::log::info!(
                "Rate limit reached ({} calls per {}s), waiting {:.1}s",
                self.limit,
                self.window.as_secs(),
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }
}

/// Drops timestamps that have left the window ending at `now`
fn prune(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = history.front() {
        if now.saturating_duration_since(oldest) >= window {
            history.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Every half-open window [t, t + w) holds at most `limit` timestamps
    fn assert_window_bound(stamps: &[Instant], limit: usize, window: Duration) {
        for (i, start) in stamps.iter().enumerate() {
            let inside = stamps[i..]
                .iter()
                .filter(|t| t.saturating_duration_since(*start) < window)
                .count();
            assert!(
                inside <= limit,
                "window starting at call {} holds {} calls (limit {})",
                i,
                inside,
                limit
            );
        }
    }

    #[test]
    fn test_rejects_zero_limit_and_window() {
        assert!(matches!(
            RateLimiter::new(0, Duration::from_secs(10)),
            Err(ConfigError::ZeroRateLimit)
        ));
        assert!(matches!(
            RateLimiter::new(3, Duration::ZERO),
            Err(ConfigError::ZeroWindow)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_under_limit_do_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60)).unwrap();
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.recorded().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_call_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10)).unwrap();

        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;
        let third = limiter.acquire().await;

        assert!(third.duration_since(first) >= Duration::from_secs(10));
        // Never longer than one window
        assert!(third.duration_since(first) <= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bound_holds_for_long_sequences() {
        let limiter = RateLimiter::new(3, Duration::from_secs(5)).unwrap();
        let mut stamps = Vec::new();

        for i in 0..20 {
            if i % 4 == 0 {
                tokio::time::sleep(Duration::from_millis(1300)).await;
            }
            stamps.push(limiter.acquire().await);
        }

        assert_window_bound(&stamps, 3, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bound_holds_under_concurrency() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(3)).unwrap());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();

        assert_eq!(stamps.len(), 8);
        assert_window_bound(&stamps, 2, Duration::from_secs(3));
        // Four full windows are needed for eight calls at two per window
        let span = stamps[7].duration_since(stamps[0]);
        assert!(span >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_calls_are_pruned() {
        let limiter = RateLimiter::new(1, Duration::from_secs(2)).unwrap();
        limiter.acquire().await;
        assert_eq!(limiter.recorded().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(limiter.recorded().await, 0);

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
