use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Enforces a minimum interval between calls made through the same limiter.
///
/// The lock is held while waiting, so concurrent callers queue up in order
/// (tokio's mutex is fair) and every call is eventually let through.
#[derive(Debug)]
pub struct RateLimiter {
    last_permit: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_permit: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Resolves once `min_interval` has passed since the previous permit.
    pub async fn acquire(&self) {
        let mut last_permit = self.last_permit.lock().await;

        if let Some(previous) = *last_permit {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                log::debug!("Delaying request by {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_permit = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_default_interval() {
        assert_eq!(
            RateLimiter::default().min_interval(),
            Duration::from_millis(1000)
        );
    }

    #[tokio::test]
    async fn test_spacing() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        let start = Instant::now();

        limiter.acquire().await;
        let first = start.elapsed();
        limiter.acquire().await;
        let second = start.elapsed();
        limiter.acquire().await;
        let third = start.elapsed();

        assert!(first < Duration::from_millis(100));
        assert!(second >= Duration::from_millis(190));
        assert!(third >= Duration::from_millis(390));
    }

    #[tokio::test]
    async fn test_idle_limiter_does_not_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut permits = vec![];
        for handle in handles {
            permits.push(handle.await.unwrap());
        }
        permits.sort();

        // nothing dropped, each permit at least one interval after the previous
        for pair in permits.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(95));
        }
        assert!(start.elapsed() >= Duration::from_millis(290));
    }
}
