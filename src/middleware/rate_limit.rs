use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Mutex, time::Instant};

use crate::error::AppError;

/// Failed-attempt limiter for credential checks.
///
/// `allow` is asked before an attempt; `record_failure` is called when it fails.
/// Implementations decide where counts live (process memory, Redis, ...).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn allow(&self, key: &str) -> bool;
    async fn record_failure(&self, key: &str);
}

/// Sliding window of failure timestamps per key, local to this process.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    max_attempts: usize,
    window: Duration,
    failures: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MemoryRateLimiter {
    pub fn new(max_attempts: u64, window: Duration) -> Self {
        Self {
            max_attempts: usize::try_from(max_attempts).unwrap_or(usize::MAX),
            window,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys with failures on record.
    pub async fn tracked_keys(&self) -> usize {
        self.failures.lock().await.len()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut failures = self.failures.lock().await;
        let Some(times) = failures.get_mut(key) else {
            return true;
        };
        times.retain(|t| now.duration_since(*t) < self.window);
        if times.is_empty() {
            failures.remove(key);
            return true;
        }
        times.len() < self.max_attempts
    }

    async fn record_failure(&self, key: &str) {
        let now = Instant::now();
        let mut failures = self.failures.lock().await;
        // Keys come from client headers; drop every expired one so the map stays bounded.
        failures.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < self.window);
            !times.is_empty()
        });
        failures.entry(key.to_string()).or_default().push(now);
    }
}

/// Counter per key in Redis, shared by every API instance.
///
/// Uses the INCR + EXPIRE strategy: the TTL is set on the first failure only,
/// so the window is not extended by later attempts.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: redis::aio::MultiplexedConnection,
    max_attempts: u64,
    window_secs: u64,
}

impl RedisRateLimiter {
    pub fn new(conn: redis::aio::MultiplexedConnection, max_attempts: u64, window_secs: u64) -> Self {
        Self {
            conn,
            max_attempts,
            window_secs,
        }
    }

    fn redis_key(key: &str) -> String {
        format!("rate:{key}")
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn allow(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        let count: Result<Option<u64>, _> = redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async(&mut conn)
            .await;
        match count {
            Ok(count) => count.unwrap_or(0) < self.max_attempts,
            Err(e) => {
                // Redis outage must not lock every admin out.
                tracing::warn!("rate-limit lookup failed, allowing attempt: {e}");
                true
            }
        }
    }

    async fn record_failure(&self, key: &str) {
        let mut conn = self.conn.clone();
        let key = Self::redis_key(key);
        let count: u64 = redis::cmd("INCR")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .unwrap_or(0);

        if count == 1 {
            let _: Result<(), _> = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(self.window_secs)
                .query_async(&mut conn)
                .await;
        }
    }
}

/// Rejects with 429 when `key` has used up its attempts.
pub async fn check_rate_limit(limiter: &dyn RateLimiter, key: &str) -> Result<(), AppError> {
    if limiter.allow(key).await {
        Ok(())
    } else {
        tracing::warn!("rate limit hit for {key}");
        Err(AppError::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blocks_after_max_failures_until_window_passes() {
        let limiter = MemoryRateLimiter::new(3, Duration::from_secs(900));
        for _ in 0..3 {
            assert!(limiter.allow("login:1.2.3.4").await);
            limiter.record_failure("login:1.2.3.4").await;
        }
        assert!(!limiter.allow("login:1.2.3.4").await);
        assert!(check_rate_limit(&limiter, "login:1.2.3.4").await.is_err());

        tokio::time::advance(Duration::from_secs(901)).await;
        assert!(limiter.allow("login:1.2.3.4").await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = MemoryRateLimiter::new(1, Duration::from_secs(60));
        limiter.record_failure("login:a").await;
        assert!(!limiter.allow("login:a").await);
        assert!(limiter.allow("login:b").await);
        assert!(limiter.allow("verify:a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_are_dropped_on_later_failures() {
        let limiter = MemoryRateLimiter::new(5, Duration::from_secs(900));
        for i in 0..100 {
            limiter.record_failure(&format!("login:10.0.0.{i}")).await;
        }
        assert_eq!(limiter.tracked_keys().await, 100);

        tokio::time::advance(Duration::from_secs(901)).await;
        limiter.record_failure("login:192.0.2.1").await;

        assert_eq!(limiter.tracked_keys().await, 1);
        assert!(limiter.allow("login:10.0.0.1").await);
    }
}
