//! Fixed-window rate limiting backed by a pluggable key-value store.
//!
//! The quota resets fully at the end of each window rather than sliding.
//! The read-modify-write against the store is deliberately unguarded:
//! concurrent checks for the same identifier may under-count, so the limit
//! is best-effort under contention. On any store failure the limiter fails
//! open and admits the request with full quota.

mod store;

pub use store::{MemoryStore, RateLimitRecord, RateLimitStore, RedisStore, StoreError};

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64, // unix millis
}

/// Admit or reject one request from `identifier` under `policy`, consuming
/// quota on admission. Never returns an error: store failures fail open.
pub async fn check_and_consume<S: RateLimitStore>(
    store: &S,
    identifier: &str,
    policy: &RateLimitPolicy,
    now: DateTime<Utc>,
) -> RateLimitDecision {
    match try_check(store, identifier, policy, now).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(
                "rate limit store failure for '{}', admitting request: {}",
                identifier,
                e
            );
            RateLimitDecision {
                admitted: true,
                limit: policy.max_requests,
                remaining: policy.max_requests,
                reset_at: now.timestamp_millis() + policy.window.as_millis() as i64,
            }
        }
    }
}

async fn try_check<S: RateLimitStore>(
    store: &S,
    identifier: &str,
    policy: &RateLimitPolicy,
    now: DateTime<Utc>,
) -> Result<RateLimitDecision, StoreError> {
    let now_ms = now.timestamp_millis();

    match store.get(identifier).await? {
        // active window
        Some(record) if now_ms <= record.reset_at => {
            if record.count >= policy.max_requests {
                // rejected calls do not consume quota
                return Ok(RateLimitDecision {
                    admitted: false,
                    limit: policy.max_requests,
                    remaining: 0,
                    reset_at: record.reset_at,
                });
            }

            let count = record.count + 1;
            store.update(identifier, count).await?;

            Ok(RateLimitDecision {
                admitted: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - count,
                reset_at: record.reset_at,
            })
        }
        // no record yet, or the stored window has expired
        _ => {
            let reset_at = now_ms + policy.window.as_millis() as i64;
            store
                .set(identifier, &RateLimitRecord { count: 1, reset_at })
                .await?;

            Ok(RateLimitDecision {
                admitted: true,
                limit: policy.max_requests,
                remaining: policy.max_requests - 1,
                reset_at,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl RateLimitStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
            Err(StoreError("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _record: &RateLimitRecord) -> Result<(), StoreError> {
            Err(StoreError("connection refused".to_string()))
        }

        async fn update(&self, _key: &str, _count: u32) -> Result<(), StoreError> {
            Err(StoreError("connection refused".to_string()))
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn policy(max_requests: u32, window_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests,
            window: Duration::from_millis(window_ms),
        }
    }

    #[tokio::test]
    async fn quota_is_consumed_then_enforced() {
        let store = MemoryStore::new();
        let policy = policy(3, 60_000);

        for expected_remaining in [2, 1, 0] {
            let d = check_and_consume(&store, "ip:203.0.113.5", &policy, at(0)).await;
            assert!(d.admitted);
            assert_eq!(d.remaining, expected_remaining);
            assert_eq!(d.reset_at, 60_000);
        }

        let rejected = check_and_consume(&store, "ip:203.0.113.5", &policy, at(500)).await;
        assert!(!rejected.admitted);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at, 60_000);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_counter() {
        let store = MemoryStore::new();
        let policy = policy(2, 60_000);

        check_and_consume(&store, "k", &policy, at(0)).await;
        check_and_consume(&store, "k", &policy, at(100)).await;
        assert!(!check_and_consume(&store, "k", &policy, at(200)).await.admitted);

        let fresh = check_and_consume(&store, "k", &policy, at(60_001)).await;
        assert!(fresh.admitted);
        assert_eq!(fresh.remaining, 1);
        assert_eq!(fresh.reset_at, 120_001);
        assert_eq!(store.record("k").unwrap().count, 1);
    }

    #[tokio::test]
    async fn rejection_does_not_mutate_the_record() {
        let store = MemoryStore::new();
        let policy = policy(1, 60_000);

        check_and_consume(&store, "k", &policy, at(0)).await;
        let before = store.record("k").unwrap();

        for t in [10, 20, 30] {
            let d = check_and_consume(&store, "k", &policy, at(t)).await;
            assert!(!d.admitted);
            assert_eq!(d.remaining, 0);
            assert_eq!(d.reset_at, before.reset_at);
        }

        assert_eq!(store.record("k").unwrap(), before);
    }

    #[tokio::test]
    async fn boundary_instant_is_still_inside_the_window() {
        let store = MemoryStore::new();
        let policy = policy(1, 60_000);

        check_and_consume(&store, "k", &policy, at(0)).await;
        // now == reset_at: window still active, so this is a rejection
        assert!(!check_and_consume(&store, "k", &policy, at(60_000)).await.admitted);
        assert!(check_and_consume(&store, "k", &policy, at(60_001)).await.admitted);
    }

    #[tokio::test]
    async fn store_failure_fails_open() {
        let policy = policy(5, 60_000);

        let d = check_and_consume(&FailingStore, "k", &policy, at(1_000)).await;
        assert!(d.admitted);
        assert_eq!(d.remaining, 5);
        assert_eq!(d.reset_at, 61_000);
    }

    #[tokio::test]
    async fn identifiers_do_not_interact() {
        let store = MemoryStore::new();
        let policy = policy(1, 60_000);

        assert!(check_and_consume(&store, "ip:a", &policy, at(0)).await.admitted);
        assert!(check_and_consume(&store, "ip:b", &policy, at(0)).await.admitted);
        assert!(!check_and_consume(&store, "ip:a", &policy, at(1)).await.admitted);
    }
}
