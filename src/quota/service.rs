//! Usage Service
//!
//! Check-then-increment orchestration for metered tool requests. Every
//! infrastructure failure denies the request; nothing here ever fails open.

use chrono::Utc;
use tracing::warn;

use crate::error::ApiError;
use crate::metrics;
use crate::owner::Owner;

use super::counter::CounterStore;
use super::entitlement::{self, Entitlement};
use super::key::{usage_key, Resource};

/// Snapshot of one owner's usage for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStatus {
    /// Requests counted in the current window
    pub used: u64,

    /// The owner's daily burst cap
    pub limit: u64,

    /// Unix seconds when the window ends; `None` when no window is open
    pub reset_at: Option<i64>,

    /// The entitlement the limit was resolved from
    pub entitlement: Entitlement,
}

/// Orchestrates owner, entitlement, and counter decisions per request.
#[derive(Clone)]
pub struct UsageService {
    counters: CounterStore,
    window_secs: i64,
}

impl UsageService {
    pub fn new(counters: CounterStore, window_secs: i64) -> Self {
        Self {
            counters,
            window_secs,
        }
    }

    /// Non-mutating usage snapshot for status endpoints.
    ///
    /// A store failure denies the request rather than reporting zero usage.
    pub async fn status(&self, owner: &Owner, resource: Resource) -> Result<UsageStatus, ApiError> {
        let entitlement = entitlement::resolve(owner.kind, owner.plan);
        let key = usage_key(resource, owner.kind, &owner.id);
        let now = Utc::now().timestamp();

        let record = self.counters.get(&key).await.map_err(|e| {
            metrics::record_store_failure();
            warn!(key = %key, error = %e, "usage counter read failed; denying");
            ApiError::Server
        })?;

        // An expired window reads as zero before the next increment
        // rewrites the record. Denied attempts keep incrementing the stored
        // count, so reported usage is clamped to the cap.
        let (used, reset_at) = match record {
            Some(r) if now < r.reset_at => {
                (r.count.min(entitlement.daily_burst_cap), Some(r.reset_at))
            }
            _ => (0, None),
        };

        Ok(UsageStatus {
            used,
            limit: entitlement.daily_burst_cap,
            reset_at,
            entitlement,
        })
    }

    /// Count one request and decide allow/deny.
    ///
    /// The increment lands before any downstream work, so a failed upstream
    /// call still consumes quota; there is no compensating decrement.
    pub async fn consume(&self, owner: &Owner, resource: Resource) -> Result<UsageStatus, ApiError> {
        let entitlement = entitlement::resolve(owner.kind, owner.plan);
        let key = usage_key(resource, owner.kind, &owner.id);
        let now = Utc::now().timestamp();

        metrics::record_usage_check(resource);

        let record = self
            .counters
            .increment(&key, self.window_secs, now)
            .await
            .map_err(|e| {
                metrics::record_store_failure();
                warn!(key = %key, error = %e, "usage counter increment failed; denying");
                ApiError::Server
            })?;

        if record.count > entitlement.daily_burst_cap {
            metrics::record_quota_denied(resource);
            return Err(ApiError::QuotaExceeded);
        }

        Ok(UsageStatus {
            used: record.count,
            limit: entitlement.daily_burst_cap,
            reset_at: Some(record.reset_at),
            entitlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::counter::{KvStore, MemoryKv};
    use crate::quota::key::DAILY_WINDOW_SECS;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Store whose every operation fails, for fail-closed tests.
    struct UnavailableKv;

    #[async_trait]
    impl KvStore for UnavailableKv {
        async fn get_raw(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("kv namespace unavailable"))
        }

        async fn put_raw(&self, _key: &str, _value: String) -> Result<()> {
            Err(anyhow!("kv namespace unavailable"))
        }
    }

    fn service() -> UsageService {
        UsageService::new(
            CounterStore::new(Arc::new(MemoryKv::new())),
            DAILY_WINDOW_SECS,
        )
    }

    #[tokio::test]
    async fn test_fresh_guest_status() {
        let service = service();
        let owner = Owner::guest("g-1");

        let status = service.status(&owner, Resource::AiImage).await.unwrap();
        assert_eq!(status.used, 0);
        assert_eq!(status.limit, 3);
        assert_eq!(status.reset_at, None);
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let service = service();
        let owner = Owner::guest("g-1");

        service.consume(&owner, Resource::AiImage).await.unwrap();

        let first = service.status(&owner, Resource::AiImage).await.unwrap();
        let second = service.status(&owner, Resource::AiImage).await.unwrap();
        assert_eq!(first.used, second.used);
        assert_eq!(first.reset_at, second.reset_at);
    }

    #[tokio::test]
    async fn test_guest_denied_past_cap() {
        let service = service();
        let owner = Owner::guest("g-1");

        for _ in 0..3 {
            let status = service.consume(&owner, Resource::AiImage).await.unwrap();
            assert!(status.used <= status.limit);
        }

        let denied = service.consume(&owner, Resource::AiImage).await.unwrap_err();
        assert_eq!(denied, ApiError::QuotaExceeded);
    }

    #[tokio::test]
    async fn test_pro_cap_is_thirty() {
        use crate::quota::entitlement::Plan;

        let service = service();
        let owner = Owner::user("u-pro", Some(Plan::Pro));

        for _ in 0..30 {
            service.consume(&owner, Resource::AiImage).await.unwrap();
        }
        let denied = service.consume(&owner, Resource::AiImage).await.unwrap_err();
        assert_eq!(denied, ApiError::QuotaExceeded);
    }

    #[tokio::test]
    async fn test_tools_do_not_share_counters() {
        let service = service();
        let owner = Owner::guest("g-1");

        for _ in 0..3 {
            service.consume(&owner, Resource::AiImage).await.unwrap();
        }

        // Exhausting the image tool leaves voice untouched.
        let status = service.consume(&owner, Resource::Voice).await.unwrap();
        assert_eq!(status.used, 1);
    }

    #[tokio::test]
    async fn test_owners_do_not_share_counters() {
        let service = service();

        for _ in 0..3 {
            service
                .consume(&Owner::guest("g-1"), Resource::AiImage)
                .await
                .unwrap();
        }

        let other = service
            .consume(&Owner::guest("g-2"), Resource::AiImage)
            .await
            .unwrap();
        assert_eq!(other.used, 1);
    }

    #[tokio::test]
    async fn test_store_failure_denies_consume() {
        let service = UsageService::new(
            CounterStore::new(Arc::new(UnavailableKv)),
            DAILY_WINDOW_SECS,
        );
        let owner = Owner::guest("g-1");

        let denied = service.consume(&owner, Resource::AiImage).await.unwrap_err();
        assert_eq!(denied, ApiError::Server);
    }

    #[tokio::test]
    async fn test_store_failure_denies_status() {
        let service = UsageService::new(
            CounterStore::new(Arc::new(UnavailableKv)),
            DAILY_WINDOW_SECS,
        );
        let owner = Owner::guest("g-1");

        let denied = service.status(&owner, Resource::AiImage).await.unwrap_err();
        assert_eq!(denied, ApiError::Server);
    }

    #[tokio::test]
    async fn test_denial_kind_is_forbidden_not_server_error() {
        let service = service();
        let owner = Owner::guest("g-1");

        for _ in 0..3 {
            service.consume(&owner, Resource::WebEval).await.unwrap();
        }

        let denied = service.consume(&owner, Resource::WebEval).await.unwrap_err();
        assert_eq!(denied.kind(), "forbidden");
        assert_eq!(denied.code(), Some("quota_exceeded"));
    }

    #[tokio::test]
    async fn test_reported_usage_never_exceeds_limit() {
        let service = service();
        let owner = Owner::guest("g-1");

        // Keep hammering well past the cap; denied attempts still land in
        // the counter but reported usage stays at the limit.
        let mut allowed = 0;
        for _ in 0..10 {
            if service.consume(&owner, Resource::Prompt).await.is_ok() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 3);

        let status = service.status(&owner, Resource::Prompt).await.unwrap();
        assert_eq!(status.used, status.limit);
    }
}
