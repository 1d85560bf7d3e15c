//! Counter Store
//!
//! Rolling-window usage counters persisted as JSON values in a key-value
//! namespace.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A single owner's usage within one rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Requests counted in the current window
    pub count: u64,

    /// Unix seconds at which the window ends
    pub reset_at: i64,
}

/// Key-value namespace holding counter records.
///
/// Implementations provide plain string storage with no cross-request
/// transactional guarantee; record encoding and window semantics live in
/// [`CounterStore`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the raw value for a key, if any.
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Write the raw value for a key.
    async fn put_raw(&self, key: &str, value: String) -> Result<()>;
}

/// In-memory key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put_raw(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Counter storage over a [`KvStore`] namespace.
#[derive(Clone)]
pub struct CounterStore {
    kv: Arc<dyn KvStore>,
}

impl CounterStore {
    /// Create a counter store over the given namespace.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read the current record for a key.
    ///
    /// Absent and structurally invalid values both read as `None`, so a
    /// corrupt or partial write behaves like a missing record.
    pub async fn get(&self, key: &str) -> Result<Option<CounterRecord>> {
        let raw = self.kv.get_raw(key).await?;
        Ok(raw.and_then(|v| serde_json::from_str(&v).ok()))
    }

    /// Count one request against a key.
    ///
    /// Starts a fresh window when the record is absent or expired, otherwise
    /// bumps the count and keeps `reset_at`. This is a read-then-write with
    /// no compare-and-swap: concurrent increments for the same owner can
    /// observe a stale count and under-count by the degree of concurrency.
    /// The limit is advisory, not billing-grade.
    pub async fn increment(
        &self,
        key: &str,
        window_secs: i64,
        now: i64,
    ) -> Result<CounterRecord> {
        let record = match self.get(key).await? {
            Some(r) if now < r.reset_at => CounterRecord {
                count: r.count + 1,
                reset_at: r.reset_at,
            },
            _ => CounterRecord {
                count: 1,
                reset_at: now + window_secs,
            },
        };

        self.kv.put_raw(key, serde_json::to_string(&record)?).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    const WINDOW: i64 = 24 * 60 * 60;

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

    fn store() -> CounterStore {
        CounterStore::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn test_get_absent() {
        let counters = store();
        assert_eq!(counters.get("ai-image:guest:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_first_increment_opens_window() {
        let counters = store();
        let now = 1_700_000_000;

        let record = counters
            .increment("ai-image:guest:a", WINDOW, now)
            .await
            .unwrap();

        assert_eq!(record.count, 1);
        assert_eq!(record.reset_at, now + WINDOW);
        // reset_at is strictly in the future at creation
        assert!(record.reset_at > now);
    }

    #[tokio::test]
    async fn test_increment_within_window_keeps_reset_at() {
        let counters = store();
        let now = 1_700_000_000;

        let first = counters
            .increment("voice:user:u1", WINDOW, now)
            .await
            .unwrap();
        let second = counters
            .increment("voice:user:u1", WINDOW, now + 60)
            .await
            .unwrap();

        assert_eq!(second.count, 2);
        assert_eq!(second.reset_at, first.reset_at);
    }

    #[tokio::test]
    async fn test_expired_window_restarts_at_one() {
        let counters = store();
        let now = 1_700_000_000;

        counters
            .increment("voice:user:u1", WINDOW, now)
            .await
            .unwrap();
        let rolled = counters
            .increment("voice:user:u1", WINDOW, now + WINDOW)
            .await
            .unwrap();

        assert_eq!(rolled.count, 1);
        assert_eq!(rolled.reset_at, now + 2 * WINDOW);
    }

    #[tokio::test]
    async fn test_corrupt_value_reads_as_absent() {
        let kv = Arc::new(MemoryKv::new());
        kv.put_raw("ai-image:guest:a", "{not json".to_string())
            .await
            .unwrap();

        let counters = CounterStore::new(kv);
        assert_eq!(counters.get("ai-image:guest:a").await.unwrap(), None);

        // A corrupt record is overwritten by a fresh window on increment.
        let record = counters
            .increment("ai-image:guest:a", WINDOW, 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_propagates_error() {
        let counters = CounterStore::new(Arc::new(UnavailableKv));

        assert!(counters.get("k").await.is_err());
        assert!(counters.increment("k", WINDOW, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let counters = store();
        let now = 1_700_000_000;

        counters.increment("ai-image:guest:a", WINDOW, now).await.unwrap();
        counters.increment("ai-image:guest:a", WINDOW, now).await.unwrap();
        let other = counters
            .increment("voice:guest:a", WINDOW, now)
            .await
            .unwrap();

        assert_eq!(other.count, 1);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = CounterRecord {
            count: 7,
            reset_at: 1_700_086_400,
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: CounterRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
