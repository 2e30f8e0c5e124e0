use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::IdempotencyStore;

/// In-process claim set. Entries disappear once their TTL has passed;
/// expired keys are purged on the next access instead of by a timer per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_entries(&self) -> MutexGuard<'_, HashMap<String, (String, Instant)>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries
    }

    pub fn len(&self) -> usize {
        self.live_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.live_entries();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), ("1".to_string(), Instant::now() + ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_entries().get(key).map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<()> {
        self.live_entries()
            .insert(key.to_string(), ("1".to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.live_entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_purged() {
        let store = MemoryStore::new();
        store.set("a", Duration::from_secs(10)).await.unwrap();
        store.set("b", Duration::from_secs(100)).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn set_overwrites_and_release_removes() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", Duration::from_secs(5)).await.unwrap());
        store.set("k", Duration::from_secs(50)).await.unwrap();
        assert!(!store.set_if_absent("k", Duration::from_secs(5)).await.unwrap());
        store.release("k").await.unwrap();
        assert!(store.is_empty());
    }
}
