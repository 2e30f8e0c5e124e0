/// MatchdayWatcher — Idempotency Gate
///
/// Decides whether a notification occurrence was already dispatched.
///   - `RedisStore`:  shared `SET NX EX`, safe across independent processes
///   - `MemoryStore`: in-process only; used when Redis is unset or failing
///
/// Running on `MemoryStore` alone is degraded mode: two watcher processes
/// without a shared store can both deliver the same event.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Minimal key-value contract the gate needs from a backend.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Set `key` only if absent; `true` iff this call created it.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional set with expiry.
    async fn set(&self, key: &str, ttl: Duration) -> Result<()>;

    async fn release(&self, key: &str) -> Result<()>;
}

pub struct IdempotencyGate {
    primary:  Option<Arc<dyn IdempotencyStore>>,
    fallback: MemoryStore,
}

impl IdempotencyGate {
    pub fn memory_only() -> Self {
        Self { primary: None, fallback: MemoryStore::new() }
    }

    pub fn with_primary(primary: Arc<dyn IdempotencyStore>) -> Self {
        Self { primary: Some(primary), fallback: MemoryStore::new() }
    }

    /// Startup selection: Redis when a URL is configured and reachable,
    /// otherwise memory only.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url.filter(|u| !u.trim().is_empty()) else {
            warn!("REDIS_URL not set, idempotency is per-process only (degraded mode)");
            return Self::memory_only();
        };
        match RedisStore::connect(url).await {
            Ok(store) => {
                info!("[redis] connect ok");
                Self::with_primary(Arc::new(store))
            }
            Err(e) => {
                warn!("[redis] unavailable, falling back to memory (degraded mode): {:#}", e);
                Self::memory_only()
            }
        }
    }

    pub fn mode(&self) -> &'static str {
        self.primary.as_ref().map(|p| p.name()).unwrap_or(self.fallback.name())
    }

    /// `true` iff this caller is the first to claim `key` within `ttl`.
    /// Store failures never surface; the claim moves to the in-process set.
    pub async fn try_claim(&self, key: &str, ttl: Duration) -> bool {
        if let Some(primary) = &self.primary {
            match primary.set_if_absent(key, ttl).await {
                Ok(claimed) => {
                    if claimed {
                        // remembered locally too, so a later outage cannot re-fire it here
                        let _ = self.fallback.set(key, ttl).await;
                    }
                    return claimed;
                }
                Err(e) => warn!(key, store = primary.name(), "claim failed, using memory: {:#}", e),
            }
        }
        self.fallback.set_if_absent(key, ttl).await.unwrap_or(false)
    }

    /// Was `key` claimed and not yet expired?
    pub async fn is_claimed(&self, key: &str) -> bool {
        if let Some(primary) = &self.primary {
            match primary.get(key).await {
                Ok(v) => return v.is_some(),
                Err(e) => warn!(key, "lookup failed, using memory: {:#}", e),
            }
        }
        matches!(self.fallback.get(key).await, Ok(Some(_)))
    }

    /// Give a claim back, e.g. when every delivery attempt for it failed.
    pub async fn release(&self, key: &str) {
        if let Some(primary) = &self.primary {
            if let Err(e) = primary.release(key).await {
                warn!(key, "release failed: {:#}", e);
            }
        }
        let _ = self.fallback.release(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(36 * 3600);

    struct BrokenStore;

    #[async_trait]
    impl IdempotencyStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn set_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool> {
            anyhow::bail!("connection refused")
        }
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("connection refused")
        }
        async fn set(&self, _key: &str, _ttl: Duration) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        async fn release(&self, _key: &str) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn concurrent_claims_succeed_exactly_once() {
        let gate = Arc::new(IdempotencyGate::memory_only());
        let (a, b) = tokio::join!(
            gate.try_claim("sent:1:start", TTL),
            gate.try_claim("sent:1:start", TTL)
        );
        assert!(a ^ b);
    }

    #[tokio::test]
    async fn many_tasks_one_winner() {
        let gate = Arc::new(IdempotencyGate::memory_only());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.try_claim("sent:9:end", TTL).await }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn shared_primary_coordinates_independent_gates() {
        // two "processes" with their own gate, one shared backend
        let shared: Arc<dyn IdempotencyStore> = Arc::new(MemoryStore::new());
        let worker_a = IdempotencyGate::with_primary(shared.clone());
        let worker_b = IdempotencyGate::with_primary(shared);

        assert!(worker_a.try_claim("sent:7:score-1-0", TTL).await);
        assert!(!worker_b.try_claim("sent:7:score-1-0", TTL).await);
        assert!(worker_b.is_claimed("sent:7:score-1-0").await);
        assert_eq!(worker_a.mode(), "memory");
    }

    #[tokio::test]
    async fn broken_primary_falls_back_transparently() {
        let gate = IdempotencyGate::with_primary(Arc::new(BrokenStore));
        assert_eq!(gate.mode(), "broken");
        assert!(gate.try_claim("sent:3:ht", TTL).await);
        assert!(!gate.try_claim("sent:3:ht", TTL).await);
        assert!(gate.is_claimed("sent:3:ht").await);
    }

    #[tokio::test]
    async fn release_allows_a_second_claim() {
        let gate = IdempotencyGate::memory_only();
        assert!(gate.try_claim("sent:4:pre30", TTL).await);
        gate.release("sent:4:pre30").await;
        assert!(gate.try_claim("sent:4:pre30", TTL).await);
    }

    #[tokio::test(start_paused = true)]
    async fn claim_expires_after_ttl() {
        let gate = IdempotencyGate::memory_only();
        let ttl = Duration::from_secs(60);
        assert!(gate.try_claim("sent:5:lineups", ttl).await);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!gate.try_claim("sent:5:lineups", ttl).await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(gate.try_claim("sent:5:lineups", ttl).await);
    }

    #[tokio::test]
    async fn connect_without_url_is_memory_only() {
        assert_eq!(IdempotencyGate::connect(None).await.mode(), "memory");
        assert_eq!(IdempotencyGate::connect(Some("")).await.mode(), "memory");
    }
}
