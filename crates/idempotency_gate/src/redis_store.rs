use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;

use crate::IdempotencyStore;

/// One slow round trip must not stall the whole poll cycle.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared claim store on Redis. `SET key 1 NX EX ttl` is the only
/// cross-process coordination point the watcher has.
///
/// `rediss://` URLs use TLS; add `#insecure` to the URL to accept the
/// self-signed certificates some hosted add-ons present.
pub struct RedisStore {
    conn: ConnectionManager,
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid REDIS_URL")?;
        let conn = tokio::time::timeout(OP_TIMEOUT * 5, ConnectionManager::new(client))
            .await
            .context("redis connect timed out")?
            .context("redis connect failed")?;
        Ok(Self { conn })
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(OP_TIMEOUT, fut)
            .await
            .with_context(|| format!("redis {op} timed out"))?
            .with_context(|| format!("redis {op} failed"))
    }
}

#[async_trait]
impl IdempotencyStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = self
            .run("SET NX", async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg("1")
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs(ttl))
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.run("GET", async move { redis::cmd("GET").arg(key).query_async(&mut conn).await })
            .await
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        self.run("SET EX", async move {
            redis::cmd("SET")
                .arg(key)
                .arg("1")
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async(&mut conn)
                .await
        })
        .await
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        self.run("DEL", async move { redis::cmd("DEL").arg(key).query_async(&mut conn).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(36 * 3600)), 129_600);
    }

    #[tokio::test]
    async fn malformed_url_is_an_error() {
        assert!(RedisStore::connect("not a url").await.is_err());
    }
}
