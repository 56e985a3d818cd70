//! Redis-backed `CodeStore`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{info_span, Instrument};

use super::CodeStore;

/// Shared store for multi-instance deployments. Expiry is enforced by Redis
/// (`SET .. PX`).
///
/// A single `ConnectionManager` is shared by every clone; it multiplexes
/// commands over one connection and reconnects when it drops.
#[derive(Clone)]
pub struct RedisCodeStore {
    conn: ConnectionManager,
}

impl RedisCodeStore {
    /// Connect to Redis at `url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not a valid Redis connection string or
    /// the server cannot be reached.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("Failed to create Redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let span = info_span!("cache.command", cache.system = "redis", cache.operation = "SET");
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<()>(&mut conn)
            .instrument(span)
            .await
            .context("Redis SET failed")?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let span = info_span!("cache.command", cache.system = "redis", cache.operation = "GET");
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .instrument(span)
            .await
            .context("Redis GET failed")?;
        Ok(value)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let span = info_span!("cache.command", cache.system = "redis", cache.operation = "PING");
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .instrument(span)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_url() {
        assert!(RedisCodeStore::connect("not a url").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis on 127.0.0.1:6379"]
    async fn set_get_round_trip() -> Result<()> {
        let store = RedisCodeStore::connect("redis://127.0.0.1/").await?;
        let other = store.clone();
        store
            .set("quill:test:code", "654321", Duration::from_secs(5))
            .await?;
        assert_eq!(
            store.get("quill:test:code").await?.as_deref(),
            Some("654321")
        );
        assert_eq!(
            other.get("quill:test:code").await?.as_deref(),
            Some("654321")
        );
        assert_eq!(store.get("quill:test:missing").await?, None);
        store.ping().await?;
        Ok(())
    }
}
