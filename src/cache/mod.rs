//! Ephemeral key/value store with per-key expiry.
//!
//! Holds verification codes and pending registrations. Every operation is
//! independent per key; there are no cross-key transactions.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

mod memory;
mod redis_store;

pub use self::memory::MemoryCodeStore;
pub use self::redis_store::RedisCodeStore;

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value and restarting its ttl.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Fetch a live value; `None` once the ttl elapsed or if the key was never set.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Reachability check for `/health`.
    async fn ping(&self) -> Result<()>;

    /// Short backend name reported by `/health`.
    fn backend(&self) -> &'static str;
}
