//! Distributed-cache port.
//!
//! Failures here degrade gracefully: a cache miss and a cache failure must
//! look identical to callers, since the cache is a latency optimization, not
//! a source of truth.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Port for a distributed cache (Redis or similar), used to cache LLM
/// responses, synthesized TTS audio, and voice metadata.
#[async_trait]
pub trait CachePort: Send + Sync {
    /// Retrieve a value, or `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value with a time-to-live.
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()>;

    /// Invalidate all keys matching a glob pattern (e.g. `"llm_cache:*"`).
    async fn invalidate(&self, pattern: &str) -> Result<()>;

    /// Close the underlying connection.
    async fn close(&self) -> Result<()>;
}
