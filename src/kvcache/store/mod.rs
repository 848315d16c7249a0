//! Backing stores for the locality index.
//!
//! The index only ever needs one primitive from a store: fetch many keys in a
//! single round trip and get back one optional value per key, in order.

use crate::kvcache::error::Result;
use async_trait::async_trait;

pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

/// Batch-get capability over a keyed store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch `keys` in one request.
    ///
    /// # Returns
    /// One entry per key, in the same order; `None` for keys the store does
    /// not hold.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;
}
