//! Composite cache identity for one chunk of one model shard.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cached token chunk for a specific model/shard layout.
///
/// Two keys are equal only when every field matches; the same `chunk_hash`
/// under a different model or sharding is a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheEngineKey {
    /// Cache backend / serialization tag (e.g. `vllm`)
    pub format: String,
    pub model_name: String,
    /// Number of shards the model is split across
    pub world_size: usize,
    /// Shard index
    pub worker_id: usize,
    /// Lowercase hex SHA-256 of the chained chunk content
    pub chunk_hash: String,
}

impl CacheEngineKey {
    /// Canonical string used as the lookup key in the backing store.
    pub fn to_store_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheEngineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}@{}@{}@{}",
            self.format, self.model_name, self.world_size, self.worker_id, self.chunk_hash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_layout() {
        let key = CacheEngineKey {
            format: "vllm".to_string(),
            model_name: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            world_size: 1,
            worker_id: 0,
            chunk_hash: "968e5b25ee324e1207bb88f4b4ad208731cbff985ac3ec6ce452b70aa54df4b4"
                .to_string(),
        };
        assert_eq!(
            key.to_store_key(),
            "vllm@mistralai/Mistral-7B-Instruct-v0.2@1@0@968e5b25ee324e1207bb88f4b4ad208731cbff985ac3ec6ce452b70aa54df4b4"
        );
    }

    #[test]
    fn test_equality_needs_all_fields() {
        let a = CacheEngineKey {
            format: "vllm".to_string(),
            model_name: "m".to_string(),
            world_size: 2,
            worker_id: 0,
            chunk_hash: "abc".to_string(),
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.worker_id = 1;
        assert_ne!(a, b);
    }
}
