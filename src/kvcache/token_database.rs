//! Chunked, hash-chained token database.
//!
//! A token sequence is split into fixed-size chunks and every chunk gets a
//! SHA-256 hash over the previous chunk's hex hash followed by its own tokens
//! (each widened to a 64-bit little-endian integer). Chunk `i`'s key therefore
//! depends on every token in `[0, end_i)`, so two prompts sharing a prefix up
//! to a chunk boundary produce identical keys for that prefix.

use crate::kvcache::error::{LocalityError, Result};
use crate::kvcache::key::CacheEngineKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

/// Tokens per chunk used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Static per-instance metadata folded into every key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetadata {
    #[serde(default = "default_format")]
    pub format: String,
    pub model_name: String,
    #[serde(default = "default_world_size")]
    pub world_size: usize,
    #[serde(default)]
    pub worker_id: usize,
}

fn default_format() -> String {
    "vllm".to_string()
}

fn default_world_size() -> usize {
    1
}

impl EngineMetadata {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            format: default_format(),
            model_name: model_name.into(),
            world_size: default_world_size(),
            worker_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDatabaseConfig {
    pub chunk_size: usize,
}

impl Default for TokenDatabaseConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// One chunk of the input: `[start, end)` token offsets and its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedChunk {
    pub start: usize,
    pub end: usize,
    pub key: CacheEngineKey,
}

impl ProcessedChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Converts token sequences into ordered cache keys.
pub trait TokenDatabase: Send + Sync {
    /// Chunk, hash and key `tokens`. Empty input yields an empty result.
    fn process_tokens(&self, tokens: &[u32]) -> Vec<ProcessedChunk>;
}

/// Fixed-size chunking with a SHA-256 prefix-hash chain.
#[derive(Debug, Clone)]
pub struct ChunkedTokenDatabase {
    chunk_size: usize,
    metadata: EngineMetadata,
}

impl ChunkedTokenDatabase {
    /// Create a token database.
    ///
    /// # Errors
    /// Returns [`LocalityError::Config`] if `chunk_size` is zero.
    pub fn new(config: TokenDatabaseConfig, metadata: EngineMetadata) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(LocalityError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        info!(
            "Token database ready: chunk_size={}, key prefix {}@{}@{}@{}",
            config.chunk_size,
            metadata.format,
            metadata.model_name,
            metadata.world_size,
            metadata.worker_id
        );
        Ok(Self {
            chunk_size: config.chunk_size,
            metadata,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn metadata(&self) -> &EngineMetadata {
        &self.metadata
    }

    /// Keys only, in chunk order; this is what gets handed to the index.
    pub fn keys(&self, tokens: &[u32]) -> Vec<CacheEngineKey> {
        self.process_tokens(tokens)
            .into_iter()
            .map(|chunk| chunk.key)
            .collect()
    }

    /// The chain starts from an empty prefix.
    fn init_hash() -> String {
        String::new()
    }

    fn hash_chunk(prefix_hash: &str, tokens: &[u32]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prefix_hash.as_bytes());
        for &token in tokens {
            hasher.update(u64::from(token).to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn make_key(&self, chunk_hash: String) -> CacheEngineKey {
        CacheEngineKey {
            format: self.metadata.format.clone(),
            model_name: self.metadata.model_name.clone(),
            world_size: self.metadata.world_size,
            worker_id: self.metadata.worker_id,
            chunk_hash,
        }
    }
}

impl TokenDatabase for ChunkedTokenDatabase {
    fn process_tokens(&self, tokens: &[u32]) -> Vec<ProcessedChunk> {
        let mut chunks = Vec::with_capacity(tokens.len().div_ceil(self.chunk_size));
        let mut prefix_hash = Self::init_hash();

        // Sequential: each hash feeds the next.
        for (i, chunk_tokens) in tokens.chunks(self.chunk_size).enumerate() {
            prefix_hash = Self::hash_chunk(&prefix_hash, chunk_tokens);
            let start = i * self.chunk_size;
            chunks.push(ProcessedChunk {
                start,
                end: start + chunk_tokens.len(),
                key: self.make_key(prefix_hash.clone()),
            });
        }

        chunks
    }
}
