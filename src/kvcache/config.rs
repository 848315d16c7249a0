//! Configuration for the token database and locality index.

use crate::kvcache::error::{LocalityError, Result};
use crate::kvcache::index::{CacheLocalityIndex, LookupOptions};
use crate::kvcache::store::{KeyValueStore, MemoryStore};
use crate::kvcache::token_database::{
    ChunkedTokenDatabase, EngineMetadata, TokenDatabaseConfig, DEFAULT_CHUNK_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Redis address used when the redis backend is selected without a URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Full configuration for one routing-side locality instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalityConfig {
    /// Tokens per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Static metadata folded into every key
    pub metadata: EngineMetadata,

    /// Index store backend type
    #[serde(default = "default_backend")]
    pub backend: IndexBackend,

    /// Redis URL (for Redis backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    /// Per-lookup timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_timeout_ms: Option<u64>,

    /// Extra attempts for a failed batch lookup
    #[serde(default)]
    pub max_retries: u32,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_backend() -> IndexBackend {
    IndexBackend::Memory
}

impl LocalityConfig {
    pub fn new(metadata: EngineMetadata) -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            metadata,
            backend: IndexBackend::Memory,
            redis_url: None,
            lookup_timeout_ms: None,
            max_retries: 0,
        }
    }

    /// Load from a YAML (`.yaml`/`.yml`) or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| LocalityError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| LocalityError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.chunk_size == 0 {
            errors.push("chunk_size must be greater than zero".to_string());
        }
        if self.metadata.model_name.trim().is_empty() {
            errors.push("metadata.model_name must not be empty".to_string());
        }
        if self.metadata.format.trim().is_empty() {
            errors.push("metadata.format must not be empty".to_string());
        }
        if self.metadata.world_size == 0 {
            errors.push("metadata.world_size must be greater than zero".to_string());
        } else if self.metadata.worker_id >= self.metadata.world_size {
            errors.push(format!(
                "metadata.worker_id {} out of range for world_size {}",
                self.metadata.worker_id, self.metadata.world_size
            ));
        }
        if self.lookup_timeout_ms == Some(0) {
            errors.push("lookup_timeout_ms must be greater than zero".to_string());
        }
        if self.backend != IndexBackend::Redis && self.redis_url.is_some() {
            errors.push("redis_url is set but backend is not redis".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LocalityError::Config(errors.join("; ")))
        }
    }

    pub fn token_database_config(&self) -> TokenDatabaseConfig {
        TokenDatabaseConfig {
            chunk_size: self.chunk_size,
        }
    }

    pub fn lookup_options(&self) -> LookupOptions {
        LookupOptions {
            timeout: self.lookup_timeout_ms.map(Duration::from_millis),
            max_retries: self.max_retries,
        }
    }

    pub fn build_token_database(&self) -> Result<ChunkedTokenDatabase> {
        ChunkedTokenDatabase::new(self.token_database_config(), self.metadata.clone())
    }

    /// Open the configured store and wrap it in an index.
    pub async fn build_index(&self) -> Result<CacheLocalityIndex> {
        let store = open_store(self).await?;
        Ok(CacheLocalityIndex::with_options(store, self.lookup_options()))
    }
}

/// Index store backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexBackend {
    /// In-process HashMap (not shared across processes)
    #[serde(rename = "memory")]
    Memory,
    /// Redis, shared by the whole fleet
    #[serde(rename = "redis")]
    Redis,
}

impl std::str::FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(IndexBackend::Memory),
            "redis" => Ok(IndexBackend::Redis),
            _ => Err(format!("Unknown index backend: {}", s)),
        }
    }
}

/// Build the store named by `config.backend`.
///
/// # Errors
/// Fails if the redis backend is requested without the `redis` feature, or
/// if Redis cannot be reached.
pub async fn open_store(config: &LocalityConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        IndexBackend::Memory => {
            info!("Using in-memory locality store");
            Ok(Arc::new(MemoryStore::new()))
        }
        IndexBackend::Redis => {
            #[cfg(feature = "redis")]
            {
                let url = config.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL);
                info!("Using Redis locality store at: {}", url);
                let store = crate::kvcache::store::RedisStore::connect(url).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            {
                Err(LocalityError::Config(
                    "redis backend requested but the `redis` feature is not enabled".to_string(),
                ))
            }
        }
    }
}
