#![warn(clippy::cast_lossless)]
pub mod kvcache;

pub use kvcache::{
    CacheEngineKey, CacheLocalityIndex, ChunkedTokenDatabase, EngineMetadata, KeyValueStore,
    LocalityConfig, LocalityError, LocalityMap, MemoryStore, ProcessedChunk, TokenDatabase,
    TokenDatabaseConfig,
};
