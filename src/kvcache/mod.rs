//! Cache-aware routing primitives.
//!
//! Turns a tokenized prompt into prefix-chained chunk keys and resolves those
//! keys against a shared index to find replicas that already hold the
//! matching KV cache.

pub mod config;
pub mod error;
pub mod index;
pub mod key;
pub mod store;
pub mod token_database;

#[cfg(test)]
mod tests;

pub use config::{open_store, IndexBackend, LocalityConfig};
pub use error::{LocalityError, Result};
pub use index::{CacheLocalityIndex, LocalityMap, LookupOptions, LookupStats};
pub use key::CacheEngineKey;
pub use store::{KeyValueStore, MemoryStore};
pub use token_database::{
    ChunkedTokenDatabase, EngineMetadata, ProcessedChunk, TokenDatabase, TokenDatabaseConfig,
};
