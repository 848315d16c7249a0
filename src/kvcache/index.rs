//! Cache-locality index: which replicas hold which chunks.

use crate::kvcache::error::{LocalityError, Result};
use crate::kvcache::key::CacheEngineKey;
use crate::kvcache::store::KeyValueStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Hosts known to hold each key. Keys with no usable entry are absent.
pub type LocalityMap = HashMap<CacheEngineKey, Vec<String>>;

/// Lookup policy.
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    /// Upper bound for one lookup, retries included. `None` = caller's deadline only.
    pub timeout: Option<Duration>,
    /// Extra attempts after a failed batch. 0 = fail fast.
    pub max_retries: u32,
}

/// Counters for monitoring. Malformed values show up here rather than in logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub lookups: u64,
    pub failed_lookups: u64,
    pub keys_requested: u64,
    /// Positions that resolved to a host
    pub hits: u64,
    /// Positions with no value, or an empty one
    pub misses: u64,
    /// Positions whose value was not `host:port`
    pub malformed: u64,
}

impl LookupStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.keys_requested == 0 {
            0.0
        } else {
            (self.hits as f64 / self.keys_requested as f64) * 100.0
        }
    }
}

/// Stateless façade over a [`KeyValueStore`] resolving keys to replica hosts.
pub struct CacheLocalityIndex {
    store: Arc<dyn KeyValueStore>,
    options: LookupOptions,
    stats: Arc<RwLock<LookupStats>>,
}

impl CacheLocalityIndex {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_options(store, LookupOptions::default())
    }

    pub fn with_options(store: Arc<dyn KeyValueStore>, options: LookupOptions) -> Self {
        Self {
            store,
            options,
            stats: Arc::new(RwLock::new(LookupStats::default())),
        }
    }

    pub fn options(&self) -> &LookupOptions {
        &self.options
    }

    /// Resolve `keys` to the hosts holding them, in one store round trip.
    ///
    /// Absent, empty and malformed values are skipped. If the batch request
    /// fails the whole lookup fails; no partial map is returned.
    pub async fn lookup(&self, keys: &[CacheEngineKey]) -> Result<LocalityMap> {
        self.lookup_filtered(keys, &HashSet::new()).await
    }

    /// Like [`lookup`](Self::lookup), keeping only hosts in `pod_filter`.
    ///
    /// An empty filter keeps every host.
    pub async fn lookup_filtered(
        &self,
        keys: &[CacheEngineKey],
        pod_filter: &HashSet<String>,
    ) -> Result<LocalityMap> {
        if keys.is_empty() {
            return Ok(LocalityMap::new());
        }

        let store_keys: Vec<String> = keys.iter().map(CacheEngineKey::to_store_key).collect();

        let fetched = match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch(&store_keys))
                .await
                .unwrap_or(Err(LocalityError::Timeout(limit))),
            None => self.fetch(&store_keys).await,
        };

        let values = match fetched {
            Ok(values) => values,
            Err(e) => {
                self.stats.write().failed_lookups += 1;
                return Err(e);
            }
        };

        let mut pods = LocalityMap::new();
        let (mut hits, mut misses, mut malformed) = (0u64, 0u64, 0u64);

        for (key, value) in keys.iter().zip(values) {
            let raw = match value {
                Some(raw) if !raw.is_empty() => raw,
                _ => {
                    misses += 1;
                    continue;
                }
            };

            let host = match parse_host(&raw) {
                Some(host) => host,
                None => {
                    malformed += 1;
                    continue;
                }
            };

            if !pod_filter.is_empty() && !pod_filter.contains(host) {
                misses += 1;
                continue;
            }

            hits += 1;
            pods.entry(key.clone()).or_default().push(host.to_string());
        }

        debug!(
            "Locality lookup: {} keys, {} hits, {} misses, {} malformed",
            keys.len(),
            hits,
            misses,
            malformed
        );

        let mut stats = self.stats.write();
        stats.lookups += 1;
        stats.keys_requested += keys.len() as u64;
        stats.hits += hits;
        stats.misses += misses;
        stats.malformed += malformed;

        Ok(pods)
    }

    pub fn stats(&self) -> LookupStats {
        self.stats.read().clone()
    }

    /// One batch request, re-issued whole up to `max_retries` times.
    async fn fetch(&self, store_keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut attempt = 0u32;
        loop {
            let result = self.store.get_many(store_keys).await.and_then(|values| {
                if values.len() == store_keys.len() {
                    Ok(values)
                } else {
                    Err(LocalityError::Store(format!(
                        "store returned {} values for {} keys",
                        values.len(),
                        store_keys.len()
                    )))
                }
            });

            match result {
                Ok(values) => return Ok(values),
                Err(e) if attempt < self.options.max_retries => {
                    attempt += 1;
                    warn!(
                        "Locality batch lookup failed (attempt {}/{}): {}",
                        attempt,
                        self.options.max_retries + 1,
                        e
                    );
                }
                Err(e) => {
                    warn!("Locality batch lookup failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

/// `host:port` -> `host`; anything else is malformed.
fn parse_host(raw: &[u8]) -> Option<&str> {
    let value = std::str::from_utf8(raw).ok()?;
    let mut parts = value.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(host), Some(port), None) if !host.is_empty() && !port.is_empty() => Some(host),
        _ => None,
    }
}
