//! Store doubles for exercising failure paths.

use crate::kvcache::error::{LocalityError, Result};
use crate::kvcache::store::{KeyValueStore, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fails the first `failures` calls, then answers from `inner`.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures: usize,
    pub calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(MemoryStore::new(), usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FlakyStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(LocalityError::Store("connection refused".to_string()));
        }
        self.inner.get_many(keys).await
    }
}

/// Sleeps before answering.
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl KeyValueStore for SlowStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_many(keys).await
    }
}

/// Answers with one value fewer than requested.
pub struct ShortStore;

#[async_trait::async_trait]
impl KeyValueStore for ShortStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        Ok(vec![Some(b"10.0.0.1:8000".to_vec()); keys.len().saturating_sub(1)])
    }
}

/// Counts calls; never expected to be reached.
#[derive(Default)]
pub struct CountingStore {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl KeyValueStore for CountingStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![None; keys.len()])
    }
}
