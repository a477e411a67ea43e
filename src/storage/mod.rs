use crate::error::StorageError;
use crate::types::DedupKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub mod dynamo;
pub use dynamo::DynamoDedupStore;

// ============================================================================
// DedupStore trait
// ============================================================================

#[allow(async_fn_in_trait)]
pub trait DedupStore: Send + Sync {
    /// Point lookup against the backing store.
    async fn lookup(&self, key: &DedupKey) -> Result<bool, StorageError>;

    /// Point write. Writing a key that already exists overwrites it.
    async fn record(&self, key: &DedupKey, url: &str) -> Result<(), StorageError>;

    /// Whether `key` was already published.
    ///
    /// Any lookup failure reads as "not published yet": a duplicate post can
    /// be deleted by hand, a post that never went out cannot be noticed.
    async fn exists(&self, key: &DedupKey) -> bool {
        match self.lookup(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, key = %key, "Dedup lookup failed, treating as not published");
                false
            }
        }
    }
}

// ============================================================================
// InMemoryDedupStore — process-local store for dry runs and tests
// ============================================================================

#[derive(Default)]
pub struct InMemoryDedupStore {
    records: Mutex<HashMap<DedupKey, String>>,
    writes: AtomicUsize,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, key: DedupKey) -> Self {
        let url = key.url.clone();
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, url);
        self
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `record` calls, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DedupStore for InMemoryDedupStore {
    async fn lookup(&self, key: &DedupKey) -> Result<bool, StorageError> {
        Ok(self.contains(key))
    }

    async fn record(&self, key: &DedupKey, url: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.clone(), url.to_string());
        debug!(key = %key, "Recorded in memory");
        Ok(())
    }
}

// ============================================================================
// AnyDedupStore — backend chosen at startup
// ============================================================================

pub enum AnyDedupStore {
    Dynamo(DynamoDedupStore),
    InMemory(InMemoryDedupStore),
}

impl DedupStore for AnyDedupStore {
    async fn lookup(&self, key: &DedupKey) -> Result<bool, StorageError> {
        match self {
            Self::Dynamo(store) => store.lookup(key).await,
            Self::InMemory(store) => store.lookup(key).await,
        }
    }

    async fn record(&self, key: &DedupKey, url: &str) -> Result<(), StorageError> {
        match self {
            Self::Dynamo(store) => store.record(key, url).await,
            Self::InMemory(store) => store.record(key, url).await,
        }
    }
}

// ============================================================================
// Test utilities
// ============================================================================
