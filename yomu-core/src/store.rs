//! Storage collaborator interface consumed by the analysis pipeline.

use crate::types::VocabEntry;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Read side of dictionary storage.
///
/// The pipeline issues exactly one bulk fetch per request for the union of
/// all entry ids in the document. No ordering contract: callers impose their
/// own ordering over the returned entries. Ids with no backing record are
/// simply absent from the result, never an error.
#[async_trait]
pub trait SenseStore: Send + Sync {
    async fn fetch_entries(&self, ids: &[String]) -> Result<Vec<VocabEntry>>;
}

/// In-memory `SenseStore` for tests and POC wiring.
#[derive(Default)]
pub struct MemorySenseStore {
    entries: RwLock<HashMap<String, VocabEntry>>,
}

impl MemorySenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: VocabEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entry.id.clone(), entry);
        }
    }
}

#[async_trait]
impl SenseStore for MemorySenseStore {
    async fn fetch_entries(&self, ids: &[String]) -> Result<Vec<VocabEntry>> {
        let entries = self.entries.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(ids
            .iter()
            .filter_map(|id| entries.get(id).cloned())
            .collect())
    }
}
