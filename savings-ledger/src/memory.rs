//! In-memory document store
//!
//! Same contract as the RocksDB store, kept in an ordered map. Used by tests
//! and by embedders that do not need durability.

use crate::store::{stage_batch, DocumentStore, Query, WriteBatch};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Volatile document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// True when no document is stored
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Copy of every document, for assertions on whole-store state
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.docs.read().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.docs.read().get(path).cloned())
    }

    async fn query(&self, query: &Query) -> Result<Vec<(String, Value)>> {
        let prefix = query.prefix();
        let candidates: Vec<(String, Value)> = {
            let docs = self.docs.read();
            docs.range(prefix.clone()..)
                .take_while(|(path, _)| path.starts_with(&prefix))
                .map(|(path, doc)| (path.clone(), doc.clone()))
                .collect()
        };
        Ok(query.apply(candidates))
    }

    async fn create(&self, path: &str, doc: Value) -> Result<()> {
        let mut docs = self.docs.write();
        if docs.contains_key(path) {
            return Err(Error::DocumentExists(path.to_string()));
        }
        docs.insert(path.to_string(), doc);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut docs = self.docs.write();
        let staged = stage_batch(&batch, |path| Ok(docs.get(path).cloned()))?;
        docs.extend(staged);
        Ok(())
    }
}
