//! Document store on RocksDB
//!
//! # Column Families
//!
//! - `documents` - Every ledger document (key: slash path, value: JSON)
//!
//! Keys sort by path, so a collection is a contiguous key range and queries
//! are prefix scans. Conditional writes (create-if-absent, batch commits
//! containing creates, updates and increments) are serialised by one commit
//! lock and flushed with a single RocksDB `WriteBatch`, which gives the
//! all-or-nothing guarantee.

use crate::{
    error::{Error, Result},
    store::{stage_batch, DocumentStore, Query, WriteBatch},
    Config,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    DB,
};
use serde_json::Value;
use std::sync::Arc;

/// Column family names
const CF_DOCUMENTS: &str = "documents";

/// Document store backed by RocksDB
pub struct RocksStore {
    db: Arc<DB>,
    commit_lock: Mutex<()>,
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore").field("path", &self.db.path()).finish()
    }
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Counter shards are rewritten constantly
        db_opts.set_compaction_style(DBCompactionStyle::Level);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_DOCUMENTS,
            Self::cf_options_documents(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB document store");

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    fn cf_options_documents() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point reads dominate (accounts, shards)
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_DOCUMENTS)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_DOCUMENTS)))
    }

    fn read(&self, path: &str) -> Result<Option<Value>> {
        let cf = self.cf_handle()?;
        match self.db.get_cf(cf, path.as_bytes())? {
            Some(bytes) => {
                let doc = serde_json::from_slice(&bytes).map_err(|e| Error::malformed(path, e))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        let cf = self.cf_handle()?;
        let documents = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(StorageStats {
            approximate_documents: documents,
        })
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RocksStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read(path)
    }

    async fn query(&self, query: &Query) -> Result<Vec<(String, Value)>> {
        let cf = self.cf_handle()?;
        let prefix = query.prefix();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        let mut candidates = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let path = String::from_utf8(key.to_vec())
                .map_err(|e| Error::Storage(format!("Non UTF-8 document key: {}", e)))?;
            if !query.contains_path(&path) {
                continue;
            }
            let doc: Value = serde_json::from_slice(&value).map_err(|e| Error::malformed(&path, e))?;
            candidates.push((path, doc));
        }

        Ok(query.apply(candidates))
    }

    async fn create(&self, path: &str, doc: Value) -> Result<()> {
        let _guard = self.commit_lock.lock();
        let cf = self.cf_handle()?;

        if self.db.get_pinned_cf(cf, path.as_bytes())?.is_some() {
            return Err(Error::DocumentExists(path.to_string()));
        }
        self.db.put_cf(cf, path.as_bytes(), serde_json::to_vec(&doc)?)?;

        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let _guard = self.commit_lock.lock();
        let cf = self.cf_handle()?;

        let staged = stage_batch(&batch, |path| self.read(path))?;

        let mut write = rocksdb::WriteBatch::default();
        for (path, doc) in &staged {
            write.put_cf(cf, path.as_bytes(), serde_json::to_vec(doc)?);
        }

        // Atomic commit
        self.db.write(write)?;

        tracing::debug!(ops = batch.len(), documents = staged.len(), "Batch committed");

        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Estimated number of stored documents
    pub approximate_documents: u64,
}
