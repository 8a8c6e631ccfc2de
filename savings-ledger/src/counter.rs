//! Sharded counters
//!
//! A counter is a parent document `{key}` holding its shard count, plus
//! `shard_count` shard documents `{key}/shards/{i}` each holding a partial
//! `count`. Writers add to one random shard, so concurrent increments of
//! the same statistic rarely touch the same document. The value is the sum
//! of all shards at read time; it is not linearizable with in-flight
//! increments and is never used for account balances.

use crate::random::SharedRng;
use crate::store::{decimal_value, fetch, to_document, DocumentStore, WriteBatch};
use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Sub-collection holding the shards
pub const SHARDS: &str = "shards";

/// Field holding a shard's partial count
pub const SHARD_FIELD: &str = "count";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterMeta {
    shard_count: usize,
}

/// Write-scalable numeric aggregate
#[derive(Debug, Clone)]
pub struct ShardedCounter {
    key: String,
    shard_count: usize,
    rng: SharedRng,
}

impl ShardedCounter {
    /// Create the counter with `shard_count` zeroed shards.
    ///
    /// Idempotent: an existing counter is returned as stored, with its own
    /// shard count.
    pub async fn initialize(
        store: &dyn DocumentStore,
        key: impl Into<String>,
        shard_count: usize,
        rng: SharedRng,
    ) -> Result<Self> {
        let key = key.into();
        if shard_count == 0 {
            return Err(Error::InvalidRequest(format!(
                "counter {} needs at least one shard",
                key
            )));
        }

        if let Some(existing) = Self::open(store, &key, rng.clone()).await? {
            return Ok(existing);
        }

        let mut batch = WriteBatch::new();
        batch.create(key.clone(), to_document(&CounterMeta { shard_count })?);
        for index in 0..shard_count {
            batch.create(shard_path(&key, index), json!({ SHARD_FIELD: "0" }));
        }

        match store.commit(batch).await {
            Ok(()) => {
                tracing::debug!(counter = %key, shard_count, "Counter initialized");
                Ok(Self {
                    key,
                    shard_count,
                    rng,
                })
            }
            // Lost the race against another initializer
            Err(Error::DocumentExists(_)) => Self::open(store, &key, rng)
                .await?
                .ok_or_else(|| Error::DocumentNotFound(key.clone())),
            Err(e) => Err(e),
        }
    }

    /// Existing counter, if initialized
    pub async fn open(store: &dyn DocumentStore, key: &str, rng: SharedRng) -> Result<Option<Self>> {
        let meta: Option<CounterMeta> = fetch(store, key).await?;
        match meta {
            Some(meta) if meta.shard_count > 0 => Ok(Some(Self {
                key: key.to_string(),
                shard_count: meta.shard_count,
                rng,
            })),
            Some(_) => Err(Error::malformed(key, "counter without shards")),
            None => Ok(None),
        }
    }

    /// Parent document path
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Queue `delta` onto a uniformly chosen shard.
    ///
    /// Nothing is written until the caller commits the batch.
    pub fn increment<'b>(&self, delta: Decimal, batch: &'b mut WriteBatch) -> &'b mut WriteBatch {
        let index = self.rng.index(self.shard_count);
        tracing::debug!(counter = %self.key, shard = index, %delta, "Queue shard increment");
        batch.increment(shard_path(&self.key, index), SHARD_FIELD, delta)
    }

    /// Sum of all shards
    pub async fn total(&self, store: &dyn DocumentStore) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for index in 0..self.shard_count {
            let path = shard_path(&self.key, index);
            let shard = store
                .get(&path)
                .await?
                .ok_or_else(|| Error::DocumentNotFound(path.clone()))?;
            let value = shard
                .get(SHARD_FIELD)
                .and_then(decimal_value)
                .ok_or_else(|| Error::malformed(&path, "shard count is not numeric"))?;
            total = total
                .checked_add(value)
                .ok_or_else(|| Error::malformed(&self.key, "shard total overflows"))?;
        }
        Ok(total)
    }
}

/// Path of shard `index` under `key`
pub fn shard_path(key: &str, index: usize) -> String {
    format!("{}/{}/{}", key, SHARDS, index)
}
