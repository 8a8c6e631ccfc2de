//! Document store contract used by the ledger
//!
//! Documents are JSON objects addressed by slash-separated paths
//! (`account/SB12345`, `stats/globalBalance/DS/shards/3`). A document's
//! collection is its path without the last segment.
//!
//! All derived writes of one ledger operation travel in a single
//! [`WriteBatch`] and land through [`DocumentStore::commit`] all-or-nothing.
//! Money fields are decimal strings so [`WriteOp::Increment`] stays exact.

use crate::{Error, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Persistence capabilities the ledger relies on
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Filtered, ordered, paged scan of one collection
    async fn query(&self, query: &Query) -> Result<Vec<(String, Value)>>;

    /// Atomic create-if-absent; fails with [`Error::DocumentExists`]
    async fn create(&self, path: &str, doc: Value) -> Result<()>;

    /// Apply every operation of the batch or none of them
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// Read and decode a document
pub async fn fetch<T: DeserializeOwned>(store: &dyn DocumentStore, path: &str) -> Result<Option<T>> {
    match store.get(path).await? {
        Some(doc) => Ok(Some(from_document(path, doc)?)),
        None => Ok(None),
    }
}

/// Create a document unless it exists. Returns whether this call created it.
pub async fn create_if_absent(store: &dyn DocumentStore, path: &str, doc: Value) -> Result<bool> {
    match store.create(path, doc).await {
        Ok(()) => Ok(true),
        Err(Error::DocumentExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Encode a value as a document
pub fn to_document<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Decode a document, reporting shape errors against its path
pub fn from_document<T: DeserializeOwned>(path: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| Error::malformed(path, e))
}

/// Collection part of a document path
pub fn collection_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(collection, _)| collection).unwrap_or("")
}

/// Document paths of the ledger collections
pub mod keys {
    /// Accounts collection
    pub const ACCOUNTS: &str = "account";
    /// Customers collection
    pub const CUSTOMERS: &str = "customer";
    /// Transactions collection
    pub const TRANSACTIONS: &str = "transaction";
    /// DS commission collection
    pub const COMMISSIONS: &str = "commission";
    /// Daily summary collection
    pub const DAILY_SUMMARIES: &str = "dailySummary";
    /// Identifier reservations root
    pub const RESERVATIONS: &str = "reservations";

    /// Account document
    pub fn account(number: &str) -> String {
        format!("{}/{}", ACCOUNTS, number)
    }

    /// Customer document
    pub fn customer(id: &str) -> String {
        format!("{}/{}", CUSTOMERS, id)
    }

    /// Transaction document
    pub fn transaction(receipt_no: &str) -> String {
        format!("{}/{}", TRANSACTIONS, receipt_no)
    }

    /// Commission document
    pub fn commission(id: &str) -> String {
        format!("{}/{}", COMMISSIONS, id)
    }

    /// Daily summary document, keyed by the day's epoch seconds
    pub fn daily_summary(day: i64) -> String {
        format!("{}/{}", DAILY_SUMMARIES, day)
    }

    /// Identifier reservation document
    pub fn reservation(namespace: &str, id: &str) -> String {
        format!("{}/{}/{}", RESERVATIONS, namespace, id)
    }
}

/// One write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert; fails if the document exists
    Create {
        /// Document path
        path: String,
        /// Document body
        doc: Value,
    },
    /// Insert or overwrite
    Set {
        /// Document path
        path: String,
        /// Document body
        doc: Value,
    },
    /// Merge top-level fields; fails if the document is missing
    Update {
        /// Document path
        path: String,
        /// Fields to overwrite
        fields: Vec<(String, Value)>,
    },
    /// Exact decimal add on one field; fails if the document is missing
    Increment {
        /// Document path
        path: String,
        /// Field name
        field: String,
        /// Signed amount to add
        delta: Decimal,
    },
}

impl WriteOp {
    /// Target document path
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Create { path, .. }
            | WriteOp::Set { path, .. }
            | WriteOp::Update { path, .. }
            | WriteOp::Increment { path, .. } => path,
        }
    }
}

/// Ordered list of writes committed as one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create
    pub fn create(&mut self, path: impl Into<String>, doc: Value) -> &mut Self {
        self.ops.push(WriteOp::Create {
            path: path.into(),
            doc,
        });
        self
    }

    /// Queue an overwrite
    pub fn set(&mut self, path: impl Into<String>, doc: Value) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path: path.into(),
            doc,
        });
        self
    }

    /// Queue a field merge
    pub fn update(&mut self, path: impl Into<String>, fields: Vec<(String, Value)>) -> &mut Self {
        self.ops.push(WriteOp::Update {
            path: path.into(),
            fields,
        });
        self
    }

    /// Queue an increment
    pub fn increment(
        &mut self,
        path: impl Into<String>,
        field: impl Into<String>,
        delta: Decimal,
    ) -> &mut Self {
        self.ops.push(WriteOp::Increment {
            path: path.into(),
            field: field.into(),
            delta,
        });
        self
    }

    /// Queued operations
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Resolve a batch against current state without writing anything.
///
/// `read` returns the committed document at a path. The result maps every
/// touched path to its final body; any failing operation rejects the batch.
pub(crate) fn stage_batch<F>(batch: &WriteBatch, mut read: F) -> Result<BTreeMap<String, Value>>
where
    F: FnMut(&str) -> Result<Option<Value>>,
{
    let mut staged: BTreeMap<String, Value> = BTreeMap::new();

    for op in batch.ops() {
        let path = op.path();
        let current = match staged.get(path) {
            Some(doc) => Some(doc.clone()),
            None => read(path)?,
        };

        let next = match op {
            WriteOp::Create { doc, .. } => {
                if current.is_some() {
                    return Err(Error::DocumentExists(path.to_string()));
                }
                doc.clone()
            }
            WriteOp::Set { doc, .. } => doc.clone(),
            WriteOp::Update { fields, .. } => {
                let mut doc = current.ok_or_else(|| Error::DocumentNotFound(path.to_string()))?;
                let object = doc
                    .as_object_mut()
                    .ok_or_else(|| Error::malformed(path, "not an object"))?;
                for (field, value) in fields {
                    object.insert(field.clone(), value.clone());
                }
                doc
            }
            WriteOp::Increment { field, delta, .. } => {
                let mut doc = current.ok_or_else(|| Error::DocumentNotFound(path.to_string()))?;
                let object = doc
                    .as_object_mut()
                    .ok_or_else(|| Error::malformed(path, "not an object"))?;
                let base = match object.get(field.as_str()) {
                    Some(value) => decimal_value(value)
                        .ok_or_else(|| Error::malformed(path, format!("{} is not numeric", field)))?,
                    None => Decimal::ZERO,
                };
                let sum = base.checked_add(*delta).ok_or_else(|| {
                    Error::InvalidAmount(format!("{}.{} would overflow", path, field))
                })?;
                object.insert(field.clone(), Value::String(sum.to_string()));
                doc
            }
        };

        staged.insert(path.to_string(), next);
    }

    Ok(staged)
}

/// Interpret a JSON value as an exact decimal
pub fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::Null => Some(Decimal::ZERO),
        _ => None,
    }
}

/// Comparison used by query filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// ==
    Eq,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
}

/// Field predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,
    /// Comparison
    pub op: FilterOp,
    /// Operand
    pub value: Value,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// Collection scan description
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection path
    pub collection: String,
    /// All filters must hold
    pub filters: Vec<Filter>,
    /// Optional ordering
    pub order_by: Option<(String, Direction)>,
    /// Documents skipped after ordering
    pub offset: usize,
    /// Maximum documents returned
    pub limit: Option<usize>,
}

impl Query {
    /// Scan a whole collection
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            offset: 0,
            limit: None,
        }
    }

    /// Add a filter
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Order by one field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Skip documents
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Cap the result size
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True if `path` is a direct child of the queried collection
    pub(crate) fn contains_path(&self, path: &str) -> bool {
        collection_of(path) == self.collection
    }

    /// Key prefix shared by every document of the collection
    pub(crate) fn prefix(&self) -> String {
        format!("{}/", self.collection)
    }

    /// Filter, order and page candidate documents of the collection
    pub(crate) fn apply(&self, docs: Vec<(String, Value)>) -> Vec<(String, Value)> {
        let mut matched: Vec<(String, Value)> = docs
            .into_iter()
            .filter(|(path, doc)| self.contains_path(path) && self.matches(doc))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            matched.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let paged = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        }
    }

    fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|filter| {
            let actual = doc.get(&filter.field).unwrap_or(&Value::Null);
            let ord = compare_values(actual, &filter.value);
            match filter.op {
                FilterOp::Eq => actual == &filter.value || ord == Some(Ordering::Equal),
                FilterOp::Lt => ord == Some(Ordering::Less),
                FilterOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                FilterOp::Gt => ord == Some(Ordering::Greater),
                FilterOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            }
        })
    }
}

/// Numbers and numeric strings compare as decimals, other strings lexically
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => match (decimal_value(a), decimal_value(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => match (a, b) {
                (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
                _ => None,
            },
        },
    }
}
