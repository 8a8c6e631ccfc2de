//! Reporting statistics on top of sharded counters
//!
//! # Counters
//!
//! - `stats/transaction/{day}/{type}/count` - bookings per day and type
//! - `stats/transaction/{day}/{type}/total` - amount per day and type
//! - `stats/rep/{day}/{rep}/{method}` - amount per representative and payment method
//! - `stats/globalBalance/{SB|DS}` - sum of balances per account type
//! - `stats/commission/count`, `stats/commission/total` - DS commissions

use crate::counter::ShardedCounter;
use crate::random::SharedRng;
use crate::store::{DocumentStore, WriteBatch};
use crate::types::{AccountType, TransactionType};
use crate::Result;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Statistic dimension key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatKey {
    /// Number of bookings of a type on a day
    DailyCount {
        /// Day (epoch seconds, midnight UTC)
        day: i64,
        /// Booking type
        tx_type: TransactionType,
    },
    /// Amount booked with a type on a day
    DailyTotal {
        /// Day (epoch seconds, midnight UTC)
        day: i64,
        /// Booking type
        tx_type: TransactionType,
    },
    /// Amount collected by a representative with a payment method on a day
    RepTotal {
        /// Day (epoch seconds, midnight UTC)
        day: i64,
        /// Representative id
        sales_rep_id: String,
        /// Payment method
        payment_method: String,
    },
    /// Sum of balances of all accounts of a type
    GlobalBalance(AccountType),
    /// Number of commissions charged
    CommissionCount,
    /// Amount of commissions charged
    CommissionTotal,
}

impl StatKey {
    /// Counter document path
    pub fn path(&self) -> String {
        match self {
            StatKey::DailyCount { day, tx_type } => {
                format!("stats/transaction/{}/{}/count", day, tx_type)
            }
            StatKey::DailyTotal { day, tx_type } => {
                format!("stats/transaction/{}/{}/total", day, tx_type)
            }
            StatKey::RepTotal {
                day,
                sales_rep_id,
                payment_method,
            } => format!(
                "stats/rep/{}/{}/{}",
                day,
                segment(sales_rep_id),
                segment(payment_method)
            ),
            StatKey::GlobalBalance(account_type) => {
                format!("stats/globalBalance/{}", account_type.code())
            }
            StatKey::CommissionCount => "stats/commission/count".to_string(),
            StatKey::CommissionTotal => "stats/commission/total".to_string(),
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Free-text ids must stay one path segment
fn segment(raw: &str) -> String {
    if raw.is_empty() {
        return "_".to_string();
    }
    raw.replace('/', "_")
}

/// Keyed collection of sharded counters
#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<dyn DocumentStore>,
    shard_count: usize,
    rng: SharedRng,
}

impl fmt::Debug for StatisticsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsAggregator")
            .field("shard_count", &self.shard_count)
            .finish()
    }
}

impl StatisticsAggregator {
    /// New aggregator creating counters with `shard_count` shards
    pub fn new(store: Arc<dyn DocumentStore>, shard_count: usize, rng: SharedRng) -> Self {
        Self {
            store,
            shard_count,
            rng,
        }
    }

    /// Counter for `key`, initialized on first use
    pub async fn ensure(&self, key: &StatKey) -> Result<ShardedCounter> {
        ShardedCounter::initialize(
            self.store.as_ref(),
            key.path(),
            self.shard_count,
            self.rng.clone(),
        )
        .await
    }

    /// Queue `delta` onto the counter for `key`
    pub async fn bump(&self, key: &StatKey, delta: Decimal, batch: &mut WriteBatch) -> Result<()> {
        let counter = self.ensure(key).await?;
        counter.increment(delta, batch);
        Ok(())
    }

    /// Current value; zero for a counter never written
    pub async fn total(&self, key: &StatKey) -> Result<Decimal> {
        let path = key.path();
        match ShardedCounter::open(self.store.as_ref(), &path, self.rng.clone()).await? {
            Some(counter) => counter.total(self.store.as_ref()).await,
            None => Ok(Decimal::ZERO),
        }
    }
}
