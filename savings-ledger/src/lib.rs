//! SureBank Savings Ledger
//!
//! Savings accounts (free-form SB and fixed-installment DS), their deposit
//! and withdrawal transactions, DS commission charges and write-heavy
//! reporting statistics on top of a document store.
//!
//! # Architecture
//!
//! - **Atomic batches**: Every derived write of one operation commits as a unit
//! - **Sharded counters**: Statistics spread their writes over N shard documents
//! - **Reservations**: Identifiers are claimed by create-if-absent, never probed
//! - **Pluggable collaborators**: Store, notification gateway and clock are traits
//!
//! # Invariants
//!
//! - Balance = Σ(deposits) − Σ(withdrawals incl. fees), archived entries removed once
//! - DS deposits are whole multiples of the target, one transaction per day unit
//! - At most one DS commission per commission cycle
//! - Receipt and account numbers never repeat

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod accounts;
pub mod clock;
pub mod config;
pub mod counter;
pub mod deposit;
pub mod engine;
pub mod error;
pub mod id_gen;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod notify;
pub mod random;
pub mod stats;
pub mod storage;
pub mod store;
pub mod types;
pub mod withdraw;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use counter::ShardedCounter;
pub use deposit::DepositPolicy;
pub use engine::LedgerEngine;
pub use error::{Error, Result};
pub use id_gen::UniqueIdGenerator;
pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use notify::{LogNotifier, NotificationGateway, RecordingNotifier, Template};
pub use stats::{StatKey, StatisticsAggregator};
pub use storage::RocksStore;
pub use store::{DocumentStore, Query, WriteBatch};
pub use types::{
    Account, AccountType, CreateCustomerRequest, Customer, DailySummary, DepositRequest,
    DsCommission, OpenAccountRequest, RecordRequest, Transaction, TransactionType,
    WithdrawRequest,
};
