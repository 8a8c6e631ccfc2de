//! Main ledger orchestration layer
//!
//! Ties together the document store, the booking engine, the deposit policy
//! and the notification gateway into the API used by request handlers.
//!
//! # Example
//!
//! ```no_run
//! use savings_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> savings_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     // Deposit
//!     // let booked = ledger.deposit(&request).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    clock::{day_start, Clock, SystemClock},
    deposit::DepositPolicy,
    engine::LedgerEngine,
    metrics::Metrics,
    notify::{LogNotifier, NotificationGateway},
    random::SharedRng,
    stats::StatKey,
    storage::{RocksStore, StorageStats},
    store::{fetch, from_document, keys, DocumentStore, Direction, FilterOp, Query},
    types::{
        Account, AccountType, CreateCustomerRequest, Customer, DailySummary, DepositRequest,
        OpenAccountRequest, Transaction, TransactionType, WithdrawRequest,
    },
    Config, Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Booking engine
    engine: LedgerEngine,

    /// Deposit splitting
    deposits: DepositPolicy,

    /// RocksDB handle when opened from disk
    rocks: Option<Arc<RocksStore>>,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger on RocksDB, logging notifications
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let rocks = Arc::new(RocksStore::open(&config)?);
        let notifier = Arc::new(LogNotifier::new(config.notifications.sender.clone()));

        let mut ledger = Self::with_parts(config, rocks.clone(), notifier, Arc::new(SystemClock))?;
        ledger.rocks = Some(rocks);
        Ok(ledger)
    }

    /// Ledger over caller-supplied collaborators
    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = LedgerEngine::new(
            store,
            notifier,
            clock,
            SharedRng::from_entropy(),
            &config,
            Metrics::new()?,
        );
        Ok(Self {
            deposits: DepositPolicy::new(engine.clone()),
            engine,
            rocks: None,
            config,
        })
    }

    /// Booking engine
    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        self.engine.metrics()
    }

    /// Book a client deposit; DS deposits yield one transaction per day unit
    pub async fn deposit(&self, req: &DepositRequest) -> Result<Vec<Transaction>> {
        self.deposits.deposit(req).await
    }

    /// Book a client withdrawal
    pub async fn withdraw(&self, req: &WithdrawRequest) -> Result<Transaction> {
        self.engine.withdraw(req).await
    }

    /// Archive a transaction by receipt number
    pub async fn archive(&self, receipt_no: &str) -> Result<Transaction> {
        self.engine.archive(receipt_no).await
    }

    /// Register a customer (and optionally a first account)
    pub async fn create_customer(
        &self,
        req: &CreateCustomerRequest,
    ) -> Result<(Customer, Option<Account>)> {
        self.engine.create_customer(req).await
    }

    /// Open an account for an existing customer
    pub async fn open_account(&self, req: &OpenAccountRequest) -> Result<Account> {
        self.engine.open_account(req).await
    }

    /// Get account by number
    pub async fn get_account(&self, number: &str) -> Result<Account> {
        self.engine.load_account(number).await
    }

    /// Get customer by id
    pub async fn get_customer(&self, id: &str) -> Result<Customer> {
        self.engine.load_customer(id).await
    }

    /// Get transaction by receipt number
    pub async fn get_transaction(&self, receipt_no: &str) -> Result<Transaction> {
        fetch(self.store(), &keys::transaction(receipt_no))
            .await?
            .ok_or_else(|| Error::TransactionNotFound(receipt_no.to_string()))
    }

    /// Transactions of an account, newest first
    pub async fn list_transactions(
        &self,
        account_number: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let query = Query::collection(keys::TRANSACTIONS)
            .filter("account_number", FilterOp::Eq, account_number)
            .order_by("created_at", Direction::Desc)
            .offset(offset)
            .limit(limit);
        self.list(&query).await
    }

    /// Accounts owned by a customer, oldest first
    pub async fn list_accounts(&self, customer_id: &str) -> Result<Vec<Account>> {
        let query = Query::collection(keys::ACCOUNTS)
            .filter("customer_id", FilterOp::Eq, customer_id)
            .order_by("created_at", Direction::Asc);
        self.list(&query).await
    }

    /// Customers, newest first, optionally only those of one representative
    pub async fn list_customers(
        &self,
        sales_rep_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Customer>> {
        let mut query = Query::collection(keys::CUSTOMERS);
        if let Some(rep) = sales_rep_id {
            query = query.filter("sales_rep_id", FilterOp::Eq, rep);
        }
        let query = query
            .order_by("created_at", Direction::Desc)
            .offset(offset)
            .limit(limit);
        self.list(&query).await
    }

    /// Running totals of the calendar day containing `day`
    pub async fn daily_summary(&self, day: DateTime<Utc>) -> Result<DailySummary> {
        let day = day_start(day).timestamp();
        let summary: Option<DailySummary> = fetch(self.store(), &keys::daily_summary(day)).await?;
        Ok(summary.unwrap_or(DailySummary {
            date: day,
            ..DailySummary::default()
        }))
    }

    /// Deposits booked on a day (count, total)
    pub async fn deposit_stats(&self, day: DateTime<Utc>) -> Result<(Decimal, Decimal)> {
        let day = day_start(day).timestamp();
        let tx_type = TransactionType::Deposit;
        let count = self.stat(&StatKey::DailyCount { day, tx_type }).await?;
        let total = self.stat(&StatKey::DailyTotal { day, tx_type }).await?;
        Ok((count, total))
    }

    /// Deposits collected by a representative with a payment method on a day
    pub async fn rep_total(
        &self,
        day: DateTime<Utc>,
        sales_rep_id: &str,
        payment_method: &str,
    ) -> Result<Decimal> {
        self.stat(&StatKey::RepTotal {
            day: day_start(day).timestamp(),
            sales_rep_id: sales_rep_id.to_string(),
            payment_method: payment_method.to_string(),
        })
        .await
    }

    /// Sum of balances of all accounts of a type
    pub async fn global_balance(&self, account_type: AccountType) -> Result<Decimal> {
        self.stat(&StatKey::GlobalBalance(account_type)).await
    }

    /// Commissions charged so far (count, total)
    pub async fn commission_stats(&self) -> Result<(Decimal, Decimal)> {
        let count = self.stat(&StatKey::CommissionCount).await?;
        let total = self.stat(&StatKey::CommissionTotal).await?;
        Ok((count, total))
    }

    /// Current value of any statistic
    pub async fn stat(&self, key: &StatKey) -> Result<Decimal> {
        self.engine.stats().total(key).await
    }

    /// RocksDB statistics, when running on RocksDB
    pub fn storage_stats(&self) -> Result<Option<StorageStats>> {
        self.rocks.as_ref().map(|rocks| rocks.stats()).transpose()
    }

    fn store(&self) -> &dyn DocumentStore {
        self.engine.store().as_ref()
    }

    async fn list<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        self.store()
            .query(query)
            .await?
            .into_iter()
            .map(|(path, doc)| from_document(&path, doc))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use crate::notify::RecordingNotifier;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn memory_ledger() -> (Ledger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap(),
        ));
        let ledger = Ledger::with_parts(
            Config::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingNotifier::new()),
            clock.clone(),
        )
        .unwrap();
        (ledger, clock)
    }

    async fn customer_with(ledger: &Ledger, account_type: AccountType, target: i64) -> Account {
        let (_, account) = ledger
            .create_customer(&CreateCustomerRequest {
                name: "Ngozi Ade".into(),
                phone_number: "+2348000000003".into(),
                sales_rep_id: "rep-9".into(),
                account_type: Some(account_type),
                target: Decimal::from(target),
                ..CreateCustomerRequest::default()
            })
            .await
            .unwrap();
        account.unwrap()
    }

    fn deposit(number: &str, amount: i64) -> DepositRequest {
        DepositRequest {
            account_number: number.into(),
            amount: Decimal::from(amount),
            payment_method: "cash".into(),
            sales_rep_id: "rep-9".into(),
            ..DepositRequest::default()
        }
    }

    #[tokio::test]
    async fn test_ledger_open() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let ledger = Ledger::open(config).await.unwrap();
        assert!(ledger.storage_stats().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_transactions_newest_first() {
        let (ledger, clock) = memory_ledger();
        let account = customer_with(&ledger, AccountType::SB, 0).await;

        for amount in [100, 200, 300] {
            ledger.deposit(&deposit(&account.number, amount)).await.unwrap();
            clock.advance(chrono::Duration::minutes(5));
        }

        let page = ledger.list_transactions(&account.number, 0, 2).await.unwrap();
        let amounts: Vec<Decimal> = page.iter().map(|tx| tx.amount).collect();
        assert_eq!(amounts, vec![Decimal::from(300), Decimal::from(200)]);

        let rest = ledger.list_transactions(&account.number, 2, 10).await.unwrap();
        assert_eq!(rest.len(), 1);

        let receipt = &page[0].receipt_no;
        assert_eq!(&ledger.get_transaction(receipt).await.unwrap().receipt_no, receipt);
    }

    #[tokio::test]
    async fn test_read_side_statistics() {
        let (ledger, clock) = memory_ledger();
        let account = customer_with(&ledger, AccountType::SB, 0).await;
        ledger.deposit(&deposit(&account.number, 400)).await.unwrap();
        ledger.deposit(&deposit(&account.number, 100)).await.unwrap();

        let today = clock.now();
        let (count, total) = ledger.deposit_stats(today).await.unwrap();
        assert_eq!(count, Decimal::from(2));
        assert_eq!(total, Decimal::from(500));
        assert_eq!(
            ledger.rep_total(today, "rep-9", "cash").await.unwrap(),
            Decimal::from(500)
        );
        assert_eq!(
            ledger.global_balance(AccountType::SB).await.unwrap(),
            Decimal::from(500)
        );
        assert_eq!(ledger.daily_summary(today).await.unwrap().income, Decimal::from(500));
        assert_eq!(ledger.metrics().deposits_total.get(), 2);
    }

    #[tokio::test]
    async fn test_list_customers_by_rep() {
        let (ledger, clock) = memory_ledger();
        customer_with(&ledger, AccountType::SB, 0).await;
        clock.advance(chrono::Duration::seconds(1));
        let ds = customer_with(&ledger, AccountType::DS, 100).await;
        ledger
            .create_customer(&CreateCustomerRequest {
                name: "Other".into(),
                phone_number: "+2348000000004".into(),
                sales_rep_id: "rep-1".into(),
                ..CreateCustomerRequest::default()
            })
            .await
            .unwrap();

        let mine = ledger.list_customers(Some("rep-9"), 0, 10).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, ds.customer_id);
        assert_eq!(ledger.list_customers(None, 0, 10).await.unwrap().len(), 3);
        assert_eq!(ledger.list_accounts(&ds.customer_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_documents_are_reported() {
        let (ledger, _) = memory_ledger();
        assert!(matches!(
            ledger.get_account("SB00000").await,
            Err(Error::AccountNotFound(_))
        ));
        assert!(matches!(
            ledger.get_transaction("TX000000").await,
            Err(Error::TransactionNotFound(_))
        ));
        let (count, total) = ledger.commission_stats().await.unwrap();
        assert_eq!((count, total), (Decimal::ZERO, Decimal::ZERO));
    }
}
