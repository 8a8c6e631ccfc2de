//! Transaction-processing core
//!
//! [`LedgerEngine::record`] books one deposit or withdrawal. Every derived
//! write of a booking (transaction document, optional DS fee transaction and
//! commission, daily summary, account state, statistic shards) is queued on
//! one [`WriteBatch`] and committed as a unit. Notifications go out only
//! after the commit succeeded.
//!
//! # Invariants
//!
//! - Account balance moves only through exact increments queued here
//! - The global balance statistic of a type equals the sum of its balances
//! - A DS commission is charged at most once per commission cycle

use crate::clock::{day_start, days_between, from_epoch, Clock};
use crate::config::{Config, LedgerPolicyConfig};
use crate::id_gen::UniqueIdGenerator;
use crate::metrics::Metrics;
use crate::notify::{NotificationData, NotificationGateway, Template};
use crate::random::SharedRng;
use crate::stats::{StatKey, StatisticsAggregator};
use crate::store::{create_if_absent, fetch, keys, to_document, DocumentStore, WriteBatch};
use crate::types::{
    Account, AccountType, Customer, DailySummary, DsCommission, RecordRequest, Transaction,
    TransactionType, FEE_NARRATION, PAYMENT_METHOD_BANK_DEPOSIT, PAYMENT_METHOD_DEDUCTION,
};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Reservation namespace guarding single archival of a receipt
const ARCHIVE_NAMESPACE: &str = "archives";

/// Ledger booking engine
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn DocumentStore>,
    stats: StatisticsAggregator,
    ids: UniqueIdGenerator,
    notifier: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    policy: LedgerPolicyConfig,
    notifications_enabled: bool,
    metrics: Metrics,
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("policy", &self.policy)
            .field("notifications_enabled", &self.notifications_enabled)
            .finish()
    }
}

impl LedgerEngine {
    /// Engine over `store`, sharing `rng` between shard selection and ids
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        rng: SharedRng,
        config: &Config,
        metrics: Metrics,
    ) -> Self {
        let stats = StatisticsAggregator::new(store.clone(), config.counters.shard_count, rng.clone());
        let ids = UniqueIdGenerator::new(store.clone(), rng, config.ids.clone());
        Self {
            store,
            stats,
            ids,
            notifier,
            clock,
            policy: config.ledger.clone(),
            notifications_enabled: config.notifications.enabled,
            metrics,
        }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Statistics
    pub fn stats(&self) -> &StatisticsAggregator {
        &self.stats
    }

    /// Identifier allocator
    pub fn ids(&self) -> &UniqueIdGenerator {
        &self.ids
    }

    /// Time source
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Deposit and commission policy
    pub fn policy(&self) -> &LedgerPolicyConfig {
        &self.policy
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Book one deposit or withdrawal.
    ///
    /// `at` is the booking instant; `None` means now. The effective date is
    /// the calendar day of `at`, except on a DS account with history, where
    /// it is the day after the newest active transaction's effective date.
    pub async fn record(&self, req: &RecordRequest, at: Option<DateTime<Utc>>) -> Result<Transaction> {
        if req.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {}",
                req.amount
            )));
        }

        let account = self.load_account(&req.account_number).await?;
        let customer = self.load_customer(&account.customer_id).await?;

        let now = at.unwrap_or_else(|| self.clock.now());
        let effective = self.effective_date(&account, now)?;
        let day = effective.timestamp();
        let starts_cycle = days_between(from_epoch(account.last_commission_date)?, effective)
            >= self.policy.commission_cycle_days;

        let receipt_no = self.ids.receipt_number().await?;
        let tx = Transaction {
            receipt_no,
            tx_type: req.tx_type,
            account_number: account.number.clone(),
            customer_id: non_empty_or(&req.customer_id, &account.customer_id),
            customer_name: non_empty_or(&req.customer_name, &customer.name),
            amount: req.amount,
            narration: req.narration.clone(),
            payment_method: req.payment_method.clone(),
            sales_rep_id: req.sales_rep_id.clone(),
            sales_rep: req.sales_rep.clone(),
            effective_date: day,
            created_at: now.timestamp(),
            updated_at: now.timestamp(),
            archived_at: None,
        };

        let mut batch = WriteBatch::new();
        batch.create(keys::transaction(&tx.receipt_no), to_document(&tx)?);
        let mut balance_delta = tx.signed_amount();

        self.ensure_daily_summary(day).await?;
        queue_summary(&mut batch, &tx, Decimal::ONE);
        self.queue_booking_stats(&mut batch, &tx, account.account_type, Decimal::ONE)
            .await?;

        let mut last_commission_date = account.last_commission_date;
        let mut fee = None;
        if tx.tx_type == TransactionType::Deposit && account.is_ds() && starts_cycle {
            let charged = self
                .queue_commission(&mut batch, &account, &tx, now)
                .await?;
            balance_delta -= charged.amount;
            last_commission_date = day;
            fee = Some(charged);
        }

        let balance = account.balance.checked_add(balance_delta).ok_or_else(|| {
            Error::InvalidAmount(format!(
                "balance of {} would overflow",
                account.number
            ))
        })?;

        let mut recent = account.recent_transactions.clone();
        recent.push(tx.clone());

        let account_path = keys::account(&account.number);
        batch.increment(&account_path, "balance", balance_delta);
        let mut fields = vec![
            ("last_commission_date".to_string(), json!(last_commission_date)),
            ("recent_transactions".to_string(), to_document(&recent)?),
            ("updated_at".to_string(), json!(now.timestamp())),
        ];
        if tx.tx_type == TransactionType::Deposit {
            fields.push(("last_payment_date".to_string(), json!(day)));
        }
        batch.update(&account_path, fields);

        self.commit(batch, "record").await?;

        match tx.tx_type {
            TransactionType::Deposit => self.metrics.record_deposit(),
            TransactionType::Withdrawal => self.metrics.record_withdrawal(),
        }
        if let Some(fee) = &fee {
            self.metrics.record_commission();
            self.metrics.record_withdrawal();
            tracing::info!(
                account = %account.number,
                receipt = %fee.receipt_no,
                amount = %fee.amount,
                "DS commission charged"
            );
        }
        tracing::info!(
            account = %account.number,
            receipt = %tx.receipt_no,
            tx_type = %tx.tx_type,
            amount = %tx.amount,
            effective_date = day,
            balance = %balance,
            "Transaction recorded"
        );

        let template = match tx.tx_type {
            TransactionType::Deposit if account.account_type == AccountType::SB => {
                Some(Template::PaymentReceived)
            }
            TransactionType::Deposit => None,
            TransactionType::Withdrawal => Some(Template::PaymentWithdrawn),
        };
        if let Some(template) = template {
            let data = NotificationData {
                name: customer.name.clone(),
                amount: tx.amount,
                balance,
                effective_date: None,
            };
            self.notify(&customer, template, &data).await;
        }

        Ok(tx)
    }

    /// Soft-delete a transaction and reverse its effects.
    ///
    /// Reverses the balance, the daily summary fields, the booking statistics
    /// and the global balance. A commission charged alongside a deposit is
    /// left in place.
    pub async fn archive(&self, receipt_no: &str) -> Result<Transaction> {
        let path = keys::transaction(receipt_no);
        let mut tx: Transaction = fetch(self.store.as_ref(), &path)
            .await?
            .ok_or_else(|| Error::TransactionNotFound(receipt_no.to_string()))?;
        if tx.is_archived() {
            return Err(Error::AlreadyArchived(receipt_no.to_string()));
        }

        let account = self.load_account(&tx.account_number).await?;
        let now = self.clock.now().timestamp();

        let mut batch = WriteBatch::new();
        // Fails the commit if a concurrent archival got there first
        let guard = keys::reservation(ARCHIVE_NAMESPACE, receipt_no);
        batch.create(&guard, json!({ "archived_at": now }));
        batch.update(
            &path,
            vec![
                ("archived_at".to_string(), json!(now)),
                ("updated_at".to_string(), json!(now)),
            ],
        );

        let mut recent = account.recent_transactions.clone();
        recent.mark_archived(receipt_no, now);
        let account_path = keys::account(&account.number);
        batch.increment(&account_path, "balance", -tx.signed_amount());
        batch.update(
            &account_path,
            vec![
                ("recent_transactions".to_string(), to_document(&recent)?),
                ("updated_at".to_string(), json!(now)),
            ],
        );

        self.ensure_daily_summary(tx.effective_date).await?;
        queue_summary(&mut batch, &tx, Decimal::NEGATIVE_ONE);
        self.queue_booking_stats(&mut batch, &tx, account.account_type, Decimal::NEGATIVE_ONE)
            .await?;

        match self.commit(batch, "archive").await {
            Err(Error::DocumentExists(existing)) if existing == guard => {
                return Err(Error::AlreadyArchived(receipt_no.to_string()));
            }
            other => other?,
        }

        self.metrics.record_archival();
        tracing::info!(
            account = %account.number,
            receipt = %receipt_no,
            amount = %tx.amount,
            tx_type = %tx.tx_type,
            "Transaction archived"
        );

        tx.archived_at = Some(now);
        tx.updated_at = now;
        Ok(tx)
    }

    /// Account by number
    pub(crate) async fn load_account(&self, number: &str) -> Result<Account> {
        fetch(self.store.as_ref(), &keys::account(number))
            .await?
            .ok_or_else(|| Error::AccountNotFound(number.to_string()))
    }

    /// Customer by id
    pub(crate) async fn load_customer(&self, id: &str) -> Result<Customer> {
        fetch(self.store.as_ref(), &keys::customer(id))
            .await?
            .ok_or_else(|| Error::CustomerNotFound(id.to_string()))
    }

    /// Best-effort delivery; failures are logged and counted only
    pub(crate) async fn notify(&self, customer: &Customer, template: Template, data: &NotificationData) {
        if !self.notifications_enabled {
            return;
        }
        if let Err(e) = self
            .notifier
            .send(&customer.phone_number, template, data)
            .await
        {
            self.metrics.record_notification_failure();
            tracing::warn!(
                customer = %customer.id,
                template = %template,
                error = %e,
                "Notification failed"
            );
        }
    }

    fn effective_date(&self, account: &Account, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match account.recent_transactions.latest_active() {
            Some(last) if account.is_ds() => {
                Ok(day_start(from_epoch(last.effective_date)?) + Duration::days(1))
            }
            _ => Ok(day_start(now)),
        }
    }

    async fn ensure_daily_summary(&self, day: i64) -> Result<()> {
        let summary = DailySummary {
            date: day,
            ..DailySummary::default()
        };
        if create_if_absent(self.store.as_ref(), &keys::daily_summary(day), to_document(&summary)?)
            .await?
        {
            tracing::debug!(day, "Daily summary created");
        }
        Ok(())
    }

    /// Statistics touched by one booking, scaled by `sign`
    async fn queue_booking_stats(
        &self,
        batch: &mut WriteBatch,
        tx: &Transaction,
        account_type: AccountType,
        sign: Decimal,
    ) -> Result<()> {
        if tx.tx_type == TransactionType::Deposit {
            let day = tx.effective_date;
            self.stats
                .bump(
                    &StatKey::DailyCount {
                        day,
                        tx_type: tx.tx_type,
                    },
                    sign,
                    batch,
                )
                .await?;
            self.stats
                .bump(
                    &StatKey::DailyTotal {
                        day,
                        tx_type: tx.tx_type,
                    },
                    sign * tx.amount,
                    batch,
                )
                .await?;
            self.stats
                .bump(
                    &StatKey::RepTotal {
                        day,
                        sales_rep_id: tx.sales_rep_id.clone(),
                        payment_method: tx.payment_method.clone(),
                    },
                    sign * tx.amount,
                    batch,
                )
                .await?;
        }

        self.stats
            .bump(
                &StatKey::GlobalBalance(account_type),
                sign * tx.signed_amount(),
                batch,
            )
            .await
    }

    /// Queue the fee withdrawal and commission record for a new DS cycle
    async fn queue_commission(
        &self,
        batch: &mut WriteBatch,
        account: &Account,
        deposit: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let amount = if account.target > Decimal::ZERO {
            account.target
        } else {
            deposit.amount
        };
        let charged_at = now + Duration::seconds(self.policy.fee_offset_secs);

        let fee = Transaction {
            receipt_no: self.ids.receipt_number().await?,
            tx_type: TransactionType::Withdrawal,
            account_number: account.number.clone(),
            customer_id: deposit.customer_id.clone(),
            customer_name: deposit.customer_name.clone(),
            amount,
            narration: FEE_NARRATION.to_string(),
            payment_method: PAYMENT_METHOD_DEDUCTION.to_string(),
            sales_rep_id: deposit.sales_rep_id.clone(),
            sales_rep: deposit.sales_rep.clone(),
            effective_date: deposit.effective_date,
            created_at: charged_at.timestamp(),
            updated_at: charged_at.timestamp(),
            archived_at: None,
        };
        batch.create(keys::transaction(&fee.receipt_no), to_document(&fee)?);
        queue_summary(batch, &fee, Decimal::ONE);

        let commission = DsCommission {
            id: Uuid::new_v4().to_string(),
            account_number: account.number.clone(),
            customer_id: account.customer_id.clone(),
            customer_name: deposit.customer_name.clone(),
            amount,
            date: now.timestamp(),
            effective_date: deposit.effective_date,
        };
        batch.create(keys::commission(&commission.id), to_document(&commission)?);

        self.stats
            .bump(&StatKey::CommissionCount, Decimal::ONE, batch)
            .await?;
        self.stats
            .bump(&StatKey::CommissionTotal, amount, batch)
            .await?;
        self.stats
            .bump(&StatKey::GlobalBalance(account.account_type), -amount, batch)
            .await?;

        Ok(fee)
    }

    pub(crate) async fn commit(&self, batch: WriteBatch, operation: &str) -> Result<()> {
        let ops = batch.len();
        let started = Instant::now();
        let result = self.store.commit(batch).await;
        self.metrics
            .record_commit_duration(started.elapsed().as_secs_f64());

        match &result {
            Ok(()) => tracing::debug!(operation, ops, "Batch committed"),
            Err(e) => tracing::error!(operation, ops, error = %e, "Batch commit failed"),
        }
        result
    }
}

/// Daily summary fields moved by `tx`, scaled by `sign`
fn queue_summary(batch: &mut WriteBatch, tx: &Transaction, sign: Decimal) {
    let path = keys::daily_summary(tx.effective_date);
    let amount = sign * tx.amount;
    match tx.tx_type {
        TransactionType::Deposit => {
            batch.increment(&path, "income", amount);
            if tx.payment_method == PAYMENT_METHOD_BANK_DEPOSIT {
                batch.increment(&path, "bank_deposit", amount);
            }
        }
        TransactionType::Withdrawal => {
            batch.increment(&path, "expenditure", amount);
        }
    }
}

/// `preferred` unless empty
pub(crate) fn non_empty_or(preferred: &str, fallback: &str) -> String {
    if preferred.is_empty() {
        fallback.to_string()
    } else {
        preferred.to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::store::{FilterOp, Query};

    async fn account(h: &Harness, number: &str) -> Account {
        h.engine.load_account(number).await.unwrap()
    }

    #[tokio::test]
    async fn test_sb_deposit_updates_everything() {
        let h = harness();
        seed(&h, "SB10001", AccountType::SB, 0).await;

        let tx = h
            .engine
            .record(&request("SB10001", TransactionType::Deposit, 750), None)
            .await
            .unwrap();

        let acct = account(&h, "SB10001").await;
        assert_eq!(acct.balance, Decimal::from(750));
        assert_eq!(acct.last_payment_date, day_start(start()).timestamp());
        assert_eq!(acct.recent_transactions.latest().unwrap().receipt_no, tx.receipt_no);
        assert_eq!(tx.customer_name, "Ada Obi");

        let summary: DailySummary = fetch(h.store.as_ref(), &keys::daily_summary(tx.effective_date))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.income, Decimal::from(750));

        let stats = h.engine.stats();
        let day = tx.effective_date;
        let count = StatKey::DailyCount {
            day,
            tx_type: TransactionType::Deposit,
        };
        assert_eq!(stats.total(&count).await.unwrap(), Decimal::ONE);
        assert_eq!(
            stats.total(&StatKey::GlobalBalance(AccountType::SB)).await.unwrap(),
            Decimal::from(750)
        );
        assert_eq!(h.notifier.sent_with(Template::PaymentReceived).len(), 1);
    }

    #[tokio::test]
    async fn test_first_ds_deposit_charges_commission() {
        let h = harness();
        seed(&h, "DS20001", AccountType::DS, 200).await;

        let tx = h
            .engine
            .record(&request("DS20001", TransactionType::Deposit, 200), None)
            .await
            .unwrap();

        let acct = account(&h, "DS20001").await;
        assert_eq!(acct.balance, Decimal::ZERO);
        assert_eq!(acct.last_commission_date, tx.effective_date);

        let fees = h
            .store
            .query(&Query::collection(keys::TRANSACTIONS).filter("narration", FilterOp::Eq, FEE_NARRATION))
            .await
            .unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].1["created_at"], json!(tx.created_at + 2));

        let commissions = h.store.query(&Query::collection(keys::COMMISSIONS)).await.unwrap();
        assert_eq!(commissions.len(), 1);

        let stats = h.engine.stats();
        assert_eq!(stats.total(&StatKey::CommissionCount).await.unwrap(), Decimal::ONE);
        assert_eq!(
            stats.total(&StatKey::GlobalBalance(AccountType::DS)).await.unwrap(),
            Decimal::ZERO
        );
        // DS deposits are announced by the deposit policy
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_ds_effective_date_follows_history() {
        let h = harness();
        seed(&h, "DS20002", AccountType::DS, 100).await;

        let first = h
            .engine
            .record(&request("DS20002", TransactionType::Deposit, 100), None)
            .await
            .unwrap();
        let second = h
            .engine
            .record(&request("DS20002", TransactionType::Deposit, 100), None)
            .await
            .unwrap();

        assert_eq!(second.effective_date - first.effective_date, 86_400);
        assert_eq!(account(&h, "DS20002").await.balance, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_commission_once_per_cycle() {
        let h = harness();
        seed(&h, "DS20003", AccountType::DS, 100).await;

        // Thirty-one single-day bookings: day 0 charges, days 1..=30 do not
        for _ in 0..31 {
            h.engine
                .record(&request("DS20003", TransactionType::Deposit, 100), None)
                .await
                .unwrap();
        }
        let stats = h.engine.stats();
        assert_eq!(stats.total(&StatKey::CommissionCount).await.unwrap(), Decimal::ONE);

        // Day 31 opens the next cycle
        h.engine
            .record(&request("DS20003", TransactionType::Deposit, 100), None)
            .await
            .unwrap();
        assert_eq!(stats.total(&StatKey::CommissionCount).await.unwrap(), Decimal::from(2));
        assert_eq!(account(&h, "DS20003").await.balance, Decimal::from(3000));
    }

    #[tokio::test]
    async fn test_withdrawal_books_expenditure() {
        let h = harness();
        seed(&h, "SB10002", AccountType::SB, 0).await;
        h.engine
            .record(&request("SB10002", TransactionType::Deposit, 1000), None)
            .await
            .unwrap();
        let tx = h
            .engine
            .record(&request("SB10002", TransactionType::Withdrawal, 400), None)
            .await
            .unwrap();

        let summary: DailySummary = fetch(h.store.as_ref(), &keys::daily_summary(tx.effective_date))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.income, Decimal::from(1000));
        assert_eq!(summary.expenditure, Decimal::from(400));
        assert_eq!(account(&h, "SB10002").await.balance, Decimal::from(600));
        assert_eq!(h.notifier.sent_with(Template::PaymentWithdrawn).len(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_booking() {
        let h = harness();
        seed(&h, "SB10003", AccountType::SB, 0).await;
        h.notifier.set_failing(true);

        let result = h
            .engine
            .record(&request("SB10003", TransactionType::Deposit, 50), None)
            .await;
        assert!(result.is_ok());
        assert_eq!(account(&h, "SB10003").await.balance, Decimal::from(50));
        assert_eq!(h.engine.metrics().notification_failures.get(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_rejected_without_writes() {
        let h = harness();
        let before = h.store.len();
        let result = h
            .engine
            .record(&request("SB99999", TransactionType::Deposit, 50), None)
            .await;
        assert!(matches!(result, Err(Error::AccountNotFound(_))));
        assert_eq!(h.store.len(), before);
    }

    #[tokio::test]
    async fn test_archive_reverses_booking() {
        let h = harness();
        seed(&h, "SB10004", AccountType::SB, 0).await;
        let tx = h
            .engine
            .record(&request("SB10004", TransactionType::Deposit, 300), None)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(1));
        let archived = h.engine.archive(&tx.receipt_no).await.unwrap();
        assert!(archived.is_archived());

        let acct = account(&h, "SB10004").await;
        assert_eq!(acct.balance, Decimal::ZERO);
        assert!(acct.recent_transactions.latest().unwrap().is_archived());

        let summary: DailySummary = fetch(h.store.as_ref(), &keys::daily_summary(tx.effective_date))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.income, Decimal::ZERO);

        let stats = h.engine.stats();
        assert_eq!(
            stats.total(&StatKey::GlobalBalance(AccountType::SB)).await.unwrap(),
            Decimal::ZERO
        );

        let again = h.engine.archive(&tx.receipt_no).await;
        assert!(matches!(again, Err(Error::AlreadyArchived(_))));
        assert_eq!(account(&h, "SB10004").await.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_balance_overflow_rejected() {
        let h = harness();
        seed(&h, "SB10007", AccountType::SB, 0).await;
        let mut req = request("SB10007", TransactionType::Deposit, 1);
        req.amount = Decimal::MAX;

        h.engine.record(&req, None).await.unwrap();
        let result = h.engine.record(&req, None).await;
        assert!(matches!(result, Err(Error::InvalidAmount(_))));

        let acct = account(&h, "SB10007").await;
        assert_eq!(acct.balance, Decimal::MAX);
        assert_eq!(acct.recent_transactions.len(), 1);
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_archive_guard_rejects_concurrent_archival() {
        let h = harness();
        seed(&h, "SB10008", AccountType::SB, 0).await;
        let tx = h
            .engine
            .record(&request("SB10008", TransactionType::Deposit, 400), None)
            .await
            .unwrap();

        // Another archival already claimed the receipt but has not marked it yet
        let guard = keys::reservation(ARCHIVE_NAMESPACE, &tx.receipt_no);
        assert!(create_if_absent(h.store.as_ref(), &guard, json!({ "archived_at": 0 }))
            .await
            .unwrap());

        let result = h.engine.archive(&tx.receipt_no).await;
        assert!(matches!(result, Err(Error::AlreadyArchived(_))));

        let acct = account(&h, "SB10008").await;
        assert_eq!(acct.balance, Decimal::from(400));
        let stored: Transaction = fetch(h.store.as_ref(), &keys::transaction(&tx.receipt_no))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_archived());
    }

    #[tokio::test]
    async fn test_parallel_archivals_reverse_once() {
        let h = harness();
        seed(&h, "SB10009", AccountType::SB, 0).await;
        let tx = h
            .engine
            .record(&request("SB10009", TransactionType::Deposit, 250), None)
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            h.engine.archive(&tx.receipt_no),
            h.engine.archive(&tx.receipt_no)
        );
        let succeeded = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(succeeded, 1);
        assert!(matches!(
            (first, second),
            (Ok(_), Err(Error::AlreadyArchived(_))) | (Err(Error::AlreadyArchived(_)), Ok(_))
        ));

        assert_eq!(account(&h, "SB10009").await.balance, Decimal::ZERO);
        assert_eq!(
            h.engine
                .stats()
                .total(&StatKey::GlobalBalance(AccountType::SB))
                .await
                .unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_archive_unknown_receipt() {
        let h = harness();
        let result = h.engine.archive("TX000000").await;
        assert!(matches!(result, Err(Error::TransactionNotFound(_))));
    }
}
