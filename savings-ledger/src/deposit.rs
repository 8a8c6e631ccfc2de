//! Deposit policy
//!
//! SB deposits are booked as one transaction. DS deposits must be an exact
//! multiple of the account's target and are booked as one transaction per
//! target unit, each on the next calendar day. A DS request is announced
//! with a single notification carrying the requested total.

use crate::engine::LedgerEngine;
use crate::notify::{NotificationData, Template};
use crate::types::{
    Account, AccountType, DepositRequest, RecordRequest, Transaction, PAYMENT_METHOD_BANK_DEPOSIT,
    PAYMENT_METHOD_CASH,
};
use crate::{Error, Result};
use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Splits client deposits into ledger bookings
#[derive(Debug, Clone)]
pub struct DepositPolicy {
    engine: LedgerEngine,
}

impl DepositPolicy {
    /// Policy booking through `engine`
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    /// Book a client deposit. Returns the transactions in booking order.
    pub async fn deposit(&self, req: &DepositRequest) -> Result<Vec<Transaction>> {
        if req.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "deposit must be positive, got {}",
                req.amount
            )));
        }

        let account = self.engine.load_account(&req.account_number).await?;
        match account.account_type {
            AccountType::SB => {
                let tx = self
                    .engine
                    .record(&RecordRequest::deposit(req, req.amount), None)
                    .await?;
                Ok(vec![tx])
            }
            AccountType::DS => self.deposit_daily(&account, req).await,
        }
    }

    /// Number of day units `amount` pays for on `account`
    pub fn ds_days(&self, account: &Account, amount: Decimal) -> Result<u64> {
        let target = account.target;
        if target <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "account {} has no daily target",
                account.number
            )));
        }
        if !matches!(amount.checked_rem(target), Some(rem) if rem.is_zero()) {
            return Err(Error::InvalidAmount(format!(
                "{} is not a multiple of the daily target {}",
                amount, target
            )));
        }

        let max = self.engine.policy().max_ds_days;
        let days = amount
            .checked_div(target)
            .and_then(|units| units.trunc().to_u64())
            .unwrap_or(u64::MAX);
        if days > max {
            return Err(Error::ExceedsDayLimit { days, max });
        }
        Ok(days)
    }

    async fn deposit_daily(&self, account: &Account, req: &DepositRequest) -> Result<Vec<Transaction>> {
        let days = self.ds_days(account, req.amount)?;
        let customer = self.engine.load_customer(&account.customer_id).await?;

        let mut unit = RecordRequest::deposit(req, account.target);
        if unit.payment_method != PAYMENT_METHOD_BANK_DEPOSIT {
            unit.payment_method = PAYMENT_METHOD_CASH.to_string();
        }

        let spacing = Duration::seconds(self.engine.policy().ds_unit_spacing_secs);
        let mut at = self.engine.clock().now();
        let mut booked = Vec::with_capacity(days as usize);
        for _ in 0..days {
            match self.engine.record(&unit, Some(at)).await {
                Ok(tx) => booked.push(tx),
                Err(e) => {
                    tracing::error!(
                        account = %account.number,
                        booked = booked.len(),
                        days,
                        error = %e,
                        "DS deposit interrupted"
                    );
                    return Err(e);
                }
            }
            at += spacing;
        }

        let balance = self.engine.load_account(&account.number).await?.balance;
        tracing::info!(
            account = %account.number,
            amount = %req.amount,
            days,
            balance = %balance,
            "DS deposit booked"
        );

        let data = NotificationData {
            name: customer.name.clone(),
            amount: req.amount,
            balance,
            effective_date: booked.last().map(|tx| tx.effective_date),
        };
        self.engine
            .notify(&customer, Template::DsReceived, &data)
            .await;

        Ok(booked)
    }
}
