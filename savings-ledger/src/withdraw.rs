//! Client withdrawals

use crate::engine::LedgerEngine;
use crate::types::{RecordRequest, Transaction, TransactionType, WithdrawRequest, PAYMENT_METHOD_CASH};
use crate::{Error, Result};
use rust_decimal::Decimal;

impl LedgerEngine {
    /// Book a withdrawal after checking the balance covers it.
    ///
    /// No commission logic applies to withdrawals.
    pub async fn withdraw(&self, req: &WithdrawRequest) -> Result<Transaction> {
        if req.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "withdrawal must be positive, got {}",
                req.amount
            )));
        }

        let account = self.load_account(&req.account_number).await?;
        if account.balance < req.amount {
            return Err(Error::InsufficientFunds {
                balance: account.balance,
                requested: req.amount,
            });
        }

        let payment_method = if req.payment_method.is_empty() {
            PAYMENT_METHOD_CASH.to_string()
        } else {
            req.payment_method.clone()
        };

        let record = RecordRequest {
            tx_type: TransactionType::Withdrawal,
            account_number: account.number.clone(),
            amount: req.amount,
            narration: withdrawal_narration(req, &payment_method),
            payment_method,
            sales_rep_id: req.sales_rep_id.clone(),
            sales_rep: req.sales_rep.clone(),
            customer_id: account.customer_id.clone(),
            customer_name: account.customer.clone(),
        };
        self.record(&record, None).await
    }
}

/// `"<method> - <narration>"`, plus `" - <bank> - <account>"` for non-cash payouts
pub fn withdrawal_narration(req: &WithdrawRequest, payment_method: &str) -> String {
    let mut narration = format!("{} - {}", payment_method, req.narration);
    if payment_method != PAYMENT_METHOD_CASH {
        if let (Some(bank), Some(account)) = (&req.bank, &req.bank_account_number) {
            if !bank.is_empty() && !account.is_empty() {
                narration.push_str(&format!(" - {} - {}", bank, account));
            }
        }
    }
    narration
}
