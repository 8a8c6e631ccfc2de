//! Core types for the savings ledger
//!
//! All types are designed for:
//! - Document persistence (serde, field names match stored documents)
//! - Exact arithmetic (Decimal for money)
//! - Epoch-second timestamps

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Payment method for cash collected by a representative
pub const PAYMENT_METHOD_CASH: &str = "cash";

/// Payment method for funds paid straight into the bank
pub const PAYMENT_METHOD_BANK_DEPOSIT: &str = "bank_deposit";

/// Payment method recorded on automatic fee deductions
pub const PAYMENT_METHOD_DEDUCTION: &str = "deduction";

/// Narration of the automatic DS commission withdrawal
pub const FEE_NARRATION: &str = "DS fee deduction";

/// Entries kept in [`RecentTransactions`]
pub const RECENT_TRANSACTIONS_CAPACITY: usize = 5;

/// Account product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Free-form savings
    SB,
    /// Daily savings in fixed installments
    DS,
}

impl AccountType {
    /// Code used as account number prefix and statistic key
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::SB => "SB",
            AccountType::DS => "DS",
        }
    }

    /// Parse from code
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "SB" => Some(AccountType::SB),
            "DS" => Some(AccountType::DS),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money in
    Deposit,
    /// Money out
    Withdrawal,
}

impl TransactionType {
    /// Stored name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }

    /// Effect of `amount` on a balance
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer id (UUID)
    pub id: String,
    /// Full name
    pub name: String,
    /// Short display name
    #[serde(default)]
    pub short_name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Phone number used for notifications
    pub phone_number: String,
    /// Postal address
    #[serde(default)]
    pub address: String,
    /// Representative who onboarded the customer
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Branch id
    #[serde(default)]
    pub branch_id: String,
    /// Branch name
    #[serde(default)]
    pub branch: String,
    /// Created (epoch seconds)
    pub created_at: i64,
    /// Updated (epoch seconds)
    pub updated_at: i64,
    /// Archived (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

/// Customer account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account number (type code + digits)
    pub number: String,
    /// Owning customer id
    pub customer_id: String,
    /// Owning customer name
    #[serde(default)]
    pub customer: String,
    /// Product
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Current balance
    pub balance: Decimal,
    /// DS installment size (zero for SB)
    #[serde(default)]
    pub target: Decimal,
    /// Free text describing the target
    #[serde(default)]
    pub target_info: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Branch id
    #[serde(default)]
    pub branch_id: String,
    /// Branch name
    #[serde(default)]
    pub branch: String,
    /// Effective date of the last deposit (epoch seconds)
    #[serde(default)]
    pub last_payment_date: i64,
    /// Effective date of the last commission charge (epoch seconds)
    #[serde(default)]
    pub last_commission_date: i64,
    /// Newest-first window of recent transactions
    #[serde(default)]
    pub recent_transactions: RecentTransactions,
    /// Created (epoch seconds)
    pub created_at: i64,
    /// Updated (epoch seconds)
    pub updated_at: i64,
    /// Archived (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

impl Account {
    /// True for daily savings accounts
    pub fn is_ds(&self) -> bool {
        self.account_type == AccountType::DS
    }
}

/// Ledger transaction; immutable except for archival
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique receipt number
    pub receipt_no: String,
    /// Deposit or withdrawal
    pub tx_type: TransactionType,
    /// Account the funds belong to
    pub account_number: String,
    /// Customer id
    #[serde(default)]
    pub customer_id: String,
    /// Customer name
    #[serde(default)]
    pub customer_name: String,
    /// Amount, always positive
    pub amount: Decimal,
    /// Free text
    #[serde(default)]
    pub narration: String,
    /// cash, bank_deposit, ...
    #[serde(default)]
    pub payment_method: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Calendar day the funds are attributed to (epoch seconds, midnight UTC)
    pub effective_date: i64,
    /// Created (epoch seconds)
    pub created_at: i64,
    /// Updated (epoch seconds)
    pub updated_at: i64,
    /// Archived (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

impl Transaction {
    /// Effect on the account balance
    pub fn signed_amount(&self) -> Decimal {
        self.tx_type.signed(self.amount)
    }

    /// True once soft-deleted
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// One DS commission charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsCommission {
    /// Commission id (UUID)
    pub id: String,
    /// Charged account
    pub account_number: String,
    /// Customer id
    pub customer_id: String,
    /// Customer name
    #[serde(default)]
    pub customer_name: String,
    /// One target unit
    pub amount: Decimal,
    /// When charged (epoch seconds)
    pub date: i64,
    /// Effective date of the triggering deposit
    pub effective_date: i64,
}

/// Running totals of one calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Deposits
    #[serde(default)]
    pub income: Decimal,
    /// Withdrawals
    #[serde(default)]
    pub expenditure: Decimal,
    /// Deposits paid by bank deposit
    #[serde(default)]
    pub bank_deposit: Decimal,
    /// Day (epoch seconds, midnight UTC)
    #[serde(default)]
    pub date: i64,
}

/// Fixed-capacity, newest-first window of transactions
///
/// Pushing onto a full window evicts the oldest entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Transaction>", into = "Vec<Transaction>")]
pub struct RecentTransactions {
    entries: VecDeque<Transaction>,
}

impl RecentTransactions {
    /// Empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert as newest, evicting the oldest when full
    pub fn push(&mut self, tx: Transaction) {
        if self.entries.len() >= RECENT_TRANSACTIONS_CAPACITY {
            self.entries.pop_back();
        }
        self.entries.push_front(tx);
    }

    /// Newest entry
    pub fn latest(&self) -> Option<&Transaction> {
        self.entries.front()
    }

    /// Newest entry that has not been archived
    pub fn latest_active(&self) -> Option<&Transaction> {
        self.entries.iter().find(|tx| !tx.is_archived())
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stamp the archival time on an entry, if it is still in the window
    pub fn mark_archived(&mut self, receipt_no: &str, archived_at: i64) -> bool {
        match self.entries.iter_mut().find(|tx| tx.receipt_no == receipt_no) {
            Some(tx) => {
                tx.archived_at = Some(archived_at);
                tx.updated_at = archived_at;
                true
            }
            None => false,
        }
    }
}

impl From<Vec<Transaction>> for RecentTransactions {
    fn from(mut entries: Vec<Transaction>) -> Self {
        entries.truncate(RECENT_TRANSACTIONS_CAPACITY);
        Self {
            entries: entries.into(),
        }
    }
}

impl From<RecentTransactions> for Vec<Transaction> {
    fn from(recent: RecentTransactions) -> Self {
        recent.entries.into()
    }
}

/// Client deposit request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Target account
    pub account_number: String,
    /// Total amount
    pub amount: Decimal,
    /// cash or bank_deposit
    #[serde(default)]
    pub payment_method: String,
    /// Free text
    #[serde(default)]
    pub narration: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Customer id (defaults to the account owner)
    #[serde(default)]
    pub customer_id: String,
    /// Customer name (defaults to the account owner)
    #[serde(default)]
    pub customer_name: String,
}

/// Client withdrawal request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// Source account
    pub account_number: String,
    /// Amount
    pub amount: Decimal,
    /// cash, Transfer, ...
    pub payment_method: String,
    /// Destination bank for non-cash payouts
    #[serde(default)]
    pub bank: Option<String>,
    /// Destination bank account for non-cash payouts
    #[serde(default)]
    pub bank_account_number: Option<String>,
    /// Free text
    #[serde(default)]
    pub narration: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
}

/// Input of one ledger booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    /// Deposit or withdrawal
    pub tx_type: TransactionType,
    /// Account
    pub account_number: String,
    /// Amount, positive
    pub amount: Decimal,
    /// Free text
    pub narration: String,
    /// Payment method
    pub payment_method: String,
    /// Representative id
    pub sales_rep_id: String,
    /// Representative name
    pub sales_rep: String,
    /// Customer id (empty: account owner)
    pub customer_id: String,
    /// Customer name (empty: account owner)
    pub customer_name: String,
}

impl RecordRequest {
    /// Booking for one deposit request, with the amount overridden
    pub fn deposit(req: &DepositRequest, amount: Decimal) -> Self {
        Self {
            tx_type: TransactionType::Deposit,
            account_number: req.account_number.clone(),
            amount,
            narration: req.narration.clone(),
            payment_method: req.payment_method.clone(),
            sales_rep_id: req.sales_rep_id.clone(),
            sales_rep: req.sales_rep.clone(),
            customer_id: req.customer_id.clone(),
            customer_name: req.customer_name.clone(),
        }
    }
}

/// Onboarding request for a customer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Full name
    pub name: String,
    /// Short display name
    #[serde(default)]
    pub short_name: String,
    /// Email
    #[serde(default)]
    pub email: String,
    /// Phone number
    pub phone_number: String,
    /// Address
    #[serde(default)]
    pub address: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Branch id
    #[serde(default)]
    pub branch_id: String,
    /// Branch name
    #[serde(default)]
    pub branch: String,
    /// Open a first account of this type
    #[serde(default)]
    pub account_type: Option<AccountType>,
    /// DS installment of the first account
    #[serde(default)]
    pub target: Decimal,
    /// Target description of the first account
    #[serde(default)]
    pub target_info: String,
}

/// Request to open an account for an existing customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    /// Owning customer
    pub customer_id: String,
    /// Product
    pub account_type: AccountType,
    /// DS installment size
    #[serde(default)]
    pub target: Decimal,
    /// Target description
    #[serde(default)]
    pub target_info: String,
    /// Representative id
    #[serde(default)]
    pub sales_rep_id: String,
    /// Representative name
    #[serde(default)]
    pub sales_rep: String,
    /// Branch id
    #[serde(default)]
    pub branch_id: String,
    /// Branch name
    #[serde(default)]
    pub branch: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(receipt: &str) -> Transaction {
        Transaction {
            receipt_no: receipt.to_string(),
            tx_type: TransactionType::Deposit,
            account_number: "DS12345".to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Ada".to_string(),
            amount: Decimal::from(200),
            narration: String::new(),
            payment_method: PAYMENT_METHOD_CASH.to_string(),
            sales_rep_id: "rep1".to_string(),
            sales_rep: "Bola".to_string(),
            effective_date: 0,
            created_at: 0,
            updated_at: 0,
            archived_at: None,
        }
    }

    #[test]
    fn test_recent_window_evicts_oldest() {
        let mut recent = RecentTransactions::new();
        for i in 0..8 {
            recent.push(tx(&format!("TX{}", i)));
        }

        assert_eq!(recent.len(), RECENT_TRANSACTIONS_CAPACITY);
        let receipts: Vec<&str> = recent.iter().map(|t| t.receipt_no.as_str()).collect();
        assert_eq!(receipts, vec!["TX7", "TX6", "TX5", "TX4", "TX3"]);
        assert_eq!(recent.latest().unwrap().receipt_no, "TX7");
    }

    #[test]
    fn test_recent_window_serializes_as_list() {
        let mut recent = RecentTransactions::new();
        recent.push(tx("TX1"));
        recent.push(tx("TX2"));

        let value = serde_json::to_value(&recent).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["receipt_no"], "TX2");

        let back: RecentTransactions = serde_json::from_value(value).unwrap();
        assert_eq!(back, recent);
    }

    #[test]
    fn test_oversized_stored_window_is_truncated() {
        let stored: Vec<Transaction> = (0..7).map(|i| tx(&format!("TX{}", i))).collect();
        let recent = RecentTransactions::from(stored);
        assert_eq!(recent.len(), RECENT_TRANSACTIONS_CAPACITY);
        assert_eq!(recent.latest().unwrap().receipt_no, "TX0");
    }

    #[test]
    fn test_signed_amount() {
        let mut t = tx("TX1");
        assert_eq!(t.signed_amount(), Decimal::from(200));
        t.tx_type = TransactionType::Withdrawal;
        assert_eq!(t.signed_amount(), Decimal::from(-200));
    }

    #[test]
    fn test_account_type_codes() {
        assert_eq!(AccountType::from_code("DS"), Some(AccountType::DS));
        assert_eq!(AccountType::from_code("XX"), None);
        assert_eq!(
            serde_json::to_value(AccountType::SB).unwrap(),
            serde_json::json!("SB")
        );
        assert_eq!(
            serde_json::to_value(TransactionType::Withdrawal).unwrap(),
            serde_json::json!("withdrawal")
        );
    }
}
