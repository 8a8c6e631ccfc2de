//! Customer and account onboarding

use crate::engine::{non_empty_or, LedgerEngine};
use crate::store::{keys, to_document, WriteBatch};
use crate::types::{
    Account, AccountType, CreateCustomerRequest, Customer, OpenAccountRequest, RecentTransactions,
};
use crate::{Error, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

impl LedgerEngine {
    /// Register a customer, optionally opening a first account in the same
    /// commit.
    pub async fn create_customer(
        &self,
        req: &CreateCustomerRequest,
    ) -> Result<(Customer, Option<Account>)> {
        if req.name.trim().is_empty() {
            return Err(Error::InvalidRequest("customer name is required".into()));
        }
        if req.phone_number.trim().is_empty() {
            return Err(Error::InvalidRequest("customer phone number is required".into()));
        }
        if let Some(account_type) = req.account_type {
            check_target(account_type, req.target)?;
        }

        let now = self.clock().now().timestamp();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: req.name.trim().to_string(),
            short_name: req.short_name.clone(),
            email: req.email.clone(),
            phone_number: req.phone_number.trim().to_string(),
            address: req.address.clone(),
            sales_rep_id: req.sales_rep_id.clone(),
            sales_rep: req.sales_rep.clone(),
            branch_id: req.branch_id.clone(),
            branch: req.branch.clone(),
            created_at: now,
            updated_at: now,
            archived_at: None,
        };

        let mut batch = WriteBatch::new();
        batch.create(keys::customer(&customer.id), to_document(&customer)?);

        let account = match req.account_type {
            Some(account_type) => {
                let open = OpenAccountRequest {
                    customer_id: customer.id.clone(),
                    account_type,
                    target: req.target,
                    target_info: req.target_info.clone(),
                    sales_rep_id: req.sales_rep_id.clone(),
                    sales_rep: req.sales_rep.clone(),
                    branch_id: req.branch_id.clone(),
                    branch: req.branch.clone(),
                };
                let account = self.new_account(&customer, &open, now).await?;
                batch.create(keys::account(&account.number), to_document(&account)?);
                Some(account)
            }
            None => None,
        };

        self.commit(batch, "create_customer").await?;
        tracing::info!(
            customer = %customer.id,
            account = ?account.as_ref().map(|a| a.number.as_str()),
            "Customer created"
        );
        Ok((customer, account))
    }

    /// Open an account for an existing customer
    pub async fn open_account(&self, req: &OpenAccountRequest) -> Result<Account> {
        check_target(req.account_type, req.target)?;
        let customer = self.load_customer(&req.customer_id).await?;

        let now = self.clock().now().timestamp();
        let account = self.new_account(&customer, req, now).await?;

        let mut batch = WriteBatch::new();
        batch.create(keys::account(&account.number), to_document(&account)?);
        self.commit(batch, "open_account").await?;

        tracing::info!(
            account = %account.number,
            customer = %customer.id,
            account_type = %account.account_type,
            "Account opened"
        );
        Ok(account)
    }

    async fn new_account(&self, customer: &Customer, req: &OpenAccountRequest, now: i64) -> Result<Account> {
        let number = self.ids().account_number(req.account_type).await?;
        Ok(Account {
            number,
            customer_id: customer.id.clone(),
            customer: customer.name.clone(),
            account_type: req.account_type,
            balance: Decimal::ZERO,
            target: match req.account_type {
                AccountType::DS => req.target,
                AccountType::SB => Decimal::ZERO,
            },
            target_info: req.target_info.clone(),
            sales_rep_id: non_empty_or(&req.sales_rep_id, &customer.sales_rep_id),
            sales_rep: non_empty_or(&req.sales_rep, &customer.sales_rep),
            branch_id: non_empty_or(&req.branch_id, &customer.branch_id),
            branch: non_empty_or(&req.branch, &customer.branch),
            last_payment_date: 0,
            last_commission_date: 0,
            recent_transactions: RecentTransactions::new(),
            created_at: now,
            updated_at: now,
            archived_at: None,
        })
    }
}

fn check_target(account_type: AccountType, target: Decimal) -> Result<()> {
    if account_type == AccountType::DS && target <= Decimal::ZERO {
        return Err(Error::InvalidAmount(
            "DS accounts need a positive daily target".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::harness;
    use crate::store::{DocumentStore, Query};

    fn customer_request(account_type: Option<AccountType>, target: i64) -> CreateCustomerRequest {
        CreateCustomerRequest {
            name: "Chinedu Eze".into(),
            phone_number: "+2348000000002".into(),
            sales_rep_id: "rep-2".into(),
            sales_rep: "Tola".into(),
            account_type,
            target: Decimal::from(target),
            ..CreateCustomerRequest::default()
        }
    }

    #[tokio::test]
    async fn test_create_customer_with_first_account() {
        let h = harness();
        let (customer, account) = h
            .engine
            .create_customer(&customer_request(Some(AccountType::DS), 500))
            .await
            .unwrap();

        let account = account.unwrap();
        assert!(account.number.starts_with("DS"));
        assert_eq!(account.number.len(), 7);
        assert_eq!(account.customer_id, customer.id);
        assert_eq!(account.target, Decimal::from(500));
        assert_eq!(account.sales_rep_id, "rep-2");

        let stored = h.engine.load_account(&account.number).await.unwrap();
        assert_eq!(stored, account);
        assert_eq!(h.engine.load_customer(&customer.id).await.unwrap(), customer);
    }

    #[tokio::test]
    async fn test_create_customer_requires_name_and_phone() {
        let h = harness();
        let mut req = customer_request(None, 0);
        req.phone_number = " ".into();
        assert!(matches!(
            h.engine.create_customer(&req).await,
            Err(Error::InvalidRequest(_))
        ));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_ds_account_needs_target() {
        let h = harness();
        let result = h
            .engine
            .create_customer(&customer_request(Some(AccountType::DS), 0))
            .await;
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_open_account_for_existing_customer() {
        let h = harness();
        let (customer, _) = h
            .engine
            .create_customer(&customer_request(None, 0))
            .await
            .unwrap();

        let req = OpenAccountRequest {
            customer_id: customer.id.clone(),
            account_type: AccountType::SB,
            target: Decimal::from(900),
            target_info: String::new(),
            sales_rep_id: String::new(),
            sales_rep: String::new(),
            branch_id: String::new(),
            branch: String::new(),
        };
        let first = h.engine.open_account(&req).await.unwrap();
        let second = h.engine.open_account(&req).await.unwrap();

        assert_ne!(first.number, second.number);
        assert_eq!(first.target, Decimal::ZERO);
        assert_eq!(first.sales_rep, "Tola");

        let accounts = h
            .store
            .query(&Query::collection(keys::ACCOUNTS))
            .await
            .unwrap();
        assert_eq!(accounts.len(), 2);
    }

    #[tokio::test]
    async fn test_open_account_unknown_customer() {
        let h = harness();
        let req = OpenAccountRequest {
            customer_id: "missing".into(),
            account_type: AccountType::SB,
            target: Decimal::ZERO,
            target_info: String::new(),
            sales_rep_id: String::new(),
            sales_rep: String::new(),
            branch_id: String::new(),
            branch: String::new(),
        };
        assert!(matches!(
            h.engine.open_account(&req).await,
            Err(Error::CustomerNotFound(_))
        ));
    }
}
