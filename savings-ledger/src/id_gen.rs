//! Human-readable unique identifiers
//!
//! Candidates are `prefix + N random digits`. A candidate is claimed by
//! creating `reservations/{namespace}/{candidate}` with create-if-absent,
//! so two concurrent callers can never walk away with the same id. The
//! number of attempts is bounded.

use crate::config::IdConfig;
use crate::random::SharedRng;
use crate::store::{create_if_absent, keys, DocumentStore};
use crate::types::AccountType;
use crate::{Error, Result};
use serde_json::json;
use std::sync::Arc;

/// Reservation namespace of receipt numbers
pub const RECEIPT_NAMESPACE: &str = "receipts";

/// Reservation namespace of account numbers
pub const ACCOUNT_NAMESPACE: &str = "accounts";

/// Identifier allocator
#[derive(Clone)]
pub struct UniqueIdGenerator {
    store: Arc<dyn DocumentStore>,
    rng: SharedRng,
    config: IdConfig,
}

impl std::fmt::Debug for UniqueIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueIdGenerator")
            .field("config", &self.config)
            .finish()
    }
}

impl UniqueIdGenerator {
    /// New generator
    pub fn new(store: Arc<dyn DocumentStore>, rng: SharedRng, config: IdConfig) -> Self {
        Self { store, rng, config }
    }

    /// Reserve an unused `prefix + digit_count digits` within `namespace`
    pub async fn generate(&self, namespace: &str, prefix: &str, digit_count: u32) -> Result<String> {
        for attempt in 1..=self.config.max_attempts {
            let candidate = format!("{}{}", prefix, self.rng.digits(digit_count));
            let path = keys::reservation(namespace, &candidate);

            if create_if_absent(self.store.as_ref(), &path, json!({ "id": candidate })).await? {
                tracing::debug!(namespace, id = %candidate, attempt, "Identifier reserved");
                return Ok(candidate);
            }

            tracing::warn!(namespace, id = %candidate, attempt, "Identifier collision");
        }

        Err(Error::IdSpaceExhausted {
            prefix: prefix.to_string(),
            attempts: self.config.max_attempts,
        })
    }

    /// Next receipt number, e.g. `TX042917`
    pub async fn receipt_number(&self) -> Result<String> {
        self.generate(
            RECEIPT_NAMESPACE,
            &self.config.receipt_prefix,
            self.config.receipt_digits,
        )
        .await
    }

    /// Next account number, e.g. `DS30571`
    pub async fn account_number(&self, account_type: AccountType) -> Result<String> {
        self.generate(
            ACCOUNT_NAMESPACE,
            account_type.code(),
            self.config.account_digits,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::collections::HashSet;

    fn generator(config: IdConfig) -> UniqueIdGenerator {
        UniqueIdGenerator::new(Arc::new(MemoryStore::new()), SharedRng::seeded(21), config)
    }

    #[tokio::test]
    async fn test_receipt_number_shape() {
        let ids = generator(IdConfig::default());
        let receipt = ids.receipt_number().await.unwrap();
        assert_eq!(receipt.len(), 8);
        assert!(receipt.starts_with("TX"));
        assert!(receipt[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_account_number_uses_type_prefix() {
        let ids = generator(IdConfig::default());
        let number = ids.account_number(AccountType::DS).await.unwrap();
        assert!(number.starts_with("DS"));
        assert_eq!(number.len(), 7);
    }

    #[tokio::test]
    async fn test_small_space_fills_without_duplicates() {
        let ids = generator(IdConfig {
            max_attempts: 10_000,
            ..IdConfig::default()
        });

        let mut seen = HashSet::new();
        for _ in 0..10 {
            let id = ids.generate("tiny", "T", 1).await.unwrap();
            assert!(seen.insert(id));
        }
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test]
    async fn test_exhausted_space_is_reported() {
        let ids = generator(IdConfig {
            max_attempts: 50,
            ..IdConfig::default()
        });

        for _ in 0..10 {
            ids.generate("tiny", "T", 1).await.unwrap_or_default();
        }
        let result = ids.generate("tiny", "T", 1).await;
        assert!(matches!(result, Err(Error::IdSpaceExhausted { attempts: 50, .. })));
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let ids = generator(IdConfig {
            max_attempts: 10_000,
            ..IdConfig::default()
        });
        for _ in 0..10 {
            ids.generate("first", "N", 1).await.unwrap();
        }
        assert!(ids.generate("second", "N", 1).await.is_ok());
    }
}
