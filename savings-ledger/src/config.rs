//! Configuration for the savings ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Sharded counter configuration
    pub counters: CounterConfig,

    /// Deposit / commission policy
    pub ledger: LedgerPolicyConfig,

    /// Account and receipt number generation
    pub ids: IdConfig,

    /// Outbound notifications
    pub notifications: NotificationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/savings"),
            service_name: "savings-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            counters: CounterConfig::default(),
            ledger: LedgerPolicyConfig::default(),
            ids: IdConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

/// Sharded counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Shards created for each new statistic counter
    pub shard_count: usize,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self { shard_count: 10 }
    }
}

/// Deposit and commission policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPolicyConfig {
    /// Most DS days payable in one deposit
    pub max_ds_days: u64,

    /// Days between two commission charges
    pub commission_cycle_days: i64,

    /// Simulated seconds between the day-units of one DS deposit
    pub ds_unit_spacing_secs: i64,

    /// Fee transaction timestamp offset after its deposit
    pub fee_offset_secs: i64,
}

impl Default for LedgerPolicyConfig {
    fn default() -> Self {
        Self {
            max_ds_days: 50,
            commission_cycle_days: 31,
            ds_unit_spacing_secs: 4,
            fee_offset_secs: 2,
        }
    }
}

/// Identifier generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    /// Receipt number prefix
    pub receipt_prefix: String,

    /// Random digits in a receipt number
    pub receipt_digits: u32,

    /// Random digits in an account number (after the type code)
    pub account_digits: u32,

    /// Reservation attempts before giving up
    pub max_attempts: u32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            receipt_prefix: "TX".to_string(),
            receipt_digits: 6,
            account_digits: 5,
            max_attempts: 64,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Send customer notifications at all
    pub enabled: bool,

    /// Sender id shown to customers
    pub sender: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: "SUREBLTD".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML document
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("SAVINGS_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(shards) = std::env::var("SAVINGS_COUNTER_SHARDS") {
            config.counters.shard_count = shards.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid SAVINGS_COUNTER_SHARDS: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.counters.shard_count == 0 {
            return Err(crate::Error::Config("shard_count must be at least 1".into()));
        }
        if self.ledger.max_ds_days == 0 {
            return Err(crate::Error::Config("max_ds_days must be at least 1".into()));
        }
        if self.ids.receipt_digits == 0 || self.ids.account_digits == 0 {
            return Err(crate::Error::Config("id digit counts must be at least 1".into()));
        }
        if self.ids.max_attempts == 0 {
            return Err(crate::Error::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "savings-ledger");
        assert_eq!(config.counters.shard_count, 10);
        assert_eq!(config.ledger.max_ds_days, 50);
        assert_eq!(config.ledger.commission_cycle_days, 31);
        assert_eq!(config.ids.receipt_prefix, "TX");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            data_dir = "/var/lib/savings"

            [counters]
            shard_count = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/savings"));
        assert_eq!(config.counters.shard_count, 4);
        assert_eq!(config.ids.receipt_digits, 6);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let result = Config::from_toml("[counters]\nshard_count = 0\n");
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_serialized_config_lists_only_used_settings() {
        let rendered = toml::to_string(&Config::default()).unwrap();
        let parsed: toml::Table = rendered.parse().unwrap();

        let mut top: Vec<&str> = parsed.keys().map(String::as_str).collect();
        top.sort_unstable();
        assert_eq!(
            top,
            vec![
                "counters",
                "data_dir",
                "ids",
                "ledger",
                "notifications",
                "rocksdb",
                "service_name",
                "service_version",
            ]
        );
    }
}
