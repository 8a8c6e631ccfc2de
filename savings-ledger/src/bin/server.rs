//! Savings ledger server binary

use anyhow::Context;
use savings_ledger::{AccountType, Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting savings ledger server");

    // Load configuration
    let config = match std::env::var("SAVINGS_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("reading environment")?,
    };
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        data_dir = ?config.data_dir,
        shards = config.counters.shard_count,
        "Configuration loaded"
    );

    // Open ledger
    let ledger = Ledger::open(config).await.context("opening ledger")?;
    if let Some(stats) = ledger.storage_stats()? {
        tracing::info!(documents = stats.approximate_documents, "Ledger opened successfully");
    }
    for account_type in [AccountType::SB, AccountType::DS] {
        let balance = ledger.global_balance(account_type).await?;
        tracing::info!(account_type = %account_type, balance = %balance, "Global balance");
    }

    // Serve until interrupted
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down savings ledger server");
    Ok(())
}
