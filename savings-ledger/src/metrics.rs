//! Metrics collection for observability
//!
//! Prometheus collectors registered on a private registry, so several
//! ledgers can live in one process.
//!
//! # Metrics
//!
//! - `savings_deposits_total` - Deposit transactions booked
//! - `savings_withdrawals_total` - Withdrawal transactions booked (fees included)
//! - `savings_archivals_total` - Transactions archived
//! - `savings_commissions_total` - DS commissions charged
//! - `savings_notification_failures_total` - Notifications that could not be sent
//! - `savings_commit_duration_seconds` - Histogram of batch commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Deposits booked
    pub deposits_total: IntCounter,

    /// Withdrawals booked
    pub withdrawals_total: IntCounter,

    /// Transactions archived
    pub archivals_total: IntCounter,

    /// Commissions charged
    pub commissions_total: IntCounter,

    /// Failed notifications
    pub notification_failures: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let deposits_total = IntCounter::new("savings_deposits_total", "Deposit transactions booked")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total = IntCounter::new(
            "savings_withdrawals_total",
            "Withdrawal transactions booked",
        )?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let archivals_total = IntCounter::new("savings_archivals_total", "Transactions archived")?;
        registry.register(Box::new(archivals_total.clone()))?;

        let commissions_total =
            IntCounter::new("savings_commissions_total", "DS commissions charged")?;
        registry.register(Box::new(commissions_total.clone()))?;

        let notification_failures = IntCounter::new(
            "savings_notification_failures_total",
            "Notifications that could not be sent",
        )?;
        registry.register(Box::new(notification_failures.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "savings_commit_duration_seconds",
                "Histogram of batch commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            deposits_total,
            withdrawals_total,
            archivals_total,
            commissions_total,
            notification_failures,
            commit_duration,
            registry,
        })
    }

    /// Record a booked deposit
    pub fn record_deposit(&self) {
        self.deposits_total.inc();
    }

    /// Record a booked withdrawal
    pub fn record_withdrawal(&self) {
        self.withdrawals_total.inc();
    }

    /// Record an archival
    pub fn record_archival(&self) {
        self.archivals_total.inc();
    }

    /// Record a commission charge
    pub fn record_commission(&self) {
        self.commissions_total.inc();
    }

    /// Record a failed notification
    pub fn record_notification_failure(&self) {
        self.notification_failures.inc();
    }

    /// Record commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("deposits_total", &self.deposits_total.get())
            .field("withdrawals_total", &self.withdrawals_total.get())
            .field("archivals_total", &self.archivals_total.get())
            .finish()
    }
}
