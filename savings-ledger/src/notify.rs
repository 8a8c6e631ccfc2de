//! Outbound customer notifications
//!
//! Delivery is best effort. Callers log and count failures and never let
//! them affect a committed ledger operation.

use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Message template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Template {
    /// SB deposit booked
    PaymentReceived,
    /// Withdrawal booked
    PaymentWithdrawn,
    /// DS deposit booked, one message per request
    DsReceived,
}

impl Template {
    /// Template name known to the gateway
    pub fn name(&self) -> &'static str {
        match self {
            Template::PaymentReceived => "sms/payment_received",
            Template::PaymentWithdrawn => "sms/payment_withdrawn",
            Template::DsReceived => "sms/ds_received",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values substituted into a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Customer name
    pub name: String,
    /// Amount moved
    pub amount: Decimal,
    /// Balance after the operation
    pub balance: Decimal,
    /// Effective date (epoch seconds) for DS deposits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<i64>,
}

impl NotificationData {
    /// Plain-text body for `template`
    pub fn render(&self, template: Template) -> String {
        match template {
            Template::PaymentReceived => format!(
                "Dear {}, your deposit of {} has been received. Balance: {}",
                self.name, self.amount, self.balance
            ),
            Template::PaymentWithdrawn => format!(
                "Dear {}, a withdrawal of {} has been made. Balance: {}",
                self.name, self.amount, self.balance
            ),
            Template::DsReceived => {
                let date = self
                    .effective_date
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                format!(
                    "Dear {}, your daily savings of {} up to {} has been received. Balance: {}",
                    self.name, self.amount, date, self.balance
                )
            }
        }
    }
}

/// Notification delivery
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Deliver one message to `recipient`
    async fn send(&self, recipient: &str, template: Template, data: &NotificationData) -> Result<()>;
}

/// Writes rendered messages to the tracing log
#[derive(Debug, Clone)]
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    /// Notifier signing messages as `sender`
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn send(&self, recipient: &str, template: Template, data: &NotificationData) -> Result<()> {
        if recipient.is_empty() {
            return Err(Error::Notification(format!("{}: no recipient", template)));
        }
        tracing::info!(
            from = %self.sender,
            to = %recipient,
            template = %template,
            body = %data.render(template),
            "Notification sent"
        );
        Ok(())
    }
}

/// One captured message
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    /// Recipient
    pub recipient: String,
    /// Template
    pub template: Template,
    /// Payload
    pub data: NotificationData,
}

/// Captures messages in memory, optionally failing every send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Recording, succeeding notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    /// Messages delivered with `template`
    pub fn sent_with(&self, template: Template) -> Vec<SentNotification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.template == template)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn send(&self, recipient: &str, template: Template, data: &NotificationData) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Notification(format!("{} to {} refused", template, recipient)));
        }
        self.sent.lock().push(SentNotification {
            recipient: recipient.to_string(),
            template,
            data: data.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> NotificationData {
        NotificationData {
            name: "Ada".to_string(),
            amount: Decimal::from(1000),
            balance: Decimal::from(800),
            effective_date: Some(1_709_942_400),
        }
    }

    #[test]
    fn test_template_names() {
        assert_eq!(Template::PaymentReceived.name(), "sms/payment_received");
        assert_eq!(Template::PaymentWithdrawn.name(), "sms/payment_withdrawn");
        assert_eq!(Template::DsReceived.name(), "sms/ds_received");
    }

    #[test]
    fn test_ds_render_includes_date() {
        let body = data().render(Template::DsReceived);
        assert!(body.contains("Ada"));
        assert!(body.contains("09/03/2024"));
        assert!(body.contains("800"));
    }

    #[tokio::test]
    async fn test_recording_notifier_captures_and_fails() {
        let notifier = RecordingNotifier::new();
        notifier
            .send("+2348000000000", Template::PaymentReceived, &data())
            .await
            .unwrap();

        notifier.set_failing(true);
        let result = notifier
            .send("+2348000000000", Template::PaymentWithdrawn, &data())
            .await;
        assert!(matches!(result, Err(Error::Notification(_))));

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent_with(Template::PaymentReceived).len(), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_requires_recipient() {
        let notifier = LogNotifier::new("SUREBLTD");
        assert!(notifier.send("", Template::DsReceived, &data()).await.is_err());
        assert!(notifier.send("+234", Template::DsReceived, &data()).await.is_ok());
    }
}
