use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Outbound mail categories this service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MailKind {
    VendorQuoteRequest,
    QuoteStatusChanged,
    QuoteCompleted,
    QuoteCancelled,
    OrderCreated,
    OrderDelivered,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Delivery collaborator. Implementations are invoked fire-and-forget:
/// callers log failures and keep going, one recipient at a time.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, kind: MailKind, to: &str, payload: Value) -> Result<(), MailerError>;
}

/// Default mailer that records the message instead of delivering it.
/// Production wires a real transport behind the same trait.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, kind: MailKind, to: &str, payload: Value) -> Result<(), MailerError> {
        info!(kind = %kind, to = %to, payload = %payload, "Mail dispatched");
        Ok(())
    }
}
