use thiserror::Error;

use crate::money::MoneyError;
use crate::providers::ProviderError;
use crate::settlement::SettlementError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Event {event_id} ({resource_type}/{action}) has no {link} link")]
    MissingLink {
        event_id: String,
        resource_type: String,
        action: String,
        link: &'static str,
    },

    #[error("Instalment schedule {0} has no payments")]
    EmptySchedule(String),

    /// Batch-local: no on-chain call is made for the batch.
    #[error(
        "No borrower for correlation {} (events {})",
        .correlation_id.as_deref().unwrap_or("<absent>"),
        .event_ids.join(",")
    )]
    CorrelationMissing {
        correlation_id: Option<String>,
        event_ids: Vec<String>,
    },

    #[error("Malformed notification: {0}")]
    Malformed(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),
}

impl WebhookError {
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingLink { .. } => "MISSING_LINK",
            WebhookError::EmptySchedule(_) => "EMPTY_SCHEDULE",
            WebhookError::CorrelationMissing { .. } => "CORRELATION_MISSING",
            WebhookError::Malformed(_) => "MALFORMED_NOTIFICATION",
            WebhookError::Provider(e) => e.code(),
            WebhookError::Settlement(e) => e.code(),
            WebhookError::Money(_) => "INVALID_AMOUNT",
        }
    }
}
