//! Circle notification payloads

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::error::WebhookError;
use crate::money::{self, MinorUnits};

pub const INBOUND_TRANSACTION: &str = "transactions.inbound";
const STATE_COMPLETE: &str = "COMPLETE";

/// Envelope shared by every notification type
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CircleWebhook {
    #[schema(example = "transactions.inbound")]
    pub notification_type: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub notification: Value,
}

/// Inbound transfer to the operating wallet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundTransaction {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub amounts: Vec<String>,
    #[serde(default)]
    pub source_address: Option<String>,
}

impl InboundTransaction {
    /// Sum of the token amounts, rounded to minor units
    pub fn amount(&self) -> Result<MinorUnits, WebhookError> {
        let mut total = Decimal::ZERO;
        for raw in &self.amounts {
            let value = Decimal::from_str(raw.trim())
                .map_err(|_| WebhookError::Malformed(format!("amount {:?}", raw)))?;
            total = total
                .checked_add(value)
                .ok_or(money::MoneyError::Overflow)?;
        }
        Ok(money::to_minor_units(total)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircleNotification {
    InboundComplete(InboundTransaction),
    InboundPending { id: String, state: String },
    Other(String),
}

impl CircleWebhook {
    pub fn classify(&self) -> Result<CircleNotification, WebhookError> {
        if self.notification_type != INBOUND_TRANSACTION {
            return Ok(CircleNotification::Other(self.notification_type.clone()));
        }
        let tx: InboundTransaction = serde_json::from_value(self.notification.clone())
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;
        if tx.state == STATE_COMPLETE {
            Ok(CircleNotification::InboundComplete(tx))
        } else {
            Ok(CircleNotification::InboundPending {
                id: tx.id,
                state: tx.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inbound(state: &str, amounts: &[&str]) -> CircleWebhook {
        CircleWebhook {
            notification_type: INBOUND_TRANSACTION.to_string(),
            notification: json!({
                "id": "tx-in-1",
                "blockchain": "ETH-SEPOLIA",
                "state": state,
                "amounts": amounts,
                "sourceAddress": "0xborrower",
                "transactionType": "INBOUND",
            }),
        }
    }

    #[test]
    fn test_complete_inbound() {
        let notification = inbound("COMPLETE", &["10.5", "4.5"]).classify().unwrap();
        let CircleNotification::InboundComplete(tx) = notification else {
            panic!("expected completed inbound transaction");
        };
        assert_eq!(tx.source_address.as_deref(), Some("0xborrower"));
        assert_eq!(tx.amount().unwrap(), 1500);
    }

    #[test]
    fn test_pending_inbound_does_nothing() {
        assert!(matches!(
            inbound("CONFIRMED", &["1"]).classify().unwrap(),
            CircleNotification::InboundPending { .. }
        ));
    }

    #[test]
    fn test_other_types() {
        let webhook: CircleWebhook = serde_json::from_str(
            r#"{"notificationType":"webhooks.test","notification":{"hello":"world"}}"#,
        )
        .unwrap();
        assert_eq!(
            webhook.classify().unwrap(),
            CircleNotification::Other("webhooks.test".to_string())
        );
    }

    #[test]
    fn test_token_precision_amounts_round_to_cents() {
        let tx = InboundTransaction {
            id: "t".into(),
            state: "COMPLETE".into(),
            amounts: vec!["1.234567".into()],
            source_address: None,
        };
        assert_eq!(tx.amount().unwrap(), 123);
    }

    #[test]
    fn test_bad_amount_is_malformed() {
        let tx = InboundTransaction {
            id: "t".into(),
            state: "COMPLETE".into(),
            amounts: vec!["lots".into()],
            source_address: None,
        };
        assert!(matches!(tx.amount(), Err(WebhookError::Malformed(_))));
    }
}
