//! GoCardless webhook payloads

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::WebhookError;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoCardlessWebhook {
    pub events: Vec<GoCardlessEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoCardlessEvent {
    #[schema(example = "EV123")]
    pub id: String,
    #[schema(example = "paid_out")]
    pub action: String,
    #[schema(example = "payments")]
    pub resource_type: String,
    /// Linked resource ids (`payment`, `instalment_schedule`, ...)
    #[serde(default)]
    pub links: HashMap<String, String>,
}

/// What the processor does with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind<'a> {
    PaymentPaidOut { payment_id: &'a str },
    InstalmentScheduleCreated { schedule_id: &'a str },
    /// No further instalments will be collected under this schedule
    InstalmentScheduleClosed { schedule_id: &'a str },
    Ignored,
}

impl GoCardlessEvent {
    pub fn classify(&self) -> Result<EventKind<'_>, WebhookError> {
        match (self.resource_type.as_str(), self.action.as_str()) {
            ("payments", "paid_out") => Ok(EventKind::PaymentPaidOut {
                payment_id: self.link("payment")?,
            }),
            ("instalment_schedules", "created") => Ok(EventKind::InstalmentScheduleCreated {
                schedule_id: self.link("instalment_schedule")?,
            }),
            ("instalment_schedules", "completed" | "cancelled" | "errored" | "creation_failed") => {
                Ok(EventKind::InstalmentScheduleClosed {
                    schedule_id: self.link("instalment_schedule")?,
                })
            }
            _ => Ok(EventKind::Ignored),
        }
    }

    fn link(&self, name: &'static str) -> Result<&str, WebhookError> {
        self.links
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| WebhookError::MissingLink {
                event_id: self.id.clone(),
                resource_type: self.resource_type.clone(),
                action: self.action.clone(),
                link: name,
            })
    }
}
