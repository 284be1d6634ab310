//! Webhook Event Processor
//!
//! GoCardless deliveries are processed event by event, in order, with a
//! per-delivery accumulator that turns partial payments into one funding
//! decision per correlation key. Circle inbound-transfer notifications drive
//! loan repayments.

pub mod accumulator;
pub mod circle;
pub mod error;
pub mod events;
pub mod processor;

pub use accumulator::{AccruedEntry, BatchAccumulator};
pub use circle::{CircleNotification, CircleWebhook, InboundTransaction};
pub use error::WebhookError;
pub use events::{EventKind, GoCardlessEvent, GoCardlessWebhook};
pub use processor::{BatchSummary, FundingOutcome, RepaymentOutcome, WebhookProcessor};
