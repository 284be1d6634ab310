//! Credura - Cross-Rail Settlement Orchestrator
//!
//! Moves loan money between a bank-debit collection provider, a custodial
//! wallet provider and an on-chain loan pool.
//!
//! # Modules
//!
//! - [`provisioning`] - One-time custodial resource setup, persisted to disk
//! - [`collection`] - Instalment schedules and mandate checkout
//! - [`correlation`] - Correlation id -> borrower map with TTL eviction
//! - [`webhook`] - GoCardless and Circle event processing
//! - [`settlement`] - Ledger-gated wire, payout and contract steps
//! - [`providers`] - HTTP clients for GoCardless and Circle
//! - [`gateway`] - axum HTTP surface
//! - [`money`] / [`fee`] - Amount conversions and fee maths

// Ambient
pub mod config;
pub mod logging;

// Amounts
pub mod fee;
pub mod money;

// Providers and state
pub mod correlation;
pub mod providers;
pub mod provisioning;

// Settlement flow
pub mod collection;
pub mod settlement;
pub mod webhook;

// HTTP surface
pub mod gateway;

pub use collection::{CollectionService, Frequency, FundingRequest};
pub use correlation::CorrelationStore;
pub use money::MinorUnits;
pub use provisioning::{Provisioned, Provisioner};
pub use settlement::{SettlementCoordinator, TransferLedger};
pub use webhook::WebhookProcessor;
