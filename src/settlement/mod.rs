//! Cross-Rail Transfer Coordinator
//!
//! Moves collected bank funds into the operating wallet and drives the loan
//! pool contract. Every side effect is gated by the transfer ledger, so a
//! redelivered webhook replays completed steps as no-ops.

pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod poll;
pub mod step;

pub use coordinator::{FUNDING_SIGNATURE, REPAYMENT_SIGNATURE, SettlementCoordinator};
pub use error::SettlementError;
pub use ledger::{Claim, InMemoryLedger, LedgerError, PgLedger, TransferLedger};
pub use poll::PollPolicy;
pub use step::SettlementStep;
