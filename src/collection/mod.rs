//! Collection Request Builder
//!
//! Turns a borrower's funding request into an instalment schedule and a
//! hosted bank-debit authorisation flow.

pub mod error;
pub mod schedule;
pub mod service;

pub use error::CollectionError;
pub use schedule::{
    CollectionSchedule, Frequency, FundingRequest, MAX_INSTALMENTS, build_schedule, schedule_for,
};
pub use service::{Authorization, CollectionService};
