//! HTTP handlers, one module per upstream

pub mod circle;
pub mod gocardless;
pub mod system;

pub use circle::circle_webhook;
#[cfg(feature = "mock-api")]
pub use circle::simulate_wire_payment;
pub use gocardless::{checkout, gocardless_webhook};
pub use system::{health_check, welcome};
