//! Resource Provisioner
//!
//! Creates the custodial resources the settlement path depends on (wire
//! channel, operating wallet, payout recipient) exactly once and persists
//! their ids. Request handlers only ever see the immutable `Provisioned`
//! snapshot taken at startup.

pub mod error;
pub mod provisioner;
pub mod state;
pub mod store;

pub use error::ProvisioningError;
pub use provisioner::Provisioner;
pub use state::{Provisioned, ProvisionedResources};
pub use store::StateStore;
