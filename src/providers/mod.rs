//! Provider Clients
//!
//! Seams to the three external rails. Every mutating call takes a
//! caller-supplied idempotency key so a replayed request takes effect at most
//! once on the provider side.

pub mod circle_mint;
pub mod circle_wallets;
pub mod error;
pub mod gocardless;
mod http;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use circle_mint::{CircleMintClient, Deposit, WireInstructions};
pub use circle_wallets::{CircleWalletsClient, ContractExecution, CreatedWallet};
pub use error::{Provider, ProviderError};
pub use gocardless::{GoCardlessClient, InstalmentSchedule, NewBillingRequest, Payment};

use async_trait::async_trait;
use uuid::Uuid;

use crate::money::MinorUnits;

/// Bank-debit collection rail
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Authoritative payment record (amount in minor units)
    async fn get_payment(&self, payment_id: &str) -> Result<Payment, ProviderError>;

    async fn get_instalment_schedule(
        &self,
        schedule_id: &str,
    ) -> Result<InstalmentSchedule, ProviderError>;

    /// Create a recurring mandate billing request; returns its id.
    /// The request's correlation id doubles as the idempotency key.
    async fn create_billing_request(
        &self,
        request: &NewBillingRequest,
    ) -> Result<String, ProviderError>;

    /// Create the hosted authorisation flow; returns the authorisation URL
    async fn create_billing_request_flow(
        &self,
        idempotency_key: Uuid,
        billing_request_id: &str,
    ) -> Result<String, ProviderError>;
}

/// Custodial business account (fiat in, stablecoin out)
#[async_trait]
pub trait CustodialProvider: Send + Sync {
    /// Register the configured bank account as the wire channel; returns its id
    async fn create_wire_channel(&self, idempotency_key: Uuid) -> Result<String, ProviderError>;

    async fn wire_instructions(&self, wire_id: &str) -> Result<WireInstructions, ProviderError>;

    /// Sandbox-only inbound wire; returns the tracking reference
    async fn simulate_wire(
        &self,
        instructions: &WireInstructions,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, ProviderError>;

    async fn list_wire_deposits(&self) -> Result<Vec<Deposit>, ProviderError>;

    /// Register a verified blockchain address as payout recipient; returns its id
    async fn create_recipient(
        &self,
        idempotency_key: Uuid,
        address: &str,
    ) -> Result<String, ProviderError>;

    /// Move funds to a payout recipient; returns the transfer id
    async fn transfer_to_recipient(
        &self,
        idempotency_key: Uuid,
        recipient_id: &str,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, ProviderError>;
}

/// Developer-controlled operating wallet
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Fresh ciphertext of the entity secret (single use on the provider side)
    async fn entity_secret_ciphertext(&self) -> Result<String, ProviderError>;

    /// Create a wallet set and one wallet inside it
    async fn create_wallet(&self, idempotency_key: Uuid) -> Result<CreatedWallet, ProviderError>;

    /// Invoke a function of the loan pool contract; returns the transaction id
    async fn execute_contract(
        &self,
        execution: &ContractExecution,
    ) -> Result<String, ProviderError>;
}
