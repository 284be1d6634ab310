use thiserror::Error;

use super::ledger::LedgerError;
use super::step::SettlementStep;
use crate::money::MoneyError;
use crate::providers::ProviderError;

/// Settlement failures. Each aborts the current attempt; nothing is rolled back.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Wire deposit failed: {0}")]
    WireDeposit(#[source] ProviderError),

    #[error("Deposit of {amount} {currency} not acknowledged after {attempts} polls")]
    DepositTimeout {
        amount: String,
        currency: String,
        attempts: u32,
    },

    #[error("Recipient transfer failed: {0}")]
    RecipientTransfer(#[source] ProviderError),

    #[error("Contract execution failed: {0}")]
    ContractExecution(#[source] ProviderError),

    /// Another delivery holds the ledger claim for this step.
    #[error("{step} for {source_event_id} is already in flight")]
    InFlight {
        source_event_id: String,
        step: SettlementStep,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),
}

impl SettlementError {
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::WireDeposit(_) => "WIRE_DEPOSIT_FAILED",
            SettlementError::DepositTimeout { .. } => "DEPOSIT_TIMEOUT",
            SettlementError::RecipientTransfer(_) => "RECIPIENT_TRANSFER_FAILED",
            SettlementError::ContractExecution(_) => "CONTRACT_EXECUTION_FAILED",
            SettlementError::InFlight { .. } => "SETTLEMENT_IN_FLIGHT",
            SettlementError::Ledger(_) => "LEDGER_ERROR",
            SettlementError::Money(_) => "INVALID_AMOUNT",
        }
    }
}
