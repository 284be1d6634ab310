use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::SettlementError;
use super::ledger::{Claim, TransferLedger};
use super::poll::{PollOutcome, PollPolicy, poll_until};
use super::step::SettlementStep;
use crate::fee;
use crate::money::{self, MinorUnits};
use crate::providers::{ContractExecution, CustodialProvider, Deposit, WalletProvider};
use crate::provisioning::Provisioned;

pub const FUNDING_SIGNATURE: &str = "requestFundingForBorrower(address,uint256,uint256)";
pub const REPAYMENT_SIGNATURE: &str = "repayAmountForLoan(address,uint256)";

/// Namespace for deterministic idempotency keys
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_u128(0x6c1b_8f0e_3d2a_4b57_9e61_c0d4_a7f2_5e18);

/// Provider deposit timestamps come from another clock
const DEPOSIT_CLOCK_SKEW_SECS: i64 = 120;

/// Same `(source_event_id, step)` always yields the same key.
pub fn idempotency_key(source_event_id: &str, step: SettlementStep) -> Uuid {
    Uuid::new_v5(
        &IDEMPOTENCY_NAMESPACE,
        format!("{}:{}", source_event_id, step.as_str()).as_bytes(),
    )
}

/// Result of a ledger-gated step
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gate {
    Executed(String),
    AlreadyDone(String),
}

impl Gate {
    fn into_reference(self) -> String {
        match self {
            Gate::Executed(r) | Gate::AlreadyDone(r) => r,
        }
    }
}

pub struct SettlementCoordinator {
    custodial: Arc<dyn CustodialProvider>,
    wallets: Arc<dyn WalletProvider>,
    ledger: Arc<dyn TransferLedger>,
    provisioned: Arc<Provisioned>,
    poll: PollPolicy,
}

impl SettlementCoordinator {
    pub fn new(
        custodial: Arc<dyn CustodialProvider>,
        wallets: Arc<dyn WalletProvider>,
        ledger: Arc<dyn TransferLedger>,
        provisioned: Arc<Provisioned>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            custodial,
            wallets,
            ledger,
            provisioned,
            poll,
        }
    }

    pub fn provisioned(&self) -> &Provisioned {
        &self.provisioned
    }

    /// Move a collected payment into the operating wallet:
    /// wire instructions -> simulated inbound wire -> deposit acknowledged ->
    /// payout to the recipient. Returns the payout transfer id.
    pub async fn settle_bank_funds(
        &self,
        source_event_id: &str,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, SettlementError> {
        if let Some(transfer_id) = self
            .ledger
            .completed_reference(source_event_id, SettlementStep::RecipientTransfer)
            .await?
        {
            info!(
                event_id = source_event_id,
                transfer_id = %transfer_id,
                "Bank funds already settled, skipping"
            );
            return Ok(transfer_id);
        }

        let submitted_at = Utc::now();
        let wire = self
            .gated(source_event_id, SettlementStep::WireDeposit, move || async move {
                self.simulate_wire(amount, currency).await
            })
            .await?;
        // A wire submitted by an earlier delivery may predate this one
        let since = match wire {
            Gate::Executed(_) => Some(submitted_at),
            Gate::AlreadyDone(_) => None,
        };

        let deposit = self
            .await_deposit(source_event_id, amount, currency, since)
            .await?;
        info!(
            event_id = source_event_id,
            deposit_id = %deposit.id,
            amount = amount,
            "Wire deposit acknowledged"
        );

        let key = idempotency_key(source_event_id, SettlementStep::RecipientTransfer);
        let transfer = self
            .gated(
                source_event_id,
                SettlementStep::RecipientTransfer,
                move || async move {
                    self.custodial
                        .transfer_to_recipient(
                            key,
                            &self.provisioned.payout_recipient_id,
                            amount,
                            currency,
                        )
                        .await
                        .map_err(SettlementError::RecipientTransfer)
                },
            )
            .await?;

        Ok(transfer.into_reference())
    }

    /// Submit one inbound wire to the provisioned wire channel; returns the tracking ref.
    pub async fn simulate_wire(
        &self,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, SettlementError> {
        let instructions = self
            .custodial
            .wire_instructions(&self.provisioned.wire_channel_id)
            .await
            .map_err(SettlementError::WireDeposit)?;
        let tracking_ref = self
            .custodial
            .simulate_wire(&instructions, amount, currency)
            .await
            .map_err(SettlementError::WireDeposit)?;
        info!(
            tracking_ref = %tracking_ref,
            amount = %money::format_major(amount),
            currency = currency,
            "Wire submitted"
        );
        Ok(tracking_ref)
    }

    /// `requestFundingForBorrower(borrower, gross, gross + premium)` for a batch,
    /// at most once per `batch_key`. Returns the transaction id.
    pub async fn request_funding(
        &self,
        batch_key: &str,
        borrower: &str,
        amount: MinorUnits,
    ) -> Result<String, SettlementError> {
        let gross = money::to_contract_units(amount)?;
        let with_premium = fee::with_premium(gross);
        let params = vec![
            Value::String(borrower.to_string()),
            Value::String(gross.to_string()),
            Value::String(with_premium.to_string()),
        ];
        info!(
            batch_key = batch_key,
            borrower = borrower,
            gross = gross,
            with_premium = with_premium,
            "Requesting funding for borrower"
        );
        let gate = self
            .gated(batch_key, SettlementStep::FundingRequest, move || async move {
                self.execute_contract(FUNDING_SIGNATURE, params).await
            })
            .await?;
        Ok(gate.into_reference())
    }

    pub async fn is_funded(&self, batch_key: &str) -> Result<bool, SettlementError> {
        Ok(self
            .ledger
            .completed_reference(batch_key, SettlementStep::FundingRequest)
            .await?
            .is_some())
    }

    /// `repayAmountForLoan(borrower, amount)`, at most once per notification.
    pub async fn settle_repayment(
        &self,
        notification_id: &str,
        borrower: &str,
        amount: MinorUnits,
    ) -> Result<String, SettlementError> {
        let params = vec![
            Value::String(borrower.to_string()),
            Value::String(amount.to_string()),
        ];
        info!(
            notification_id = notification_id,
            borrower = borrower,
            amount = amount,
            "Settling repayment"
        );
        let gate = self
            .gated(notification_id, SettlementStep::Repayment, move || async move {
                self.execute_contract(REPAYMENT_SIGNATURE, params).await
            })
            .await?;
        Ok(gate.into_reference())
    }

    /// Invoke a pool contract function from the operating wallet.
    pub async fn execute_contract(
        &self,
        function_signature: &'static str,
        parameters: Vec<Value>,
    ) -> Result<String, SettlementError> {
        let execution = ContractExecution {
            wallet_id: self.provisioned.custodial_wallet_id.clone(),
            function_signature,
            parameters,
            idempotency_key: Uuid::new_v4(),
        };
        match self.wallets.execute_contract(&execution).await {
            Ok(tx_id) => {
                info!(
                    function = function_signature,
                    tx_id = %tx_id,
                    "Contract execution submitted"
                );
                Ok(tx_id)
            }
            Err(e) => {
                error!(
                    function = function_signature,
                    code = e.code(),
                    body = e.body().unwrap_or_default(),
                    "Contract execution failed: {}",
                    e
                );
                Err(SettlementError::ContractExecution(e))
            }
        }
    }

    /// Wait for a complete deposit matching this event's wire. A deposit is
    /// bound to exactly one event through the ledger; one already bound to
    /// another event is never accepted.
    async fn await_deposit(
        &self,
        source_event_id: &str,
        amount: MinorUnits,
        currency: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Deposit, SettlementError> {
        let threshold = since.map(|t| t - ChronoDuration::seconds(DEPOSIT_CLOCK_SKEW_SECS));
        let outcome = poll_until(&self.poll, || {
            self.match_deposit(source_event_id, amount, currency, threshold)
        })
        .await?;

        match outcome {
            PollOutcome::Ready(deposit) => Ok(deposit),
            PollOutcome::Exhausted { attempts } => {
                warn!(amount = amount, attempts = attempts, "Deposit not acknowledged in time");
                Err(SettlementError::DepositTimeout {
                    amount: money::format_major(amount),
                    currency: currency.to_string(),
                    attempts,
                })
            }
        }
    }

    /// One probe: a matching deposit this event already owns, else the first
    /// unbound one it manages to bind.
    async fn match_deposit(
        &self,
        source_event_id: &str,
        amount: MinorUnits,
        currency: &str,
        threshold: Option<DateTime<Utc>>,
    ) -> Result<Option<Deposit>, SettlementError> {
        let candidates: Vec<Deposit> = self
            .custodial
            .list_wire_deposits()
            .await
            .map_err(SettlementError::WireDeposit)?
            .into_iter()
            .filter(|d| {
                d.is_complete()
                    && d.amount == amount
                    && d.currency.eq_ignore_ascii_case(currency)
                    && threshold.is_none_or(|t| d.create_date >= t)
            })
            .collect();

        for deposit in &candidates {
            let owner = self
                .ledger
                .completed_reference(&deposit.id, SettlementStep::DepositMatch)
                .await?;
            if owner.as_deref() == Some(source_event_id) {
                return Ok(Some(deposit.clone()));
            }
        }
        for deposit in candidates {
            if self.bind_deposit(source_event_id, &deposit.id).await? {
                return Ok(Some(deposit));
            }
        }
        Ok(None)
    }

    async fn bind_deposit(
        &self,
        source_event_id: &str,
        deposit_id: &str,
    ) -> Result<bool, SettlementError> {
        match self.ledger.claim(deposit_id, SettlementStep::DepositMatch).await? {
            Claim::Acquired => {
                self.ledger
                    .complete(deposit_id, SettlementStep::DepositMatch, source_event_id)
                    .await?;
                Ok(true)
            }
            Claim::Completed(owner) => Ok(owner == source_event_id),
            Claim::InFlight => Ok(false),
        }
    }

    /// Claim `(key, step)`, run `call` only if this caller owns the claim,
    /// then record the outcome.
    async fn gated<F, Fut>(
        &self,
        key: &str,
        step: SettlementStep,
        call: F,
    ) -> Result<Gate, SettlementError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, SettlementError>>,
    {
        match self.ledger.claim(key, step).await? {
            Claim::Completed(reference) => {
                info!(event_id = key, step = %step, reference = %reference, "Step already completed");
                Ok(Gate::AlreadyDone(reference))
            }
            Claim::InFlight => {
                warn!(event_id = key, step = %step, "Step in flight elsewhere");
                Err(SettlementError::InFlight {
                    source_event_id: key.to_string(),
                    step,
                })
            }
            Claim::Acquired => match call().await {
                Ok(reference) => {
                    self.ledger.complete(key, step, &reference).await?;
                    Ok(Gate::Executed(reference))
                }
                Err(e) => {
                    if let Err(ledger_err) = self.ledger.abandon(key, step).await {
                        error!(
                            event_id = key,
                            step = %step,
                            "Failed to release ledger claim: {}",
                            ledger_err
                        );
                    }
                    Err(e)
                }
            },
        }
    }
}
