use std::sync::Arc;

use tracing::{debug, info, warn};

use super::accumulator::BatchAccumulator;
use super::circle::{CircleNotification, CircleWebhook};
use super::error::WebhookError;
use super::events::{EventKind, GoCardlessWebhook};
use crate::correlation::CorrelationStore;
use crate::money::MinorUnits;
use crate::providers::gocardless::METADATA_CORRELATION_ID;
use crate::providers::{CollectionProvider, Payment};
use crate::settlement::SettlementCoordinator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingOutcome {
    pub correlation_id: String,
    pub borrower: String,
    pub amount: MinorUnits,
    pub tx_id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub settled_payments: usize,
    pub scheduled: usize,
    /// Instalment schedules closed by the provider; their correlations are released
    pub closed_schedules: usize,
    pub ignored: usize,
    pub fundings: Vec<FundingOutcome>,
    /// Batch keys skipped because their funding already executed
    pub replayed_fundings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepaymentOutcome {
    Settled { tx_id: String },
    Ignored,
}

pub struct WebhookProcessor {
    collection: Arc<dyn CollectionProvider>,
    coordinator: Arc<SettlementCoordinator>,
    correlations: Arc<CorrelationStore>,
}

impl WebhookProcessor {
    pub fn new(
        collection: Arc<dyn CollectionProvider>,
        coordinator: Arc<SettlementCoordinator>,
        correlations: Arc<CorrelationStore>,
    ) -> Self {
        Self {
            collection,
            coordinator,
            correlations,
        }
    }

    pub fn coordinator(&self) -> &SettlementCoordinator {
        &self.coordinator
    }

    /// Process one GoCardless delivery in order. The first failing event aborts
    /// the rest; side effects of earlier events stay (they are ledger-gated and
    /// replay as no-ops on redelivery).
    pub async fn process_batch(
        &self,
        webhook: &GoCardlessWebhook,
    ) -> Result<BatchSummary, WebhookError> {
        let mut accumulator = BatchAccumulator::new();
        let mut summary = BatchSummary::default();
        let mut closed_correlations = Vec::new();

        for event in &webhook.events {
            match event.classify()? {
                EventKind::PaymentPaidOut { payment_id } => {
                    let payment = self.collection.get_payment(payment_id).await?;
                    let correlation_id = self.correlation_key(&payment).await?;
                    info!(
                        event_id = %event.id,
                        payment_id = payment_id,
                        amount = payment.amount,
                        currency = %payment.currency,
                        correlation_id = correlation_id.as_deref().unwrap_or(""),
                        "Payment paid out"
                    );
                    accumulator.add(correlation_id, &event.id, payment.amount)?;
                    self.coordinator
                        .settle_bank_funds(&event.id, payment.amount, &payment.currency)
                        .await?;
                    summary.settled_payments += 1;
                }
                EventKind::InstalmentScheduleCreated { schedule_id } => {
                    let schedule = self.collection.get_instalment_schedule(schedule_id).await?;
                    let first_payment = schedule
                        .links
                        .payments
                        .first()
                        .ok_or_else(|| WebhookError::EmptySchedule(schedule.id.clone()))?;
                    let payment = self.collection.get_payment(first_payment).await?;
                    let correlation_id = schedule
                        .metadata
                        .get(METADATA_CORRELATION_ID)
                        .or_else(|| payment.metadata.get(METADATA_CORRELATION_ID))
                        .cloned();
                    info!(
                        event_id = %event.id,
                        schedule_id = schedule_id,
                        instalment = payment.amount,
                        correlation_id = correlation_id.as_deref().unwrap_or(""),
                        "Instalment schedule created"
                    );
                    accumulator.add(correlation_id, &event.id, payment.amount)?;
                    summary.scheduled += 1;
                }
                EventKind::InstalmentScheduleClosed { schedule_id } => {
                    let schedule = self.collection.get_instalment_schedule(schedule_id).await?;
                    info!(
                        event_id = %event.id,
                        schedule_id = schedule_id,
                        action = %event.action,
                        "Instalment schedule closed"
                    );
                    if let Some(correlation_id) = schedule.metadata.get(METADATA_CORRELATION_ID) {
                        closed_correlations.push(correlation_id.clone());
                    }
                    summary.closed_schedules += 1;
                }
                EventKind::Ignored => {
                    debug!(
                        event_id = %event.id,
                        resource_type = %event.resource_type,
                        action = %event.action,
                        "Event ignored"
                    );
                    summary.ignored += 1;
                }
            }
        }

        self.fund_accumulated(accumulator, &mut summary).await?;

        // Released only after this batch's own instalments were funded
        for correlation_id in closed_correlations {
            if let Some(borrower) = self.correlations.complete(&correlation_id) {
                info!(correlation_id = %correlation_id, borrower = %borrower, "Funding request closed");
            }
        }
        Ok(summary)
    }

    /// One funding call per accumulated correlation key. Every key is resolved
    /// before the first call, so an unresolvable key means no call at all.
    async fn fund_accumulated(
        &self,
        accumulator: BatchAccumulator,
        summary: &mut BatchSummary,
    ) -> Result<(), WebhookError> {
        let mut planned = Vec::new();
        for entry in accumulator.into_entries() {
            let batch_key = entry.batch_key();
            if self.coordinator.is_funded(&batch_key).await? {
                info!(batch_key = %batch_key, "Batch already funded, skipping");
                summary.replayed_fundings += 1;
                continue;
            }
            let resolved = entry
                .correlation_id
                .as_deref()
                .and_then(|id| self.correlations.resolve(id).ok());
            let (Some(correlation_id), Some(borrower)) = (entry.correlation_id.clone(), resolved)
            else {
                warn!(
                    correlation_id = entry.correlation_id.as_deref().unwrap_or(""),
                    events = %entry.event_ids.join(","),
                    amount = entry.total,
                    "No borrower for accumulated instalments"
                );
                return Err(WebhookError::CorrelationMissing {
                    correlation_id: entry.correlation_id,
                    event_ids: entry.event_ids,
                });
            };
            planned.push((correlation_id, borrower, batch_key, entry.total));
        }

        for (correlation_id, borrower, batch_key, amount) in planned {
            let tx_id = self
                .coordinator
                .request_funding(&batch_key, &borrower, amount)
                .await?;
            info!(
                correlation_id = %correlation_id,
                borrower = %borrower,
                amount = amount,
                tx_id = %tx_id,
                "Funding requested"
            );
            summary.fundings.push(FundingOutcome {
                correlation_id,
                borrower,
                amount,
                tx_id,
            });
        }
        Ok(())
    }

    /// Payment metadata first, then the metadata of the schedule it belongs to.
    async fn correlation_key(&self, payment: &Payment) -> Result<Option<String>, WebhookError> {
        if let Some(id) = payment.metadata.get(METADATA_CORRELATION_ID) {
            return Ok(Some(id.clone()));
        }
        let Some(schedule_id) = payment.links.instalment_schedule.as_deref() else {
            return Ok(None);
        };
        let schedule = self.collection.get_instalment_schedule(schedule_id).await?;
        Ok(schedule.metadata.get(METADATA_CORRELATION_ID).cloned())
    }

    /// Completed inbound transfers to the operating wallet repay the sender's
    /// loan. Transfers from anyone but a known borrower, such as this service's
    /// own custodial payouts, move nothing on-chain.
    pub async fn process_circle(
        &self,
        webhook: &CircleWebhook,
    ) -> Result<RepaymentOutcome, WebhookError> {
        match webhook.classify()? {
            CircleNotification::InboundComplete(tx) => {
                let borrower = tx
                    .source_address
                    .clone()
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        WebhookError::Malformed(format!("inbound {} has no sourceAddress", tx.id))
                    })?;
                if !self.correlations.is_known_borrower(&borrower) {
                    info!(
                        notification_id = %tx.id,
                        source_address = %borrower,
                        "Inbound transfer not from a borrower, no repayment"
                    );
                    return Ok(RepaymentOutcome::Ignored);
                }
                let amount = tx.amount()?;
                info!(
                    notification_id = %tx.id,
                    borrower = %borrower,
                    amount = amount,
                    "Inbound transfer complete"
                );
                let tx_id = self
                    .coordinator
                    .settle_repayment(&tx.id, &borrower, amount)
                    .await?;
                Ok(RepaymentOutcome::Settled { tx_id })
            }
            CircleNotification::InboundPending { id, state } => {
                debug!(notification_id = %id, state = %state, "Inbound transfer not complete yet");
                Ok(RepaymentOutcome::Ignored)
            }
            CircleNotification::Other(kind) => {
                debug!(notification_type = %kind, "Notification ignored");
                Ok(RepaymentOutcome::Ignored)
            }
        }
    }
}
