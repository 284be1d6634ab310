use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::{error, info};

use super::super::state::AppState;
use super::super::types::{ErrorResponse, GatewayError, SuccessResponse};
use crate::webhook::{CircleWebhook, RepaymentOutcome};

/// Circle notification delivery
///
/// Only completed inbound transfers act: they repay the sender's loan.
#[utoipa::path(
    post,
    path = "/circle/webhook",
    request_body = CircleWebhook,
    responses(
        (status = 200, description = "Notification handled", body = SuccessResponse),
        (status = 500, description = "Repayment failed", body = ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn circle_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<CircleWebhook>,
) -> Result<Json<SuccessResponse>, GatewayError> {
    let notification_type = webhook.notification_type.clone();
    // Detached so a dropped connection cannot stop a step between claim and completion
    let processor = Arc::clone(&state.processor);
    let outcome = tokio::spawn(async move { processor.process_circle(&webhook).await }).await;

    match outcome {
        Ok(Ok(RepaymentOutcome::Settled { tx_id })) => {
            info!(tx_id = %tx_id, "Repayment settled");
            Ok(Json(SuccessResponse { success: true }))
        }
        Ok(Ok(RepaymentOutcome::Ignored)) => Ok(Json(SuccessResponse { success: true })),
        Ok(Err(e)) => {
            error!(
                code = e.code(),
                notification_type = %notification_type,
                "Circle notification failed: {}",
                e
            );
            Err(GatewayError::Internal("Failed to process notification"))
        }
        Err(join_err) => {
            error!(
                notification_type = %notification_type,
                "Circle notification task aborted: {}",
                join_err
            );
            Err(GatewayError::Internal("Failed to process notification"))
        }
    }
}

/// Submit a simulated inbound wire to the business account
///
/// Sandbox helper; compiled only with the `mock-api` feature.
#[cfg(feature = "mock-api")]
#[utoipa::path(
    post,
    path = "/circle/wire/payment",
    request_body = super::super::types::WirePaymentRequest,
    responses(
        (status = 200, description = "Wire submitted", body = super::super::types::Ack),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 500, description = "Custodial provider failure", body = ErrorResponse)
    ),
    tag = "Sandbox"
)]
pub async fn simulate_wire_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<super::super::types::WirePaymentRequest>,
) -> Result<Json<super::super::types::Ack>, GatewayError> {
    let amount = crate::money::to_minor_units(req.amount)
        .map_err(|e| GatewayError::BadRequest(e.to_string()))?;
    let currency = req.currency.trim().to_uppercase();
    match state.coordinator().simulate_wire(amount, &currency).await {
        Ok(tracking_ref) => {
            info!(tracking_ref = %tracking_ref, amount = amount, "Sandbox wire submitted");
            Ok(Json(super::super::types::Ack::default()))
        }
        Err(e) => {
            error!(code = e.code(), amount = amount, "Sandbox wire failed: {}", e);
            Err(GatewayError::Internal("Failed to submit wire payment"))
        }
    }
}
