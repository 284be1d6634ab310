use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::{error, info, warn};

use super::super::state::AppState;
use super::super::types::{Ack, CheckoutRequest, CheckoutResponse, ErrorResponse, GatewayError};
use crate::collection::{CollectionError, FundingRequest};
use crate::webhook::{GoCardlessWebhook, WebhookError};

/// Start a loan checkout
///
/// Builds the instalment schedule (collection surcharge included), creates the
/// recurring mandate and returns the hosted authorisation page.
#[utoipa::path(
    post,
    path = "/gocardless/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Authorisation flow created", body = CheckoutResponse),
        (status = 400, description = "Invalid order", body = ErrorResponse),
        (status = 500, description = "Collection provider failure", body = ErrorResponse)
    ),
    tag = "Collection"
)]
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, GatewayError> {
    let request = FundingRequest::new(
        &req.user.wallet,
        req.order.amount,
        &req.order.currency,
        req.order.payments,
        req.order.frequency,
    )
    .map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    match state.collection.checkout(&request).await {
        Ok(authorization) => Ok(Json(CheckoutResponse {
            authorisation_url: authorization.authorization_url,
        })),
        Err(e @ (CollectionError::InvalidRequest(_) | CollectionError::Money(_))) => {
            Err(GatewayError::BadRequest(e.to_string()))
        }
        Err(e) => {
            error!(code = e.code(), borrower = request.borrower_address(), "Checkout failed: {}", e);
            Err(GatewayError::Internal("Failed to create checkout"))
        }
    }
}

/// GoCardless event delivery
///
/// Events are processed in delivery order. A batch whose borrower cannot be
/// resolved is acknowledged without any on-chain call.
#[utoipa::path(
    post,
    path = "/gocardless/webhook",
    request_body = GoCardlessWebhook,
    responses(
        (status = 200, description = "Delivery processed", body = Ack),
        (status = 500, description = "Processing aborted; the provider will redeliver", body = ErrorResponse)
    ),
    tag = "Webhooks"
)]
pub async fn gocardless_webhook(
    State(state): State<Arc<AppState>>,
    Json(webhook): Json<GoCardlessWebhook>,
) -> Result<Json<Ack>, GatewayError> {
    let events = webhook.events.len();
    // Detached so a dropped connection cannot stop a step between claim and completion
    let processor = Arc::clone(&state.processor);
    let outcome = tokio::spawn(async move { processor.process_batch(&webhook).await }).await;

    match outcome {
        Ok(Ok(summary)) => {
            info!(
                events = events,
                settled_payments = summary.settled_payments,
                fundings = summary.fundings.len(),
                closed_schedules = summary.closed_schedules,
                ignored = summary.ignored,
                "GoCardless delivery processed"
            );
            Ok(Json(Ack::default()))
        }
        Ok(Err(e @ WebhookError::CorrelationMissing { .. })) => {
            warn!(code = e.code(), "GoCardless delivery acknowledged without funding: {}", e);
            Ok(Json(Ack::default()))
        }
        Ok(Err(e)) => {
            error!(code = e.code(), events = events, "GoCardless delivery failed: {}", e);
            Err(GatewayError::Internal("Failed to process webhook"))
        }
        Err(join_err) => {
            error!(events = events, "GoCardless delivery task aborted: {}", join_err);
            Err(GatewayError::Internal("Failed to process webhook"))
        }
    }
}
