//! Request/response DTOs and the gateway error type
//!
//! Every failure renders as `{"error": "<generic message>"}`. Provider payloads
//! and internal error codes go to the logs, never to the caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::collection::Frequency;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutUser {
    /// Borrower wallet address that receives the loan
    #[schema(example = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4")]
    pub wallet: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutOrder {
    /// Requested amount in major units
    #[schema(value_type = String, example = "10.00")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
    /// Number of instalments
    #[schema(example = 3)]
    pub payments: u32,
    pub frequency: Frequency,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub user: CheckoutUser,
    pub order: CheckoutOrder,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WirePaymentRequest {
    #[schema(value_type = String, example = "12.00")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Hosted page where the borrower authorises the mandate
    #[schema(example = "https://pay-sandbox.gocardless.com/billing/static/flow?id=BRF123")]
    pub authorisation_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    #[schema(example = true)]
    pub success: bool,
}

/// Empty acknowledgement `{}`
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Ack {}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    #[schema(example = "Credura settlement service")]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Build commit
    #[schema(example = "a1b2c3d")]
    pub version: String,
    /// Operating wallet the loan pool is driven from
    pub wallet_address: String,
    /// Checkouts still waiting for their funding call
    pub pending_correlations: usize,
    pub timestamp_ms: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Failed to process webhook")]
    pub error: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum GatewayError {
    /// Caller input was rejected; the message is safe to return
    BadRequest(String),
    /// Anything else; the message is a fixed description of the operation
    Internal(&'static str),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
