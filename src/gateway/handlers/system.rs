use std::sync::Arc;

use axum::{Json, extract::State};

use super::super::state::AppState;
use super::super::types::{HealthResponse, WelcomeResponse};

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome message", body = WelcomeResponse)),
    tag = "System"
)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Credura settlement service".to_string(),
    })
}

/// Liveness and build info
///
/// The server only starts once every custodial resource is provisioned, so a
/// response here implies a ready operating wallet.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service healthy", body = HealthResponse)),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("GIT_HASH").to_string(),
        wallet_address: state
            .coordinator()
            .provisioned()
            .custodial_wallet_address
            .clone(),
        pending_correlations: state.correlations.len(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    })
}
