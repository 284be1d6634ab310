pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

/// All routes plus the Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health_check))
        .route("/gocardless/checkout", post(handlers::checkout))
        .route("/gocardless/webhook", post(handlers::gocardless_webhook))
        .route("/circle/webhook", post(handlers::circle_webhook));

    // [SECURITY] Simulated wires move sandbox money only. Production builds use
    // `--no-default-features` to leave this route out.
    #[cfg(feature = "mock-api")]
    let app = app.route("/circle/wire/payment", post(handlers::simulate_wire_payment));

    app.with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process exits.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.inspect_err(|e| {
        error!(addr = %addr, "Failed to bind gateway: {}", e);
    })?;

    info!(addr = %addr, "Gateway listening");
    info!("API docs: http://{}/docs", addr);
    #[cfg(feature = "mock-api")]
    info!("Sandbox wire endpoint enabled: POST /circle/wire/payment");

    axum::serve(listener, build_router(state)).await
}
