//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::{Modify, OpenApi};

use crate::collection::Frequency;
use crate::gateway::types::{
    Ack, CheckoutOrder, CheckoutRequest, CheckoutResponse, CheckoutUser, ErrorResponse,
    HealthResponse, SuccessResponse, WelcomeResponse,
};
use crate::webhook::{CircleWebhook, GoCardlessEvent, GoCardlessWebhook};

/// Sandbox-only routes, documented only when they are compiled in
struct SandboxAddon;

impl Modify for SandboxAddon {
    fn modify(&self, _openapi: &mut utoipa::openapi::OpenApi) {
        #[cfg(feature = "mock-api")]
        _openapi.merge(SandboxDoc::openapi());
    }
}

#[cfg(feature = "mock-api")]
#[derive(OpenApi)]
#[openapi(
    paths(crate::gateway::handlers::circle::simulate_wire_payment),
    components(schemas(crate::gateway::types::WirePaymentRequest)),
    tags((name = "Sandbox", description = "Simulated rails, never built for production"))
)]
struct SandboxDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credura Settlement API",
        version = "1.0.0",
        description = "Settlement orchestrator between bank-debit collections, custodial wallets and the on-chain loan pool.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::system::welcome,
        crate::gateway::handlers::system::health_check,
        crate::gateway::handlers::gocardless::checkout,
        crate::gateway::handlers::gocardless::gocardless_webhook,
        crate::gateway::handlers::circle::circle_webhook,
    ),
    components(
        schemas(
            CheckoutRequest,
            CheckoutUser,
            CheckoutOrder,
            CheckoutResponse,
            Frequency,
            GoCardlessWebhook,
            GoCardlessEvent,
            CircleWebhook,
            Ack,
            SuccessResponse,
            ErrorResponse,
            WelcomeResponse,
            HealthResponse,
        )
    ),
    modifiers(&SandboxAddon),
    tags(
        (name = "Collection", description = "Borrower checkout against the bank-debit provider"),
        (name = "Webhooks", description = "Provider event deliveries"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Credura Settlement API");
        assert!(spec.to_json().is_ok());
    }

    #[test]
    fn test_webhook_and_checkout_paths_registered() {
        let spec = ApiDoc::openapi();
        for path in ["/", "/health", "/gocardless/checkout", "/gocardless/webhook", "/circle/webhook"] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[cfg(feature = "mock-api")]
    #[test]
    fn test_sandbox_wire_documented_with_mock_api() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/circle/wire/payment"));
    }
}
