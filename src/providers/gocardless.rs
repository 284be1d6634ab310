//! GoCardless client (ACH mandates, instalment schedules, payments)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::CollectionProvider;
use super::error::{Provider, ProviderError};
use super::http::ProviderHttp;
use crate::collection::Frequency;
use crate::config::GoCardlessConfig;
use crate::money::MinorUnits;

const API_VERSION: &str = "2015-07-06";

/// Metadata key carrying the borrower's wallet address
pub const METADATA_WALLET: &str = "wallet";
/// Metadata key carrying the correlation id of a funding request
pub const METADATA_CORRELATION_ID: &str = "correlation_id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentLinks {
    #[serde(default)]
    pub mandate: Option<String>,
    #[serde(default)]
    pub instalment_schedule: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    /// Minor units
    pub amount: MinorUnits,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub links: PaymentLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLinks {
    #[serde(default)]
    pub payments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalmentSchedule {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub links: ScheduleLinks,
}

/// Recurring ACH mandate plus instalment schedule for one funding request
#[derive(Debug, Clone, PartialEq)]
pub struct NewBillingRequest {
    pub borrower: String,
    pub correlation_id: Uuid,
    pub currency: String,
    pub total_amount: MinorUnits,
    pub instalments: Vec<MinorUnits>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

impl NewBillingRequest {
    pub fn metadata(&self) -> Value {
        json!({
            METADATA_WALLET: self.borrower,
            METADATA_CORRELATION_ID: self.correlation_id.to_string(),
        })
    }

    pub fn to_body(&self) -> Value {
        json!({
            "billing_requests": {
                "metadata": self.metadata(),
                "mandate_request": {
                    "scheme": "ach",
                    "consent_type": "recurring",
                    "purpose_code": "loan",
                },
                "instalment_schedule_request": {
                    "name": "Crypto Loan",
                    "currency": self.currency,
                    "total_amount": self.total_amount,
                    "retry_if_possible": true,
                    "metadata": self.metadata(),
                    "instalments_with_schedule": {
                        "amounts": self.instalments,
                        "interval": 1,
                        "interval_unit": self.frequency.as_str(),
                        "start_date": self.start_date.format("%Y-%m-%d").to_string(),
                    },
                },
            }
        })
    }
}

#[derive(Deserialize)]
struct PaymentEnvelope {
    payments: Payment,
}

#[derive(Deserialize)]
struct ScheduleEnvelope {
    instalment_schedules: InstalmentSchedule,
}

#[derive(Deserialize)]
struct BillingRequestEnvelope {
    billing_requests: IdOnly,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct FlowEnvelope {
    billing_request_flows: Flow,
}

#[derive(Deserialize)]
struct Flow {
    authorisation_url: String,
}

pub struct GoCardlessClient {
    http: ProviderHttp,
    exit_url: String,
    redirect_url: String,
}

impl GoCardlessClient {
    pub fn new(config: &GoCardlessConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("GoCardless-Version", HeaderValue::from_static(API_VERSION));
        Ok(Self {
            http: ProviderHttp::new(
                Provider::GoCardless,
                &config.api_url,
                &config.api_secret,
                headers,
            )?,
            exit_url: config.exit_url.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }

    fn flow_body(&self, billing_request_id: &str) -> Value {
        json!({
            "billing_request_flows": {
                "lock_currency": true,
                "links": { "billing_request": billing_request_id },
                "exit_uri": self.exit_url,
                "redirect_uri": self.redirect_url,
            }
        })
    }
}

#[async_trait]
impl CollectionProvider for GoCardlessClient {
    async fn get_payment(&self, payment_id: &str) -> Result<Payment, ProviderError> {
        let envelope: PaymentEnvelope = self.http.get(&format!("/payments/{}", payment_id)).await?;
        Ok(envelope.payments)
    }

    async fn get_instalment_schedule(
        &self,
        schedule_id: &str,
    ) -> Result<InstalmentSchedule, ProviderError> {
        let envelope: ScheduleEnvelope = self
            .http
            .get(&format!("/instalment_schedules/{}", schedule_id))
            .await?;
        Ok(envelope.instalment_schedules)
    }

    async fn create_billing_request(
        &self,
        request: &NewBillingRequest,
    ) -> Result<String, ProviderError> {
        let envelope: BillingRequestEnvelope = self
            .http
            .post_idempotent("/billing_requests", request.correlation_id, &request.to_body())
            .await?;
        Ok(envelope.billing_requests.id)
    }

    async fn create_billing_request_flow(
        &self,
        idempotency_key: Uuid,
        billing_request_id: &str,
    ) -> Result<String, ProviderError> {
        let envelope: FlowEnvelope = self
            .http
            .post_idempotent(
                "/billing_request_flows",
                idempotency_key,
                &self.flow_body(billing_request_id),
            )
            .await?;
        Ok(envelope.billing_request_flows.authorisation_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewBillingRequest {
        NewBillingRequest {
            borrower: "0xabc".to_string(),
            correlation_id: Uuid::nil(),
            currency: "USD".to_string(),
            total_amount: 1100,
            instalments: vec![366, 366, 368],
            frequency: Frequency::Weekly,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_billing_request_body_shape() {
        let body = request().to_body();
        let br = &body["billing_requests"];

        assert_eq!(br["metadata"]["wallet"], "0xabc");
        assert_eq!(
            br["metadata"]["correlation_id"],
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(br["mandate_request"]["scheme"], "ach");
        assert_eq!(br["mandate_request"]["consent_type"], "recurring");

        let schedule = &br["instalment_schedule_request"];
        assert_eq!(schedule["total_amount"], 1100);
        assert_eq!(schedule["retry_if_possible"], true);
        assert_eq!(schedule["metadata"], br["metadata"]);
        assert_eq!(schedule["instalments_with_schedule"]["amounts"], json!([366, 366, 368]));
        assert_eq!(schedule["instalments_with_schedule"]["interval"], 1);
        assert_eq!(schedule["instalments_with_schedule"]["interval_unit"], "weekly");
        assert_eq!(schedule["instalments_with_schedule"]["start_date"], "2026-03-01");
    }

    #[tokio::test]
    async fn test_writes_carry_idempotency_keys() {
        use axum::Router;
        use axum::http::HeaderMap as Headers;
        use axum::routing::post;
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Vec<(String, Option<String>)>>> = Arc::default();
        let record = |path: &'static str, seen: Arc<Mutex<Vec<(String, Option<String>)>>>| {
            move |headers: Headers| async move {
                let key = headers
                    .get("idempotency-key")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock().unwrap().push((path.to_string(), key));
                axum::Json(json!({
                    "billing_requests": { "id": "BRQ1" },
                    "billing_request_flows": { "authorisation_url": "https://pay.example/flow" },
                }))
            }
        };
        let app = Router::new()
            .route("/billing_requests", post(record("/billing_requests", seen.clone())))
            .route(
                "/billing_request_flows",
                post(record("/billing_request_flows", seen.clone())),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = GoCardlessClient::new(&GoCardlessConfig {
            api_url: format!("http://{}", addr),
            api_secret: "sandbox".to_string(),
            exit_url: "https://credura.example/exit".to_string(),
            redirect_url: "https://credura.example/done".to_string(),
        })
        .unwrap();
        let mut billing = request();
        billing.correlation_id = Uuid::new_v4();
        let flow_key = Uuid::new_v4();

        let id = client.create_billing_request(&billing).await.unwrap();
        let url = client.create_billing_request_flow(flow_key, &id).await.unwrap();

        assert_eq!(url, "https://pay.example/flow");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (
                    "/billing_requests".to_string(),
                    Some(billing.correlation_id.to_string())
                ),
                ("/billing_request_flows".to_string(), Some(flow_key.to_string())),
            ]
        );
    }

    #[test]
    fn test_payment_envelope_decodes_with_missing_optional_fields() {
        let raw = r#"{"payments":{"id":"PM1","amount":500,"currency":"USD","status":"paid_out"}}"#;
        let envelope: PaymentEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.payments.amount, 500);
        assert!(envelope.payments.metadata.is_empty());
        assert!(envelope.payments.links.instalment_schedule.is_none());
    }

    #[test]
    fn test_schedule_envelope_decodes_payment_links() {
        let raw = r#"{"instalment_schedules":{"id":"IS1","status":"active",
            "metadata":{"correlation_id":"c-1"},
            "links":{"customer":"CU1","payments":["PM1","PM2"]}}}"#;
        let envelope: ScheduleEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.instalment_schedules.links.payments, vec!["PM1", "PM2"]);
        assert_eq!(
            envelope.instalment_schedules.metadata.get(METADATA_CORRELATION_ID),
            Some(&"c-1".to_string())
        );
    }
}
