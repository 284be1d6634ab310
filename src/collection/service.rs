use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use super::error::CollectionError;
use super::schedule::{CollectionSchedule, FundingRequest, schedule_for};
use crate::correlation::CorrelationStore;
use crate::providers::{CollectionProvider, NewBillingRequest};

/// Hosted-flow handle returned to the borrower
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub request_id: String,
    pub authorization_url: String,
    pub correlation_id: Uuid,
}

/// Idempotency key of the hosted flow opened for a billing request
pub fn flow_idempotency_key(correlation_id: Uuid) -> Uuid {
    Uuid::new_v5(&correlation_id, b"billing_request_flow")
}

pub struct CollectionService {
    provider: Arc<dyn CollectionProvider>,
    correlations: Arc<CorrelationStore>,
}

impl CollectionService {
    pub fn new(provider: Arc<dyn CollectionProvider>, correlations: Arc<CorrelationStore>) -> Self {
        Self {
            provider,
            correlations,
        }
    }

    /// Schedule the request (surcharge included) and open its authorisation flow.
    pub async fn checkout(&self, request: &FundingRequest) -> Result<Authorization, CollectionError> {
        let schedule = schedule_for(request)?;
        self.create_authorization(&schedule, request.borrower_address())
            .await
    }

    /// Create the recurring mandate, its instalment schedule and the hosted
    /// flow. The borrower is registered under a fresh correlation id that the
    /// provider echoes back in webhook metadata.
    pub async fn create_authorization(
        &self,
        schedule: &CollectionSchedule,
        borrower: &str,
    ) -> Result<Authorization, CollectionError> {
        let correlation_id = Uuid::new_v4();
        let request = NewBillingRequest {
            borrower: borrower.to_string(),
            correlation_id,
            currency: schedule.currency.clone(),
            total_amount: schedule.total_amount,
            instalments: schedule.instalments.clone(),
            frequency: schedule.frequency,
            start_date: Utc::now().date_naive(),
        };

        let request_id = self
            .provider
            .create_billing_request(&request)
            .await
            .inspect_err(|e| {
                error!(
                    correlation_id = %correlation_id,
                    borrower = borrower,
                    code = e.code(),
                    "Billing request creation failed: {}",
                    e
                )
            })?;

        let authorization_url = self
            .provider
            .create_billing_request_flow(flow_idempotency_key(correlation_id), &request_id)
            .await
            .inspect_err(|e| {
                error!(
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    code = e.code(),
                    "Billing request flow creation failed: {}",
                    e
                )
            })?;

        self.correlations
            .associate(&correlation_id.to_string(), borrower);

        info!(
            correlation_id = %correlation_id,
            borrower = borrower,
            request_id = %request_id,
            total = schedule.total_amount,
            instalments = schedule.instalments.len(),
            "Collection request created"
        );

        Ok(Authorization {
            request_id,
            authorization_url,
            correlation_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Frequency;
    use crate::providers::mock::MockCollection;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn service(provider: Arc<MockCollection>) -> (CollectionService, Arc<CorrelationStore>) {
        let correlations = Arc::new(CorrelationStore::new(Duration::from_secs(60)));
        (
            CollectionService::new(provider, Arc::clone(&correlations)),
            correlations,
        )
    }

    #[tokio::test]
    async fn test_checkout_registers_correlation() {
        let provider = Arc::new(MockCollection::new());
        let (service, correlations) = service(Arc::clone(&provider));
        let request =
            FundingRequest::new("0xabc", Decimal::from(10), "USD", 3, Frequency::Weekly).unwrap();

        let auth = service.checkout(&request).await.unwrap();

        assert!(auth.authorization_url.contains(&auth.request_id));
        assert_eq!(
            correlations.resolve(&auth.correlation_id.to_string()),
            Ok("0xabc".to_string())
        );

        let sent = provider.billing_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].correlation_id, auth.correlation_id);
        assert_eq!(
            provider.flow_keys(),
            vec![flow_idempotency_key(auth.correlation_id)]
        );
        assert_eq!(sent[0].total_amount, 1100);
        assert_eq!(sent[0].instalments, vec![366, 366, 368]);
    }

    #[tokio::test]
    async fn test_each_checkout_gets_its_own_correlation() {
        let provider = Arc::new(MockCollection::new());
        let (service, correlations) = service(provider);
        let a = FundingRequest::new("0xaaa", Decimal::from(5), "USD", 1, Frequency::Weekly).unwrap();
        let b = FundingRequest::new("0xbbb", Decimal::from(5), "USD", 1, Frequency::Weekly).unwrap();

        let auth_a = service.checkout(&a).await.unwrap();
        let auth_b = service.checkout(&b).await.unwrap();

        assert_ne!(auth_a.correlation_id, auth_b.correlation_id);
        assert_eq!(
            correlations.resolve(&auth_a.correlation_id.to_string()),
            Ok("0xaaa".to_string())
        );
        assert_eq!(
            correlations.resolve(&auth_b.correlation_id.to_string()),
            Ok("0xbbb".to_string())
        );
    }

    #[tokio::test]
    async fn test_provider_rejection_is_collection_error() {
        let provider = Arc::new(MockCollection::new());
        provider.set_fail_billing_request(true);
        let (service, correlations) = service(provider);
        let request =
            FundingRequest::new("0xabc", Decimal::from(10), "USD", 2, Frequency::Monthly).unwrap();

        let err = service.checkout(&request).await.unwrap_err();

        assert_eq!(err.code(), "COLLECTION_PROVIDER_ERROR");
        assert!(correlations.is_empty());
    }
}
