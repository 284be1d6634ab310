use std::sync::Arc;

use crate::collection::CollectionService;
use crate::correlation::CorrelationStore;
use crate::settlement::SettlementCoordinator;
use crate::webhook::WebhookProcessor;

/// Shared gateway state
pub struct AppState {
    pub collection: Arc<CollectionService>,
    pub processor: Arc<WebhookProcessor>,
    pub correlations: Arc<CorrelationStore>,
}

impl AppState {
    pub fn new(
        collection: Arc<CollectionService>,
        processor: Arc<WebhookProcessor>,
        correlations: Arc<CorrelationStore>,
    ) -> Self {
        Self {
            collection,
            processor,
            correlations,
        }
    }

    pub fn coordinator(&self) -> &SettlementCoordinator {
        self.processor.coordinator()
    }
}
