use thiserror::Error;

use crate::money::MoneyError;
use crate::providers::ProviderError;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Invalid funding request: {0}")]
    InvalidRequest(String),

    #[error("Invalid amount: {0}")]
    Money(#[from] MoneyError),

    /// Full provider body stays in the logs.
    #[error("Collection provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl CollectionError {
    pub fn code(&self) -> &'static str {
        match self {
            CollectionError::InvalidRequest(_) => "INVALID_REQUEST",
            CollectionError::Money(_) => "INVALID_AMOUNT",
            CollectionError::Provider(_) => "COLLECTION_PROVIDER_ERROR",
        }
    }
}
