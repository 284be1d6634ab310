use thiserror::Error;

use crate::providers::ProviderError;

/// Fatal at startup: the service cannot settle anything without these resources.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Failed to create {resource}: {source}")]
    Provider {
        resource: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("Provisioning state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Provisioning state encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0} must be provisioned first")]
    MissingDependency(&'static str),

    #[error("Provisioned state incomplete: {0} missing")]
    Incomplete(&'static str),
}

impl ProvisioningError {
    pub fn code(&self) -> &'static str {
        match self {
            ProvisioningError::Provider { .. } => "PROVISIONING_PROVIDER_ERROR",
            ProvisioningError::Io { .. } => "PROVISIONING_IO_ERROR",
            ProvisioningError::Encode(_) => "PROVISIONING_ENCODE_ERROR",
            ProvisioningError::MissingDependency(_) => "PROVISIONING_MISSING_DEPENDENCY",
            ProvisioningError::Incomplete(_) => "PROVISIONING_INCOMPLETE",
        }
    }
}
