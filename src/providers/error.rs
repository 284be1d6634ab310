use std::fmt;
use thiserror::Error;

/// External system a request was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    GoCardless,
    CircleMint,
    CircleWallets,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::GoCardless => "gocardless",
            Provider::CircleMint => "circle_mint",
            Provider::CircleWallets => "circle_wallets",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx answer. `body` is kept verbatim for the logs, never for clients.
    #[error("{provider} returned HTTP {status}")]
    Http {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport { provider: Provider, message: String },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: Provider, message: String },

    #[error("Entity secret encryption failed: {0}")]
    Encryption(String),
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Http { .. } => "PROVIDER_HTTP",
            ProviderError::Transport { .. } => "PROVIDER_TRANSPORT",
            ProviderError::Decode { .. } => "PROVIDER_DECODE",
            ProviderError::Encryption(_) => "ENTITY_SECRET_ENCRYPTION",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ProviderError::Http { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Decode { provider, .. } => *provider,
            ProviderError::Encryption(_) => Provider::CircleWallets,
        }
    }

    /// Raw provider payload, when the provider answered at all.
    pub fn body(&self) -> Option<&str> {
        match self {
            ProviderError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}
