//! Shared JSON-over-HTTPS plumbing for the provider clients.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use uuid::Uuid;

use super::error::{Provider, ProviderError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Bearer-authenticated client bound to one provider base URL
#[derive(Clone)]
pub struct ProviderHttp {
    provider: Provider,
    client: Client,
    base_url: String,
    api_secret: String,
}

impl ProviderHttp {
    pub fn new(
        provider: Provider,
        base_url: &str,
        api_secret: &str,
        default_headers: HeaderMap,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ProviderError::Transport {
                provider,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            provider,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        self.send(path, self.client.get(self.url(path))).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(path, self.client.post(self.url(path)).json(body))
            .await
    }

    /// POST for providers that take the idempotency key as a header
    pub async fn post_idempotent<B, T>(
        &self,
        path: &str,
        idempotency_key: Uuid,
        body: &B,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.url(path))
            .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.to_string())
            .json(body);
        self.send(path, request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let provider = self.provider;
        let response = request
            .bearer_auth(&self.api_secret)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport {
                provider,
                message: e.to_string(),
            })?;

        if !status.is_success() {
            error!(
                provider = %provider,
                path = path,
                status = status.as_u16(),
                body = %body,
                "Provider rejected request"
            );
            return Err(ProviderError::Http {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        debug!(provider = %provider, path = path, status = status.as_u16(), "Provider call ok");
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode {
            provider,
            message: format!("{}: {}", path, e),
        })
    }
}
