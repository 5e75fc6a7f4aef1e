//! JWKS retrieval over HTTP.

use async_trait::async_trait;

use super::{JsonWebKeySet, JwksError};
use crate::config::AuthConfig;

/// Source of the identity provider's published key set.
///
/// Implementations perform one round trip per call, never retry and never
/// touch the certificate cache.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetches and parses the current key set.
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError>;
}

/// Fetches the key set from a JWKS endpoint with `reqwest`.
pub struct HttpKeyFetcher {
    http_client: reqwest::Client,
    endpoint: String,
    max_response_size: usize,
}

impl HttpKeyFetcher {
    /// Creates a fetcher for the endpoint, timeout and size limit in `config`.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::Network` if the endpoint is not a usable URL or
    /// the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, JwksError> {
        let endpoint = config.jwks_url().map_err(|e| {
            JwksError::Network(format!(
                "invalid JWKS endpoint '{}': {e}",
                config.jwks_endpoint
            ))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            max_response_size: config.max_response_size,
        })
    }

    /// The endpoint this fetcher reads from.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError> {
        tracing::info!(endpoint = %self.endpoint, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Failed to fetch JWKS");
                JwksError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint = %self.endpoint, status = status.as_u16(), "JWKS endpoint returned an error status");
            return Err(JwksError::Network(format!("HTTP status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_response_size
        {
            return Err(JwksError::Network(format!(
                "response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::Network(e.to_string()))?;

        if body.len() > self.max_response_size {
            return Err(JwksError::Network(format!(
                "response exceeds maximum size of {} bytes",
                self.max_response_size
            )));
        }

        let jwks: JsonWebKeySet = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "Failed to parse JWKS");
            JwksError::Decode(e.to_string())
        })?;

        tracing::debug!(endpoint = %self.endpoint, keys = jwks.keys.len(), "Fetched JWKS");

        Ok(jwks)
    }
}
