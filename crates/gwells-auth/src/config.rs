//! Authentication configuration.
//!
//! The values here are consumed as plain settings; loading them from files,
//! environment or flags is the server's job.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! audience = "https://gwells.example.com"
//! issuer = "https://gwells.auth.example.com/"
//! jwks_endpoint = "https://gwells.auth.example.com/.well-known/jwks.json"
//! certificate_ttl = "24h"
//! request_timeout = "10s"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Suffix appended to the audience to form the group claim name.
const GROUP_CLAIM_SUFFIX: &str = "/claims/authorization/groups";

/// Suffix appended to the audience to form the role claim name.
const ROLE_CLAIM_SUFFIX: &str = "/claims/authorization/roles";

/// Settings for bearer token validation and signing key retrieval.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `aud` claim. Tokens must name exactly this audience.
    pub audience: String,

    /// Expected `iss` claim.
    pub issuer: String,

    /// URL of the identity provider's published JWKS document.
    pub jwks_endpoint: String,

    /// How long a resolved signing certificate stays fresh.
    #[serde(with = "humantime_serde")]
    pub certificate_ttl: Duration,

    /// Upper bound for a single JWKS fetch. The refresh of every waiting
    /// validator is bounded by this value.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted JWKS response body, in bytes.
    pub max_response_size: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            audience: String::new(),
            issuer: String::new(),
            jwks_endpoint: "/.well-known/jwks.json".to_string(),
            certificate_ttl: Duration::from_secs(24 * 3600), // 24 hours
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024, // 1 MB
        }
    }
}

impl AuthConfig {
    /// Creates a configuration for the given audience, issuer and JWKS URL.
    #[must_use]
    pub fn new(
        audience: impl Into<String>,
        issuer: impl Into<String>,
        jwks_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            audience: audience.into(),
            issuer: issuer.into(),
            jwks_endpoint: jwks_endpoint.into(),
            ..Default::default()
        }
    }

    /// Sets the certificate freshness horizon.
    #[must_use]
    pub fn with_certificate_ttl(mut self, ttl: Duration) -> Self {
        self.certificate_ttl = ttl;
        self
    }

    /// Sets the JWKS request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum JWKS response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Returns `true` when both expected claims are configured.
    ///
    /// With an empty audience or issuer every token is rejected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.audience.is_empty() && !self.issuer.is_empty()
    }

    /// Absolute URL of the JWKS document.
    ///
    /// A relative `jwks_endpoint` (the default) is resolved against the issuer.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the endpoint nor endpoint-plus-issuer
    /// forms a valid URL.
    pub fn jwks_url(&self) -> Result<Url, url::ParseError> {
        match Url::parse(&self.jwks_endpoint) {
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(&self.issuer)?.join(&self.jwks_endpoint)
            }
            other => other,
        }
    }

    /// Name of the namespaced claim that carries the user's groups.
    #[must_use]
    pub fn group_claim(&self) -> String {
        format!("{}{}", self.audience, GROUP_CLAIM_SUFFIX)
    }

    /// Name of the namespaced claim that carries the user's roles.
    #[must_use]
    pub fn role_claim(&self) -> String {
        format!("{}{}", self.audience, ROLE_CLAIM_SUFFIX)
    }
}
