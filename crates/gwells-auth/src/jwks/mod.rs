//! Signing key acquisition and caching.
//!
//! Tokens issued by the identity provider are signed with one of the keys it
//! publishes in a JSON Web Key Set. This module resolves the key a token
//! needs and keeps it cached:
//!
//! - [`KeyFetcher`] / [`HttpKeyFetcher`] - fetch and parse the published JWKS
//! - [`KeySelector`] - pick a key by `kid` and build a [`CertificateRecord`]
//! - [`CertificateCache`] - the single cached record, refreshed on demand
//!
//! Refreshes are triggered by validation; there is no periodic background
//! refresh.

pub mod cache;
pub mod fetcher;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::CertificateCache;
pub use fetcher::{HttpKeyFetcher, KeyFetcher};
pub use selector::{CertificateRecord, KeySelector};

use serde::{Deserialize, Serialize};

/// A JSON Web Key Set as published by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Keys in provider order.
    pub keys: Vec<JsonWebKey>,
}

/// One published key. Fields are kept as delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonWebKey {
    /// Key type, e.g. `RSA`.
    pub kty: String,
    /// Key identifier matched against the token header.
    pub kid: String,
    /// Intended usage, e.g. `sig`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// RSA modulus field.
    pub n: String,
    /// RSA exponent field.
    pub e: String,
}

/// Errors that can occur while resolving a signing key.
///
/// The type is `Clone` so that one refresh outcome can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwksError {
    /// The JWKS endpoint could not be reached or did not return a body.
    #[error("Network error: {0}")]
    Network(String),

    /// The JWKS body was not a key set.
    #[error("Failed to decode JWKS: {0}")]
    Decode(String),

    /// The fetched key set has no key with the requested identifier.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The certificate TTL pushes the expiry past the representable range.
    #[error("Certificate TTL {0:?} is out of range")]
    TtlOutOfRange(std::time::Duration),

    /// The refresh task stopped without producing an outcome.
    #[error("Certificate refresh failed: {0}")]
    Refresh(String),
}
