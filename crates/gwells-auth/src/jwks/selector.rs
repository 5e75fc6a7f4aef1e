//! Key selection and certificate records.

use std::time::Duration;

use time::OffsetDateTime;

use super::{JsonWebKey, JsonWebKeySet, JwksError};

const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----\n";
const PEM_FOOTER: &str = "\n-----END CERTIFICATE-----";

/// A resolved signing credential.
///
/// Records are replaced as a whole on refresh, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    /// PEM text handed to the signature verifier.
    pub material: String,
    /// Key identifier the material belongs to.
    pub kid: String,
    /// Instant after which the record is stale.
    pub expiry: OffsetDateTime,
}

impl CertificateRecord {
    /// Returns `true` while `now` is before the expiry.
    #[must_use]
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        now < self.expiry
    }

    /// Returns `true` if this record can verify a token asking for `kid`.
    ///
    /// A missing `kid` matches any record.
    #[must_use]
    pub fn matches(&self, kid: Option<&str>) -> bool {
        kid.is_none_or(|kid| self.kid == kid)
    }
}

/// Picks the key a token needs out of a fetched key set.
#[derive(Debug, Clone, Copy)]
pub struct KeySelector {
    ttl: Duration,
}

impl KeySelector {
    /// Creates a selector whose records stay fresh for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Selects a key and builds a record that expires `ttl` after `now`.
    ///
    /// With no `want_kid` the first key in provider order is used. Otherwise
    /// the first key whose `kid` is exactly `want_kid` wins.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::KeyNotFound` if no key qualifies and
    /// `JwksError::TtlOutOfRange` if the expiry cannot be represented.
    pub fn select(
        &self,
        set: &JsonWebKeySet,
        want_kid: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<CertificateRecord, JwksError> {
        let want_kid = want_kid.filter(|kid| !kid.is_empty());

        let key = match want_kid {
            None => set.keys.first(),
            Some(kid) => set.keys.iter().find(|k| k.kid == kid),
        }
        .ok_or_else(|| JwksError::KeyNotFound(want_kid.unwrap_or("any").to_string()))?;

        tracing::debug!(kid = %key.kid, "Selected signing key");

        let expiry = time::Duration::try_from(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(JwksError::TtlOutOfRange(self.ttl))?;

        Ok(CertificateRecord {
            material: wrap_certificate(key),
            kid: key.kid.clone(),
            expiry,
        })
    }
}

impl Default for KeySelector {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 3600))
    }
}

/// Frames the key's `n` field as a PEM certificate.
///
/// The provider's value is used verbatim as the certificate body.
fn wrap_certificate(key: &JsonWebKey) -> String {
    format!("{PEM_HEADER}{}{PEM_FOOTER}", key.n)
}
