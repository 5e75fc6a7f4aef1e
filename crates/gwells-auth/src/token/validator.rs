//! Bearer token validation.
//!
//! Validation runs in a fixed order:
//!
//! 1. Read `kid`, `aud` and `iss` from the token without trusting them.
//! 2. Reject a foreign audience or issuer. No key lookup happens for these.
//! 3. Resolve the signing certificate through the [`CertificateCache`].
//! 4. Verify the RS256 signature and `exp` against that certificate.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use super::claims::{Claims, UnverifiedClaims};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::jwks::CertificateCache;

/// Per-request view of a token before verification.
#[derive(Debug)]
struct ValidationContext {
    kid: String,
    claims: UnverifiedClaims,
}

impl ValidationContext {
    fn parse(token: &str) -> Result<Self, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::malformed_token(e.to_string()))?;
        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::malformed_token("token header has no kid"))?;

        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(AuthError::malformed_token("token must have three segments")),
        };
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::malformed_token(format!("payload is not base64url: {e}")))?;
        let claims = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::malformed_token(format!("payload is not a claim set: {e}")))?;

        Ok(Self { kid, claims })
    }
}

/// Validates bearer tokens issued by the configured identity provider.
pub struct TokenValidator {
    audience: String,
    issuer: String,
    group_claim: String,
    role_claim: String,
    cache: Arc<CertificateCache>,
}

impl TokenValidator {
    /// Creates a validator that resolves keys through `cache`.
    #[must_use]
    pub fn new(config: &AuthConfig, cache: Arc<CertificateCache>) -> Self {
        Self {
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            group_claim: config.group_claim(),
            role_claim: config.role_claim(),
            cache,
        }
    }

    /// The certificate cache used by this validator.
    pub fn cache(&self) -> &Arc<CertificateCache> {
        &self.cache
    }

    /// Groups granted to the token's subject.
    #[must_use]
    pub fn groups(&self, claims: &Claims) -> Vec<String> {
        claims.string_list(&self.group_claim)
    }

    /// Roles granted to the token's subject.
    #[must_use]
    pub fn roles(&self, claims: &Claims) -> Vec<String> {
        claims.string_list(&self.role_claim)
    }

    /// Validates `token` and returns its verified claims.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` if the token cannot be parsed or has no `kid`
    /// - `InvalidAudience` / `InvalidIssuer` on a claim mismatch
    /// - `CertificateUnavailable` if no signing certificate can be resolved
    /// - `SignatureInvalid` / `TokenExpired` if verification fails
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let context = ValidationContext::parse(token)?;

        let audience_ok = !self.audience.is_empty()
            && context
                .claims
                .aud
                .as_ref()
                .is_some_and(|aud| aud.contains(&self.audience));
        if !audience_ok {
            tracing::debug!(kid = %context.kid, "Token rejected: invalid audience");
            return Err(AuthError::InvalidAudience);
        }

        let issuer_ok =
            !self.issuer.is_empty() && context.claims.iss.as_deref() == Some(self.issuer.as_str());
        if !issuer_ok {
            tracing::debug!(kid = %context.kid, "Token rejected: invalid issuer");
            return Err(AuthError::InvalidIssuer);
        }

        let record = self
            .cache
            .get_or_refresh(Some(&context.kid))
            .await
            .map_err(|e| {
                tracing::warn!(kid = %context.kid, error = %e, "No signing certificate for token");
                AuthError::from(e)
            })?;

        self.verify(token, &record.material)
    }

    /// Verifies the RS256 signature and standard claims against `material`.
    fn verify(&self, token: &str, material: &str) -> Result<Claims, AuthError> {
        let key = DecodingKey::from_rsa_pem(material.as_bytes()).map_err(|e| {
            tracing::warn!(error = %e, "Cached certificate is not a usable RSA key");
            AuthError::certificate_unavailable(format!("unusable certificate: {e}"))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthError::certificate_unavailable(err.to_string())
        }
        _ => AuthError::malformed_token(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwks::testing::{StubFetcher, key_set};
    use crate::jwks::{CertificateRecord, JwksError, KeySelector};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use time::OffsetDateTime;

    const AUDIENCE: &str = "https://gwells.example.com";
    const ISSUER: &str = "https://idp.example.com/";
    const SIGNING_KEY: &str = include_str!("../../tests/fixtures/signing_key.pem");
    const SIGNING_CERT: &str = include_str!("../../tests/fixtures/signing_cert.pem");
    const ROGUE_KEY: &str = include_str!("../../tests/fixtures/rogue_key.pem");

    /// The base64 body of a PEM file, as an identity provider would publish it.
    fn certificate_body(pem: &str) -> String {
        pem.lines()
            .filter(|line| !line.starts_with("-----"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn claims() -> Value {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        json!({
            "sub": "auth0|user-1",
            "aud": AUDIENCE,
            "iss": ISSUER,
            "iat": now,
            "exp": now + 3600,
        })
    }

    fn sign(kid: Option<&str>, claims: &Value, private_key: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(ToString::to_string);
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    fn validator_with(fetcher: &Arc<StubFetcher>) -> TokenValidator {
        let cache = Arc::new(CertificateCache::new(fetcher.clone(), KeySelector::default()));
        TokenValidator::new(&AuthConfig::new(AUDIENCE, ISSUER, "unused"), cache)
    }

    fn published_fetcher() -> Arc<StubFetcher> {
        let body = certificate_body(SIGNING_CERT);
        Arc::new(StubFetcher::ok(key_set(&[("other", "MODULUS0"), ("abc", body.as_str())])))
    }

    fn signing_record(expiry: OffsetDateTime) -> CertificateRecord {
        CertificateRecord {
            material: SIGNING_CERT.trim().to_string(),
            kid: "abc".to_string(),
            expiry,
        }
    }

    #[tokio::test]
    async fn test_valid_token() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let token = sign(Some("abc"), &claims(), SIGNING_KEY);
        let verified = validator.validate(&token).await.unwrap();

        assert_eq!(verified.sub, "auth0|user-1");
        assert_eq!(verified.iss, ISSUER);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_group_and_role_claims() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        claims[format!("{AUDIENCE}/claims/authorization/groups")] = json!(["drillers", "staff"]);
        claims[format!("{AUDIENCE}/claims/authorization/roles")] = json!(["viewer"]);
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        let verified = validator.validate(&token).await.unwrap();
        assert_eq!(validator.groups(&verified), vec!["drillers", "staff"]);
        assert_eq!(validator.roles(&verified), vec!["viewer"]);
    }

    #[tokio::test]
    async fn test_audience_list() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        claims["aud"] = json!([AUDIENCE, "https://idp.example.com/userinfo"]);
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid_is_rejected() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let token = sign(Some("xyz"), &claims(), SIGNING_KEY);
        let err = validator.validate(&token).await.unwrap_err();

        match err {
            AuthError::CertificateUnavailable { message } => {
                assert_eq!(message, JwksError::KeyNotFound("xyz".into()).to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_audience_checked_before_fetch() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        claims["aud"] = json!("https://someone-else.example.com");
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::InvalidAudience)
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_audience_is_rejected() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        claims.as_object_mut().unwrap().remove("aud");
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::InvalidAudience)
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_issuer_checked_before_fetch() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        claims["iss"] = json!("https://evil.example.com/");
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::InvalidIssuer)
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_certificate_skips_fetch() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);
        validator
            .cache()
            .seed(signing_record(OffsetDateTime::now_utc() + Duration::from_secs(3600)));

        let good = sign(Some("abc"), &claims(), SIGNING_KEY);
        assert!(validator.validate(&good).await.is_ok());

        let forged = sign(Some("abc"), &claims(), ROGUE_KEY);
        assert!(matches!(
            validator.validate(&forged).await,
            Err(AuthError::SignatureInvalid)
        ));

        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_certificate_used_when_provider_unreachable() {
        let fetcher = Arc::new(StubFetcher::failing(JwksError::Network(
            "connection refused".into(),
        )));
        let validator = validator_with(&fetcher);
        validator
            .cache()
            .seed(signing_record(OffsetDateTime::now_utc() - Duration::from_secs(1)));

        let token = sign(Some("abc"), &claims(), SIGNING_KEY);
        let verified = validator.validate(&token).await.unwrap();

        assert_eq!(verified.sub, "auth0|user-1");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_unreachable_with_empty_cache() {
        let fetcher = Arc::new(StubFetcher::failing(JwksError::Network("down".into())));
        let validator = validator_with(&fetcher);

        let token = sign(Some("abc"), &claims(), SIGNING_KEY);
        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::CertificateUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_bad_signature() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let token = sign(Some("abc"), &claims(), ROGUE_KEY);
        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let mut claims = claims();
        let past = OffsetDateTime::now_utc().unix_timestamp() - 3600;
        claims["exp"] = json!(past);
        let token = sign(Some("abc"), &claims, SIGNING_KEY);

        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_unusable_certificate_material() {
        let fetcher = Arc::new(StubFetcher::ok(key_set(&[("abc", "MODULUS1")])));
        let validator = validator_with(&fetcher);

        let token = sign(Some("abc"), &claims(), SIGNING_KEY);
        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::CertificateUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_token_without_kid() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        let token = sign(None, &claims(), SIGNING_KEY);
        assert!(matches!(
            validator.validate(&token).await,
            Err(AuthError::MalformedToken { .. })
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);

        for token in ["", "not-a-jwt", "a.b.c", "a.b.c.d"] {
            assert!(
                matches!(
                    validator.validate(token).await,
                    Err(AuthError::MalformedToken { .. })
                ),
                "token {token:?} should be malformed"
            );
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_key_rotation() {
        let fetcher = published_fetcher();
        let validator = validator_with(&fetcher);
        // Cache currently holds the retired key.
        validator
            .cache()
            .seed(CertificateRecord {
                material: "-----BEGIN CERTIFICATE-----\nRETIRED\n-----END CERTIFICATE-----"
                    .to_string(),
                kid: "retired".to_string(),
                expiry: OffsetDateTime::now_utc() + Duration::from_secs(3600),
            });

        let token = sign(Some("abc"), &claims(), SIGNING_KEY);
        assert!(validator.validate(&token).await.is_ok());
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(validator.cache().current().unwrap().kid, "abc");
    }
}
