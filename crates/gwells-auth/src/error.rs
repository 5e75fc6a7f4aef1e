//! Authentication error types.
//!
//! Every variant denies the request; none of them is fatal to the process.

use crate::jwks::JwksError;

/// Errors returned by bearer token validation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header was sent.
    #[error("Missing credentials: {message}")]
    MissingCredentials {
        /// Why the header was rejected.
        message: String,
    },

    /// The token could not be parsed.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the parse failure.
        message: String,
    },

    /// The `aud` claim does not name this service.
    #[error("Invalid audience")]
    InvalidAudience,

    /// The `iss` claim does not name the configured identity provider.
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// No signing certificate could be resolved for the token.
    #[error("Certificate unavailable: {message}")]
    CertificateUnavailable {
        /// Underlying key resolution failure.
        message: String,
    },

    /// The signature does not verify against the resolved certificate.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The token's `exp` has passed.
    #[error("Token expired")]
    TokenExpired,
}

impl AuthError {
    /// Creates a new `MissingCredentials` error.
    #[must_use]
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::MissingCredentials {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `CertificateUnavailable` error.
    #[must_use]
    pub fn certificate_unavailable(message: impl Into<String>) -> Self {
        Self::CertificateUnavailable {
            message: message.into(),
        }
    }

    /// Short machine-readable code for the error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::MalformedToken { .. } => "malformed_token",
            Self::InvalidAudience => "invalid_audience",
            Self::InvalidIssuer => "invalid_issuer",
            Self::CertificateUnavailable { .. } => "certificate_unavailable",
            Self::SignatureInvalid => "invalid_signature",
            Self::TokenExpired => "token_expired",
        }
    }
}

impl From<JwksError> for AuthError {
    fn from(err: JwksError) -> Self {
        Self::certificate_unavailable(err.to_string())
    }
}
