//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use gwells_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn whoami(BearerAuth(claims): BearerAuth) -> String {
//!     claims.sub
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::{Claims, TokenValidator};

/// State required by the [`BearerAuth`] extractor.
///
/// Include it in the application state and expose it with `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Shared token validator.
    pub validator: Arc<TokenValidator>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(validator: Arc<TokenValidator>) -> Self {
        Self { validator }
    }
}

/// Axum extractor that validates the request's bearer token.
///
/// Yields the verified [`Claims`]. Rejects with [`AuthError`] when the
/// `Authorization` header is missing, not a bearer credential, or the token
/// fails validation.
pub struct BearerAuth(pub Claims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::missing_credentials("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AuthError::missing_credentials("Authorization header is not ASCII"))?;

        let token = bearer_token(header)
            .ok_or_else(|| AuthError::missing_credentials("Expected a Bearer token"))?;

        let claims = auth_state.validator.validate(token).await.map_err(|e| {
            tracing::debug!(error = %e, code = e.code(), "Bearer token rejected");
            e
        })?;

        tracing::debug!(sub = %claims.sub, "Bearer token accepted");
        Ok(Self(claims))
    }
}

/// Returns the token of a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively; a blank token yields `None`.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("  Bearer   abc  "), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token(""), None);
    }
}
