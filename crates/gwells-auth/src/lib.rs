//! # gwells-auth
//!
//! Bearer token validation for the GWELLS API.
//!
//! Access tokens are RS256 JWTs issued by an external identity provider.
//! The provider publishes its signing keys as a JSON Web Key Set; this crate
//! keeps the key needed for verification cached and refreshes it when it
//! expires or a token names a different key.
//!
//! ## Modules
//!
//! - [`config`] - audience, issuer and JWKS settings
//! - [`jwks`] - key set retrieval, key selection and the certificate cache
//! - [`token`] - claims and the [`TokenValidator`]
//! - [`middleware`] - Axum extractor for protected routes
//! - [`error`] - validation failures

pub mod config;
pub mod error;
pub mod jwks;
pub mod middleware;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use jwks::{CertificateCache, CertificateRecord, JwksError, KeyFetcher};
pub use middleware::{AuthState, BearerAuth};
pub use token::{Audience, Claims, TokenValidator};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
