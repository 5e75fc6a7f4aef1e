//! Axum integration for bearer token authentication.
//!
//! - [`AuthState`] - validator handle, reachable from application state via `FromRef`
//! - [`BearerAuth`] - extractor for handlers that require a valid token
//!
//! `AuthError` implements `IntoResponse`, so a rejected extraction answers
//! `401 Unauthorized` with a `WWW-Authenticate` challenge.

mod auth;
mod error;

pub use auth::{AuthState, BearerAuth};
