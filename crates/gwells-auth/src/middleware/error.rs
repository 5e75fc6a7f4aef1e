//! Error responses for rejected bearer tokens.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Client-facing text for key resolution failures. The cause stays in the log.
const CERTIFICATE_UNAVAILABLE: &str = "Signing certificate unavailable";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::CertificateUnavailable { message } => {
                tracing::warn!(error = %message, "Rejecting token: signing certificate unavailable");
                CERTIFICATE_UNAVAILABLE.to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "error": self.code(),
            "message": message,
        });

        let mut headers = HeaderMap::new();
        let challenge = build_www_authenticate_header(&message);
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }

        (StatusCode::UNAUTHORIZED, headers, Json(body)).into_response()
    }
}

/// Builds the `WWW-Authenticate` challenge for a rejected token.
///
/// Format: `Bearer realm="gwells", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(description: &str) -> String {
    let escaped = description.replace('\\', "\\\\").replace('"', "\\\"");
    format!("Bearer realm=\"gwells\", error=\"invalid_token\", error_description=\"{escaped}\"")
}
