use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use gwells_auth::{AuthState, BearerAuth};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    auth: &'static str,
}

/// Identity of the caller, taken from a verified access token.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub sub: String,
    pub iss: String,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once a signing certificate is cached; degraded otherwise.
pub async fn readyz(State(auth): State<AuthState>) -> impl IntoResponse {
    if auth.validator.cache().current().is_some() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                auth: "ok",
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "degraded",
                auth: "unavailable",
            }),
        )
    }
}

pub async fn userinfo(
    State(auth): State<AuthState>,
    BearerAuth(claims): BearerAuth,
) -> Json<UserInfo> {
    let validator = &auth.validator;
    Json(UserInfo {
        groups: validator.groups(&claims),
        roles: validator.roles(&claims),
        sub: claims.sub,
        iss: claims.iss,
    })
}
