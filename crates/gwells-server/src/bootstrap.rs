//! Startup wiring: signing key warm-up, database connection and app state.

use std::sync::Arc;

use anyhow::Context;
use gwells_auth::{AuthState, CertificateCache, TokenValidator};

use crate::config::AppConfig;
use crate::db::{PgWellStore, WellStore, create_pool};
use crate::locations::LocationsCache;
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::server::AppState;

/// Loads the first signing certificate, retrying with backoff.
///
/// Returns `false` when every attempt failed. The service still starts;
/// readiness reports degraded and validation keeps trying on demand.
pub async fn warm_up_signing_key(cache: &CertificateCache, retry: &RetryConfig) -> bool {
    match retry_with_backoff(retry, "jwks_warm_up", || cache.warm_up()).await {
        Ok(record) => {
            tracing::info!(kid = %record.kid, expiry = %record.expiry, "Signing certificate loaded");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "No signing certificate at startup; readiness degraded");
            false
        }
    }
}

/// Builds the token validator around a fresh certificate cache.
pub async fn build_auth(cfg: &AppConfig) -> anyhow::Result<AuthState> {
    if !cfg.auth.is_complete() {
        tracing::warn!(
            audience = %cfg.auth.audience,
            issuer = %cfg.auth.issuer,
            "auth.audience or auth.issuer is empty; every bearer token will be rejected"
        );
    }

    let cache = CertificateCache::from_config(&cfg.auth)
        .context("failed to initialise the signing certificate cache")?;
    warm_up_signing_key(&cache, &cfg.startup.retry()).await;

    let validator = TokenValidator::new(&cfg.auth, Arc::new(cache));
    Ok(AuthState::new(Arc::new(validator)))
}

/// Assembles the application state from configuration.
///
/// A signing key outage is tolerated; an unreachable database is not.
pub async fn bootstrap(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let auth = build_auth(cfg).await?;

    let pool = retry_with_backoff(&cfg.startup.retry(), "database_connect", || {
        create_pool(&cfg.database)
    })
    .await
    .context("database unavailable")?;

    let store: Arc<dyn WellStore> = Arc::new(PgWellStore::new(pool));
    let locations = Arc::new(LocationsCache::new(store, cfg.locations.cache_ttl));

    Ok(AppState { auth, locations })
}
