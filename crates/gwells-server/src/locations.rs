//! Public well locations endpoint.
//!
//! The full feature collection is rendered once and served from memory until
//! the cache TTL passes. Concurrent misses share one database query; failed
//! loads are not cached.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use moka::future::Cache;

use crate::db::{StoreError, WellStore};
use crate::gis::render_feature_collection;

#[derive(Debug, thiserror::Error)]
pub enum LocationsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to render feature collection: {0}")]
    Render(#[from] serde_json::Error),
}

/// Well locations rendered as GeoJSON, cached for a fixed TTL.
pub struct LocationsCache {
    store: Arc<dyn WellStore>,
    rendered: Cache<(), Bytes>,
}

impl LocationsCache {
    pub fn new(store: Arc<dyn WellStore>, ttl: Duration) -> Self {
        Self {
            store,
            rendered: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Returns the rendered feature collection, loading it on a miss.
    pub async fn feature_collection(&self) -> Result<Bytes, Arc<LocationsError>> {
        if let Some(body) = self.rendered.get(&()).await {
            tracing::debug!("Responding with cached well locations");
            return Ok(body);
        }

        self.rendered
            .try_get_with((), async {
                tracing::info!("Loading well locations from database");
                let points = self.store.well_locations().await?;
                let body = render_feature_collection(&points)?;
                tracing::info!(wells = points.len(), bytes = body.len(), "Well locations cached");
                Ok::<_, LocationsError>(Bytes::from(body))
            })
            .await
    }
}

pub async fn well_locations(State(locations): State<Arc<LocationsCache>>) -> Response {
    match locations.feature_collection().await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to load well locations");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::INTERNAL_SERVER_ERROR
                    .canonical_reason()
                    .unwrap_or("Internal Server Error"),
            )
                .into_response()
        }
    }
}
