//! Well storage backed by PostgreSQL/PostGIS.

use std::time::Duration;

use async_trait::async_trait;
use sqlx_core::pool::PoolOptions;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{debug, info, instrument};

use crate::config::DatabaseConfig;
use crate::gis::{GeometryError, Point, point_from_column};

/// Type alias for PostgreSQL pool options.
pub type PgPoolOptions = PoolOptions<Postgres>;

const WELL_LOCATIONS_QUERY: &str = "SELECT ST_AsBinary(geom) FROM well";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx_core::Error),

    #[error("invalid well geometry: {0}")]
    Geometry(#[from] GeometryError),
}

/// Read access to well data.
#[async_trait]
pub trait WellStore: Send + Sync {
    /// Returns the location of every well.
    async fn well_locations(&self) -> Result<Vec<Point>, StoreError>;
}

pub struct PgWellStore {
    pool: PgPool,
}

impl PgWellStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WellStore for PgWellStore {
    #[instrument(skip(self))]
    async fn well_locations(&self) -> Result<Vec<Point>, StoreError> {
        let rows: Vec<Option<Vec<u8>>> = query_scalar(WELL_LOCATIONS_QUERY)
            .fetch_all(&self.pool)
            .await?;

        let points = rows
            .iter()
            .map(|geom| point_from_column(geom.as_deref()))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = points.len(), "Loaded well locations");
        Ok(points)
    }
}

/// Creates a connection pool and checks that the database answers.
#[instrument(skip(config), fields(url = %mask_password(&config.connection_url())))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        "Creating PostgreSQL connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .connect(&config.connection_url())
        .await?;

    sqlx_core::query::query::<Postgres>("SELECT 1")
        .execute(&pool)
        .await?;

    debug!("PostgreSQL connection pool created successfully");
    Ok(pool)
}

/// Masks the password in a database URL for logging.
pub fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map_or(0, |p| p + 3);
    if let Some(at_pos) = url[scheme_end..].find('@').map(|p| p + scheme_end)
        && let Some(colon_pos) = url[scheme_end..at_pos].find(':').map(|p| p + scheme_end)
    {
        return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
    }
    url.to_string()
}
