pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod gis;
pub mod handlers;
pub mod locations;
pub mod observability;
pub mod retry;
pub mod server;

pub use bootstrap::bootstrap;
pub use config::{AppConfig, ConfigOverrides, DatabaseConfig, ServerConfig};
pub use db::{PgWellStore, StoreError, WellStore};
pub use locations::LocationsCache;
pub use observability::init_tracing;
pub use server::{AppState, GwellsServer, build_app};
