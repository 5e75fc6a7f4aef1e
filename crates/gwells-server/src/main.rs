use clap::Parser;

use gwells_server::cli::Cli;
use gwells_server::config::loader::{DEFAULT_CONFIG_FILE, load_config_with_overrides};
use gwells_server::db::mask_password;
use gwells_server::{GwellsServer, bootstrap};

#[tokio::main]
async fn main() {
    // Legacy deployments ship DBHOST, AUTH_AUDIENCE etc. in .env
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    // Parsed after .env so its values feed the env fallbacks
    let cli = Cli::parse();

    gwells_server::observability::init_tracing();

    let config_path = cli.config_path();
    let cfg = match load_config_with_overrides(config_path.as_deref(), &cli.overrides()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    gwells_server::observability::apply_logging_level(&cfg.logging.level);

    tracing::info!(
        path = config_path.as_deref().unwrap_or(DEFAULT_CONFIG_FILE),
        database = %mask_password(&cfg.database.connection_url()),
        jwks_endpoint = %cfg.auth.jwks_endpoint,
        "Configuration loaded"
    );

    let state = match bootstrap(&cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(err) = GwellsServer::new(cfg.addr(), state).run().await {
        eprintln!("Server error: {err:#}");
        std::process::exit(1);
    }
}
