use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;

/// Command-line flags. Each database and auth flag can also be set through
/// the plain environment variable named in its help text.
#[derive(Debug, Parser)]
#[command(name = "gwells-server")]
#[command(about = "GWELLS well locations API")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML); defaults to ./gwells.toml when present
    #[arg(long, env = "GWELLS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database driver
    #[arg(long, env = "DBDRIVER")]
    pub dbdriver: Option<String>,

    /// Database username
    #[arg(long, env = "DBUSER")]
    pub dbuser: Option<String>,

    /// Database password
    #[arg(long, env = "DBPASS", hide_env_values = true)]
    pub dbpass: Option<String>,

    /// Database name
    #[arg(long, env = "DBNAME")]
    pub dbname: Option<String>,

    /// Database service host
    #[arg(long, env = "DBHOST")]
    pub dbhost: Option<String>,

    /// Database service port
    #[arg(long, env = "DBPORT")]
    pub dbport: Option<u16>,

    /// Database SSL mode
    #[arg(long, env = "DBSSLMODE")]
    pub dbsslmode: Option<String>,

    /// Expected `aud` claim of access tokens
    #[arg(long, env = "AUTH_AUDIENCE")]
    pub auth_audience: Option<String>,

    /// Expected `iss` claim of access tokens
    #[arg(long, env = "AUTH_ISSUER")]
    pub auth_issuer: Option<String>,

    /// JWKS URL, absolute or relative to the issuer
    #[arg(long, env = "JWKS_ENDPOINT")]
    pub jwks_endpoint: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn config_path(&self) -> Option<String> {
        self.config
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_driver: self.dbdriver.clone(),
            db_user: self.dbuser.clone(),
            db_password: self.dbpass.clone(),
            db_name: self.dbname.clone(),
            db_host: self.dbhost.clone(),
            db_port: self.dbport,
            db_sslmode: self.dbsslmode.clone(),
            auth_audience: self.auth_audience.clone(),
            auth_issuer: self.auth_issuer.clone(),
            jwks_endpoint: self.jwks_endpoint.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
        }
    }
}
