//! Configuration module for the drinks backend.
//!
//! All configuration is loaded from environment variables. The token issuer and
//! audience are required; everything else has a default.

use std::env;
use std::net::{AddrParseError, SocketAddr};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string
    pub database_url: String,
    /// Domain of the token issuer, e.g. `tenant.us.auth0.com`
    pub auth_domain: String,
    /// Audience identifier the tokens must be issued for
    pub api_audience: String,
    /// Where the issuer publishes its signing keys
    pub jwks_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Drop and reseed the drinks table at start-up
    pub reset_database: bool,
}

/// Start-up configuration failure.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidBindAddr(AddrParseError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "Missing required environment variable {}", var),
            ConfigError::InvalidBindAddr(e) => write!(f, "Invalid DRINKS_BIND_ADDR format: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/drinks.sqlite?mode=rwc".to_string());

        let auth_domain = required("AUTH0_DOMAIN")?;
        let api_audience = required("API_AUDIENCE")?;

        let jwks_url = env::var("DRINKS_JWKS_URL")
            .unwrap_or_else(|_| format!("https://{}/.well-known/jwks.json", auth_domain));

        let bind_addr = env::var("DRINKS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(ConfigError::InvalidBindAddr)?;

        let log_level = env::var("DRINKS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let reset_database = env::var("DRINKS_RESET_DB")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            auth_domain,
            api_audience,
            jwks_url,
            bind_addr,
            log_level,
            reset_database,
        })
    }

    /// Issuer claim expected in tokens.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}
