/// Service configuration module
/// Loads settings from the environment (after `.env`), with CLI overrides applied in `main`.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::auth::DEV_JWT_SECRET;

const DEFAULT_BIND: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ERROR_LOG_PATH: &str = "error.log";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where queries are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidConfig(format!(
                "Unknown STORE_BACKEND `{other}` (expected `postgres` or `memory`)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub error_log_path: PathBuf,
    /// Honour `x-forwarded-for` / `x-real-ip` when identifying clients.
    pub trust_proxy: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("API_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidConfig(format!("Invalid API_BIND `{bind_raw}` ({e})"))
        })?;

        let store_backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidConfig(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got `{raw}`"
                    ))
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let error_log_path = lookup("ERROR_LOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_LOG_PATH));

        let trust_proxy = match lookup("TRUST_PROXY") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidConfig(format!(
                    "TRUST_PROXY must be true or false, got `{raw}`"
                ))
            })?,
            None => false,
        };

        Ok(AppConfig {
            bind_addr,
            store_backend,
            database_url,
            database_max_connections,
            jwt_secret,
            allowed_origins,
            error_log_path,
            trust_proxy,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// The database URL, required when the Postgres backend is selected.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URL".to_string()))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3001".parse::<SocketAddr>().unwrap());
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.database_max_connections, 5);
        assert!(config.uses_dev_secret());
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.error_log_path, PathBuf::from("error.log"));
        assert!(config.require_database_url().is_err());
        assert!(!config.trust_proxy);
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("API_BIND", "127.0.0.1:8080"),
            ("STORE_BACKEND", "memory"),
            ("DATABASE_URL", "postgres://localhost/contact"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("JWT_SECRET", "s3cret"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, https://example.com,"),
            ("ERROR_LOG_PATH", "/var/log/contact/error.log"),
            ("TRUST_PROXY", "true"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://localhost/contact"
        );
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://example.com"]
        );
        assert_eq!(
            config.error_log_path,
            PathBuf::from("/var/log/contact/error.log")
        );
        assert!(config.trust_proxy);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("API_BIND", "not-an-addr")]).is_err());
        assert!(load(&[("STORE_BACKEND", "mongo")]).is_err());
        assert!(load(&[("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("DATABASE_MAX_CONNECTIONS", "many")]).is_err());
        assert!(load(&[("TRUST_PROXY", "maybe")]).is_err());
    }
}
