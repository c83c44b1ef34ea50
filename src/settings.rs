//! Runtime settings from environment variables (optionally loaded from `.env`).

use crate::error::ConfigError;
use std::net::{IpAddr, SocketAddr};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/training_registry";
pub const DEFAULT_SCHEMA: &str = "registry";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Where documents and certificates are persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local maps; data is lost on restart.
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND",
                reason: format!("{} (expected postgres or memory)", other),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Schema holding all tables. Must be a valid PostgreSQL identifier.
    pub schema: String,
    pub max_connections: u32,
    pub storage: StorageBackend,
    pub bind_addr: SocketAddr,
    pub body_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let schema = get("REGISTRY_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into());
        if !is_identifier(&schema) {
            return Err(ConfigError::Invalid {
                var: "REGISTRY_SCHEMA",
                reason: format!("'{}' is not a valid identifier", schema),
            });
        }

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => parse_number::<u32>("DB_MAX_CONNECTIONS", &v)?,
            None => 5,
        };
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }

        let storage = match get("STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => StorageBackend::Postgres,
        };

        let host: IpAddr = match get("HOST") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                var: "HOST",
                reason: format!("'{}' is not an IP address", v),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match get("PORT") {
            Some(v) => parse_number::<u16>("PORT", &v)?,
            None => 8080,
        };

        let body_limit = match get("MAX_BODY_BYTES") {
            Some(v) => parse_number::<usize>("MAX_BODY_BYTES", &v)?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            schema,
            max_connections,
            storage,
            bind_addr: SocketAddr::new(host, port),
            body_limit,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, v: &str) -> Result<T, ConfigError> {
    v.parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{}' is not a valid number", v),
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
