//! Configuration loading from the process environment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::store::PageLimits;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 25;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Which ledger store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub page_limits: PageLimits,
    /// Upper bound on handling one HTTP request.
    pub request_timeout: Duration,
}

impl Config {
    /// Read `BIND_ADDR`, `STORE_BACKEND`, `DATABASE_URL`, `DB_MAX_CONNECTIONS`,
    /// `DEFAULT_PAGE_SIZE`, `MAX_PAGE_SIZE` and `REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;

        let backend = match get("STORE_BACKEND").unwrap_or("memory") {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: get("DATABASE_URL")
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?
                    .to_string(),
                max_connections: parse_or(
                    "DB_MAX_CONNECTIONS",
                    get("DB_MAX_CONNECTIONS"),
                    Some(DEFAULT_MAX_CONNECTIONS),
                )?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    message: format!("expected 'memory' or 'postgres', got '{other}'"),
                });
            }
        };

        let defaults = PageLimits::default();
        let page_limits = PageLimits {
            default_limit: parse_or(
                "DEFAULT_PAGE_SIZE",
                get("DEFAULT_PAGE_SIZE"),
                Some(defaults.default_limit),
            )?,
            max_limit: parse_or("MAX_PAGE_SIZE", get("MAX_PAGE_SIZE"), Some(defaults.max_limit))?,
        };
        if page_limits.default_limit == 0 || page_limits.max_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_PAGE_SIZE",
                message: "page sizes must be positive".to_string(),
            });
        }
        if page_limits.default_limit > page_limits.max_limit {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_PAGE_SIZE",
                message: format!(
                    "{} exceeds MAX_PAGE_SIZE {}",
                    page_limits.default_limit, page_limits.max_limit
                ),
            });
        }

        let timeout_secs: u64 = parse_or(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT_SECS",
                message: "must be positive".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            backend,
            page_limits,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<&str>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}
