//! Server configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `TASKBOARD_BIND_ADDR` | `127.0.0.1:4000` | listen address |
//! | `DATABASE_URL` | unset | `PostgreSQL` URL; the in-memory store is used when unset |
//! | `TASKBOARD_MOVE_TIMEOUT_MS` | `5000` | bound on waiting for column locks |
//! | `TASKBOARD_CHANNEL_CAPACITY` | `256` | per-subscriber event buffer |
//! | `TASKBOARD_DB_POOL_SIZE` | `10` | database connection pool size |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Listen address variable.
pub const BIND_ADDR_VAR: &str = "TASKBOARD_BIND_ADDR";
/// Database URL variable.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
/// Move lock timeout variable, in milliseconds.
pub const MOVE_TIMEOUT_VAR: &str = "TASKBOARD_MOVE_TIMEOUT_MS";
/// Subscriber buffer variable.
pub const CHANNEL_CAPACITY_VAR: &str = "TASKBOARD_CHANNEL_CAPACITY";
/// Pool size variable.
pub const POOL_SIZE_VAR: &str = "TASKBOARD_DB_POOL_SIZE";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";
const DEFAULT_MOVE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_POOL_SIZE: u32 = 10;

/// A configuration variable could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The value failed to parse or is out of range.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings of the board server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// `PostgreSQL` URL, or `None` for the in-memory store.
    pub database_url: Option<String>,
    /// Bound on waiting for column locks during position writes.
    pub move_timeout: Duration,
    /// Events buffered per websocket subscriber before it is dropped.
    pub channel_capacity: usize,
    /// Maximum database connections.
    pub pool_size: u32,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a set variable cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a set variable cannot be
    /// parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = parse_or(BIND_ADDR_VAR, read(BIND_ADDR_VAR), DEFAULT_BIND_ADDR)?;
        let timeout_ms: u64 = parse_or(
            MOVE_TIMEOUT_VAR,
            read(MOVE_TIMEOUT_VAR),
            &DEFAULT_MOVE_TIMEOUT_MS.to_string(),
        )?;
        let channel_capacity: usize = parse_or(
            CHANNEL_CAPACITY_VAR,
            read(CHANNEL_CAPACITY_VAR),
            &DEFAULT_CHANNEL_CAPACITY.to_string(),
        )?;
        let pool_size: u32 = parse_or(
            POOL_SIZE_VAR,
            read(POOL_SIZE_VAR),
            &DEFAULT_POOL_SIZE.to_string(),
        )?;

        ensure_positive(MOVE_TIMEOUT_VAR, timeout_ms)?;
        ensure_positive(CHANNEL_CAPACITY_VAR, channel_capacity)?;
        ensure_positive(POOL_SIZE_VAR, pool_size)?;

        Ok(Self {
            bind_addr,
            database_url: read(DATABASE_URL_VAR),
            move_timeout: Duration::from_millis(timeout_ms),
            channel_capacity,
            pool_size,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            database_url: None,
            move_timeout: Duration::from_millis(DEFAULT_MOVE_TIMEOUT_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or_else(|| default.to_owned());
    raw.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
        name,
        reason: err.to_string(),
        value: raw.clone(),
    })
}

fn ensure_positive<T>(name: &'static str, value: T) -> Result<(), ConfigError>
where
    T: Default + PartialEq + std::fmt::Display,
{
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(())
}
