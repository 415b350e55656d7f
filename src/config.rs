//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;

use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};

use crate::constants::{
    DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS, DEFAULT_DATABASE_MAX_CONNECTIONS,
    DEFAULT_JWT_EXPIRY_HOURS, DEFAULT_LOG_LEVEL, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub broker: BrokerConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// Emit logs as JSON lines instead of the human-readable format
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub connection: ConnectionInfo,
}

/// JWT authentication configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

/// Message broker configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            database: DatabaseConfig::from_lookup(&lookup)?,
            redis: RedisConfig::from_lookup(&lookup)?,
            jwt: JwtConfig::from_lookup(&lookup)?,
            broker: BrokerConfig::from_lookup(&lookup)?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl ServerConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: lookup("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            port: parsed_or(lookup, "SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            json_logs: lookup("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

impl DatabaseConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required(lookup, "DATABASE_URL")?,
            max_connections: parsed_or(
                lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
            acquire_timeout_secs: parsed_or(
                lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
            )?,
        })
    }
}

impl RedisConfig {
    /// `REDIS_URL` wins; otherwise the target is built from host, port and password.
    ///
    /// The password never passes through a URL, so it needs no escaping.
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL").filter(|url| !url.trim().is_empty()) {
            let connection = url
                .trim()
                .into_connection_info()
                .map_err(|_| ConfigError::InvalidValue("REDIS_URL".to_string()))?;
            return Ok(Self { connection });
        }

        let host = lookup("REDIS_HOST").unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string());
        let port: u16 = parsed_or(lookup, "REDIS_PORT", DEFAULT_REDIS_PORT)?;

        Ok(Self {
            connection: ConnectionInfo {
                addr: ConnectionAddr::Tcp(host, port),
                redis: RedisConnectionInfo {
                    password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
                    ..RedisConnectionInfo::default()
                },
            },
        })
    }
}

impl JwtConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            secret: required(lookup, "JWT_SECRET")?,
            expiry_hours: parsed_or(lookup, "JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?,
        })
    }
}

impl BrokerConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required(lookup, "RABBITMQ_URL")?,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
