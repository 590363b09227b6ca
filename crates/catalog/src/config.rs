// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection configuration
//!
//! A [`ConnectionConfig`] describes how to reach the server either as a
//! `postgres://` URL or as discrete libpq-style fields. Missing fields fall
//! back to the libpq environment variables when the connection is opened.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// SSL mode used when neither the configuration nor `PGSSLMODE` sets one
pub const DEFAULT_SSL_MODE: &str = "verify-full";

const SSL_MODES: [&str; 6] = [
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// Pool tuning and statement timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Bound on each metadata query and `EXPLAIN` dry run
    pub statement_timeout_secs: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout_secs: 10,
            statement_timeout_secs: None,
        }
    }
}

/// Connection parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    pub connection_string: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub ssl_mode: Option<String>,
    pub ssl_root_cert: Option<String>,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
    pub pool: PoolConfig,
}

impl ConnectionConfig {
    /// Configuration taken from a connection URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            connection_string: Some(url.into()),
            ..Self::default()
        }
    }

    /// Configuration taken from the libpq environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration taken from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            connection_string: None,
            host: lookup("PGHOST"),
            port: lookup("PGPORT").and_then(|p| p.parse().ok()),
            user: lookup("PGUSER"),
            password: lookup("PGPASSWORD"),
            database: lookup("PGDATABASE"),
            ssl_mode: lookup("PGSSLMODE"),
            ssl_root_cert: lookup("PGSSLROOTCERT"),
            ssl_cert: lookup("PGSSLCERT"),
            ssl_key: lookup("PGSSLKEY"),
            pool: PoolConfig::default(),
        }
    }

    /// Whether no connection parameter is set
    pub fn is_empty(&self) -> bool {
        self.connection_string.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.user.is_none()
            && self.password.is_none()
            && self.database.is_none()
    }

    /// Fill every unset field from `fallback`
    ///
    /// Pool settings are taken from `self` unless they are the defaults.
    pub fn or(self, fallback: &ConnectionConfig) -> Self {
        let pool = if self.pool == PoolConfig::default() {
            fallback.pool.clone()
        } else {
            self.pool
        };

        Self {
            connection_string: self
                .connection_string
                .or_else(|| fallback.connection_string.clone()),
            host: self.host.or_else(|| fallback.host.clone()),
            port: self.port.or(fallback.port),
            user: self.user.or_else(|| fallback.user.clone()),
            password: self.password.or_else(|| fallback.password.clone()),
            database: self.database.or_else(|| fallback.database.clone()),
            ssl_mode: self.ssl_mode.or_else(|| fallback.ssl_mode.clone()),
            ssl_root_cert: self.ssl_root_cert.or_else(|| fallback.ssl_root_cert.clone()),
            ssl_cert: self.ssl_cert.or_else(|| fallback.ssl_cert.clone()),
            ssl_key: self.ssl_key.or_else(|| fallback.ssl_key.clone()),
            pool,
        }
    }

    /// SSL mode to connect with
    pub fn effective_ssl_mode(&self) -> &str {
        self.ssl_mode.as_deref().unwrap_or(DEFAULT_SSL_MODE)
    }

    /// Check the configuration before any connection attempt
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::MissingConnection);
        }

        if let Some(url) = &self.connection_string {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidConnectionString(
                    "connection string cannot be empty".to_string(),
                ));
            }
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                return Err(ConfigError::InvalidConnectionString(format!(
                    "must start with 'postgresql://' or 'postgres://', got: {}",
                    url.chars().take(15).collect::<String>()
                )));
            }
        }

        if !SSL_MODES.contains(&self.effective_ssl_mode()) {
            return Err(ConfigError::InvalidConnectionString(format!(
                "unknown ssl mode '{}'",
                self.effective_ssl_mode()
            )));
        }

        if self.pool.max_connections == 0 {
            return Err(ConfigError::InvalidPoolConfig(
                "maxConnections must be greater than 0".to_string(),
            ));
        }
        if self.pool.acquire_timeout_secs == 0 {
            return Err(ConfigError::InvalidPoolConfig(
                "acquireTimeoutSecs must be greater than 0".to_string(),
            ));
        }
        if self.pool.statement_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidPoolConfig(
                "statementTimeoutSecs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Human-readable target without credentials, for logs
    pub fn describe(&self) -> String {
        if let Some(url) = &self.connection_string {
            // Drop everything up to the last '@' so passwords never reach the log
            let scheme_end = url.find("://").map_or(0, |i| i + 3);
            let rest = url.rsplit_once('@').map_or(&url[scheme_end..], |(_, host)| host);
            return rest.to_string();
        }

        format!(
            "{}:{}/{}",
            self.host.as_deref().unwrap_or("localhost"),
            self.port.unwrap_or(5432),
            self.database.as_deref().unwrap_or("")
        )
    }
}
