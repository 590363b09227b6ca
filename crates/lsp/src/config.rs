// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server Configuration
//!
//! The connection used for catalog loading and validation can come from four
//! places. In decreasing priority:
//!
//! 1. the `pgSqlLsp/setConnection` request
//! 2. `workspace/didChangeConfiguration` settings under `"pgSqlLsp"`
//! 3. `initializationOptions`
//! 4. the libpq environment variables
//!
//! Sources are merged field by field, except that once a source supplies a
//! connection URL no lower source is consulted.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pg_sql_lsp_lsp::ServerConfig;
//! use serde_json::json;
//!
//! let mut config = ServerConfig::from_env();
//! config.apply_settings(&json!({
//!     "pgSqlLsp": { "connectionString": "postgres://localhost/app" }
//! }))?;
//! let connection = config.resolve()?;
//! ```

use pg_sql_lsp_catalog::{ConfigError, ConnectionConfig};
use serde_json::Value;

/// Key of this server's section in client settings
pub const SETTINGS_KEY: &str = "pgSqlLsp";

/// Connection sources known to the server
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    request: Option<ConnectionConfig>,
    settings: Option<ConnectionConfig>,
    init: Option<ConnectionConfig>,
    env: ConnectionConfig,
}

impl ServerConfig {
    /// Configuration with the libpq environment as the only source
    pub fn from_env() -> Self {
        Self::with_env(ConnectionConfig::from_env())
    }

    pub fn with_env(env: ConnectionConfig) -> Self {
        Self {
            env,
            ..Self::default()
        }
    }

    /// Record `initializationOptions`
    ///
    /// Both `{"pgSqlLsp": {...}}` and a bare connection object are accepted.
    pub fn set_init_options(&mut self, options: Option<&Value>) -> Result<(), ConfigError> {
        self.init = match options {
            Some(options) => {
                let section = options.get(SETTINGS_KEY).unwrap_or(options);
                non_empty(connection_from_value(section)?)
            }
            None => None,
        };
        Ok(())
    }

    /// Record a settings payload, returning whether it carried our section
    pub fn apply_settings(&mut self, settings: &Value) -> Result<bool, ConfigError> {
        match from_lsp_settings(settings) {
            Some(connection) => {
                self.settings = non_empty(connection?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record an explicit connection request
    pub fn set_request(&mut self, connection: ConnectionConfig) {
        self.request = non_empty(connection);
    }

    /// Merge every source into the connection to use
    pub fn resolve(&self) -> Result<ConnectionConfig, ConfigError> {
        let sources = [
            self.request.as_ref(),
            self.settings.as_ref(),
            self.init.as_ref(),
            Some(&self.env),
        ];

        let mut merged = ConnectionConfig::default();
        for source in sources.into_iter().flatten() {
            merged = merged.or(source);
            if merged.connection_string.is_some() {
                break;
            }
        }

        merged.validate()?;
        Ok(merged)
    }
}

/// Parse a connection from a settings payload
///
/// Returns `None` when the payload has no `"pgSqlLsp"` section.
pub fn from_lsp_settings(settings: &Value) -> Option<Result<ConnectionConfig, ConfigError>> {
    settings.get(SETTINGS_KEY).map(connection_from_value)
}

/// Parse a connection given either as a URL string or as an object
pub fn connection_from_value(value: &Value) -> Result<ConnectionConfig, ConfigError> {
    match value {
        Value::String(url) => Ok(ConnectionConfig::from_url(url.clone())),
        Value::Null => Ok(ConnectionConfig::default()),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::InvalidConnectionString(e.to_string())),
        other => Err(ConfigError::InvalidConnectionString(format!(
            "expected a URL or an object, got {other}"
        ))),
    }
}

fn non_empty(connection: ConnectionConfig) -> Option<ConnectionConfig> {
    (!connection.is_empty()).then_some(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> ConnectionConfig {
        ConnectionConfig {
            host: Some("envhost".into()),
            user: Some("envuser".into()),
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn test_from_lsp_settings() {
        let settings = json!({
            "pgSqlLsp": { "connectionString": "postgres://localhost/app" }
        });
        let connection = from_lsp_settings(&settings).unwrap().unwrap();
        assert_eq!(
            connection.connection_string.as_deref(),
            Some("postgres://localhost/app")
        );

        assert!(from_lsp_settings(&json!({ "other": {} })).is_none());
        assert!(from_lsp_settings(&json!({ "pgSqlLsp": 42 })).unwrap().is_err());
        assert!(
            from_lsp_settings(&json!({ "pgSqlLsp": { "port": "not a number" } }))
                .unwrap()
                .is_err()
        );
    }

    #[test]
    fn test_resolve_priority() {
        let mut config = ServerConfig::with_env(env());
        config
            .set_init_options(Some(&json!({ "database": "init_db", "port": 5433 })))
            .unwrap();
        config
            .apply_settings(&json!({ "pgSqlLsp": { "database": "settings_db" } }))
            .unwrap();

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.database.as_deref(), Some("settings_db"));
        assert_eq!(resolved.port, Some(5433));
        assert_eq!(resolved.host.as_deref(), Some("envhost"));

        config.set_request(ConnectionConfig {
            database: Some("request_db".into()),
            ..ConnectionConfig::default()
        });
        assert_eq!(
            config.resolve().unwrap().database.as_deref(),
            Some("request_db")
        );
    }

    #[test]
    fn test_url_stops_merging() {
        let mut config = ServerConfig::with_env(env());
        config
            .set_init_options(Some(&json!({
                "pgSqlLsp": "postgres://urlhost/app"
            })))
            .unwrap();

        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.connection_string.as_deref(),
            Some("postgres://urlhost/app")
        );
        assert_eq!(resolved.host, None);
        assert_eq!(resolved.user, None);
    }

    #[test]
    fn test_resolve_without_sources() {
        let config = ServerConfig::with_env(ConnectionConfig::default());
        assert_eq!(config.resolve(), Err(ConfigError::MissingConnection));

        let mut config = ServerConfig::with_env(ConnectionConfig::default());
        config
            .apply_settings(&json!({ "pgSqlLsp": "mysql://elsewhere/db" }))
            .unwrap();
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::InvalidConnectionString(_))
        ));
    }
}
