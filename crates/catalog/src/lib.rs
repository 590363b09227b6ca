// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL LSP - Catalog Layer
//!
//! This crate owns everything the language server knows about the database:
//!
//! - **Metadata**: the immutable [`SchemaCatalog`] snapshot of schemas, tables,
//!   columns, functions, keywords and databases
//! - **Execution**: the narrow [`QueryExecutor`] collaborator trait and a live
//!   sqlx implementation, [`PgExecutor`] (feature `postgresql`)
//! - **Loading**: [`CatalogLoader`], which runs a server-version-specific query
//!   battery concurrently and returns a complete catalog or an error
//! - **Configuration**: [`ConnectionConfig`] and its validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pg_sql_lsp_catalog::{CatalogLoader, QueryExecutor};
//!
//! async fn count_tables(executor: &dyn QueryExecutor) -> usize {
//!     match CatalogLoader::new(executor).load().await {
//!         Ok(catalog) => catalog.tables.len(),
//!         Err(_) => 0,
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod live_postgres;
pub mod loader;
pub mod metadata;
pub mod queries;
pub mod r#trait;

// Re-exports
pub use config::{ConnectionConfig, PoolConfig};
pub use error::{CatalogError, CatalogResult, ConfigError, ExecuteError};
pub use live_postgres::PgExecutor;
pub use loader::CatalogLoader;
pub use metadata::{
    ColumnEntry, DEFAULT_SCHEMA, FunctionEntry, FunctionKind, Overload, SchemaCatalog,
    SchemaEntry, TableEntry,
};
pub use queries::QueryBattery;
pub use r#trait::{FieldDescriptor, QueryExecutor, QueryResult, Record, Row};
