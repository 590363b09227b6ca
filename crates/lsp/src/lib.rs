// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL LSP - Language Server Protocol
//!
//! This crate provides the LSP server for PostgreSQL documents.
//!
//! ## Overview
//!
//! The LSP server provides:
//! - Completion of schemas, tables, columns, functions, keywords and databases
//! - Signature help for catalog functions
//! - Diagnostics produced by asking the engine to plan each statement
//! - Multi-document management with full text sync
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Client (VS Code, etc.)          │
//! └──────────────┬──────────────────────────┘
//!                │ LSP Protocol
//!                ↓
//! ┌─────────────────────────────────────────┐
//! │         LSP Backend (tower-lsp)         │
//! ├─────────────────────────────────────────┤
//! │  • did_open / did_change / did_close    │
//! │  • completion / signatureHelp           │
//! │  • pgSqlLsp/setConnection               │
//! └──────────────┬──────────────────────────┘
//!                │
//!         ┌──────┴──────┬────────────────┐
//!         ↓             ↓                ↓
//! ┌────────────┐ ┌──────────┐  ┌──────────────────┐
//! │  Catalog   │ │ Document │  │    Validation    │
//! │  Manager   │ │   Store  │  │    Scheduler     │
//! └────────────┘ └──────────┘  └──────────────────┘
//! ```
//!
//! ## Configuration
//!
//! Connection settings are merged from these sources, highest priority first:
//!
//! 1. A `pgSqlLsp/setConnection` request
//! 2. Client settings
//! ```json
//! {
//!   "pgSqlLsp": {
//!     "connectionString": "postgres://app@localhost:5432/app"
//!   }
//! }
//! ```
//! 3. `initializationOptions`
//! 4. `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`, `PGDATABASE`, `PGSSLMODE`
//!
//! ## Error Handling
//!
//! The server degrades instead of failing:
//! - No connection: completion uses an empty catalog, validation is skipped
//! - Catalog reload failure: the previous catalog stays active, the failure
//!   goes to the client log
//! - Connection loss during validation: diagnostics found so far are published
//!
//! ## Testing
//!
//! ```bash
//! cargo test -p pg-sql-lsp-lsp
//! ```

pub mod backend;
pub mod catalog_manager;
pub mod completion;
pub mod config;
pub mod diagnostic;
pub mod document;
pub mod signature;
pub mod validation;

// Re-exports for convenience
pub use backend::{CatalogStatus, LspBackend, LspError};
pub use catalog_manager::CatalogManager;
pub use completion::CompletionResolver;
pub use config::ServerConfig;
pub use diagnostic::{
    DIAGNOSTIC_SOURCE, DiagnosticValidator, PassOutcome, PassState, SqlDiagnostic,
    ValidationReport,
};
pub use document::{Document, DocumentError, DocumentStore};
pub use signature::SignatureResolver;
pub use validation::{DiagnosticSink, ValidationScheduler};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name
pub const SERVER_NAME: &str = "pg-sql-lsp";
