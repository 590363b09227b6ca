// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for pg-sql-lsp
//!
//! This crate provides common testing components including:
//! - A scriptable [`QueryExecutor`](pg_sql_lsp_catalog::QueryExecutor) that
//!   stands in for a live server
//! - Catalog and SQL fixtures shared by the crates' integration tests

pub mod fixtures;
pub mod mock_executor;

// Re-exports for convenience
pub use fixtures::{CatalogFixtures, SqlFixtures};
pub use mock_executor::MockExecutor;
