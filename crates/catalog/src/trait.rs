// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Query execution collaborator
//!
//! The language core only needs to run a SQL string and read text values back,
//! so the trait is deliberately narrow. Values are kept in the engine's text
//! representation (booleans are `t`/`f`, JSON is JSON text).

use crate::error::{CatalogError, CatalogResult, ExecuteError};

/// Column descriptor of a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One result row; `None` is SQL `NULL`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }
}

/// Rows and field descriptors returned by [`QueryExecutor::execute`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(fields: Vec<FieldDescriptor>, rows: Vec<Row>) -> Self {
        Self { fields, rows }
    }

    /// Build a result from field names and rows of non-null values
    pub fn from_text(fields: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            fields: fields.iter().map(|name| FieldDescriptor::new(*name)).collect(),
            rows: rows
                .iter()
                .map(|row| Row::new(row.iter().map(|v| Some(v.to_string())).collect()))
                .collect(),
        }
    }

    /// Iterate rows with by-name access, tagging errors with `query`
    pub fn records<'a>(&'a self, query: &'static str) -> impl Iterator<Item = Record<'a>> + 'a {
        self.rows.iter().map(move |row| Record {
            query,
            fields: &self.fields,
            row,
        })
    }
}

/// Borrowed view of one row with by-name accessors
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    query: &'static str,
    fields: &'a [FieldDescriptor],
    row: &'a Row,
}

impl<'a> Record<'a> {
    /// Nullable value of a column
    pub fn get(&self, column: &str) -> CatalogResult<Option<&'a str>> {
        let index = self
            .fields
            .iter()
            .position(|field| field.name == column)
            .ok_or_else(|| CatalogError::MissingColumn {
                query: self.query,
                column: column.to_string(),
            })?;

        Ok(self.row.values.get(index).and_then(|v| v.as_deref()))
    }

    /// Non-null value of a column
    pub fn text(&self, column: &str) -> CatalogResult<&'a str> {
        self.get(column)?.ok_or_else(|| CatalogError::InvalidRow {
            query: self.query,
            reason: format!("'{column}' is NULL"),
        })
    }

    /// Boolean column in text form
    pub fn flag(&self, column: &str) -> CatalogResult<bool> {
        match self.text(column)? {
            "t" | "true" => Ok(true),
            "f" | "false" => Ok(false),
            other => Err(CatalogError::InvalidRow {
                query: self.query,
                reason: format!("'{column}' is not a boolean: {other}"),
            }),
        }
    }
}

/// Runs SQL against the active connection
///
/// Implementations must report rejected statements as
/// [`ExecuteError::Engine`] and transport failures as
/// [`ExecuteError::Connection`].
///
/// # Examples
///
/// ```rust,ignore
/// use pg_sql_lsp_catalog::{QueryExecutor, ExecuteError};
///
/// async fn error_position(executor: &dyn QueryExecutor) -> Option<usize> {
///     match executor.dry_run("EXPLAIN SELECT nope").await {
///         Err(ExecuteError::Engine { position, .. }) => position,
///         _ => None,
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute `sql` and return all rows
    async fn execute(&self, sql: &str) -> Result<QueryResult, ExecuteError>;

    /// Run a single statement that must not change anything
    ///
    /// Live executors submit `sql` as one command inside a read-only
    /// transaction that is always rolled back. The default forwards to
    /// [`execute`](Self::execute).
    async fn dry_run(&self, sql: &str) -> Result<QueryResult, ExecuteError> {
        self.execute(sql).await
    }
}
