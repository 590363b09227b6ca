// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Diagnostics
//!
//! Statements are validated by asking the engine to plan them: each statement
//! is wrapped in `EXPLAIN`, submitted, and a rejection becomes a diagnostic at
//! the remapped error position.
//!
//! ## Pass lifecycle
//!
//! ```text
//! Idle -> Splitting -> Validating(0) -> ... -> Validating(n-1) -> Done
//! ```
//!
//! A rejected statement does not stop the pass. A connection failure does:
//! the remaining statements are skipped and the diagnostics gathered so far
//! are still reported.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pg_sql_lsp_lsp::diagnostic::DiagnosticValidator;
//!
//! let mut validator = DiagnosticValidator::new(executor.as_ref());
//! let report = validator.validate(&document.get_content()).await;
//! let diagnostics: Vec<_> = report
//!     .diagnostics
//!     .iter()
//!     .map(|d| d.to_lsp(&document))
//!     .collect();
//! ```

use std::time::Instant;

use pg_sql_lsp_catalog::{ExecuteError, QueryExecutor};
use pg_sql_lsp_context::{RemappedRange, split_statements};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};
use tracing::{debug, info, warn};

use crate::document::Document;

/// `source` of every published diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "datasets";

/// An engine rejection mapped onto the document
///
/// Columns count characters; [`to_lsp`](Self::to_lsp) converts them to the
/// protocol's UTF-16 positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDiagnostic {
    pub message: String,
    pub range: RemappedRange,
}

impl SqlDiagnostic {
    pub fn new(message: impl Into<String>, range: RemappedRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    /// Convert to LSP diagnostic format against the validated document
    pub fn to_lsp(&self, document: &Document) -> Diagnostic {
        let start = document.lsp_position(self.range.line, self.range.start_column);
        let end = document.lsp_position(self.range.line, self.range.end_column);

        Diagnostic {
            range: Range::new(start, end),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}

/// Where a validation pass is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Splitting,
    /// Probing the statement with this index
    Validating(usize),
    Done,
}

/// How a validation pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every statement was validated
    Completed,
    /// The connection failed while probing `statement`
    Aborted { statement: usize, reason: String },
}

/// Result of one validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub diagnostics: Vec<SqlDiagnostic>,
    pub statements: usize,
    pub outcome: PassOutcome,
}

/// Validates documents through a query executor
pub struct DiagnosticValidator<'a> {
    executor: &'a dyn QueryExecutor,
    state: PassState,
}

impl<'a> DiagnosticValidator<'a> {
    pub fn new(executor: &'a dyn QueryExecutor) -> Self {
        Self {
            executor,
            state: PassState::Idle,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    fn transition(&mut self, next: PassState) {
        debug!(from = ?self.state, to = ?next, "Validation pass state");
        self.state = next;
    }

    /// Run one pass over `text`
    pub async fn validate(&mut self, text: &str) -> ValidationReport {
        let started = Instant::now();

        self.transition(PassState::Splitting);
        let spans: Vec<_> = split_statements(text).collect();

        let mut diagnostics = Vec::new();
        let mut outcome = PassOutcome::Completed;

        for (index, span) in spans.iter().enumerate() {
            self.transition(PassState::Validating(index));
            let explain = span.explain_statement();

            match self.executor.dry_run(&explain.sql).await {
                Ok(_) => {}
                Err(ExecuteError::Engine { message, position }) => {
                    let range = span.remap_engine_position(&explain, position);
                    debug!(statement = index, line = range.line, %message, "Statement rejected");
                    diagnostics.push(SqlDiagnostic::new(message, range));
                }
                Err(ExecuteError::Connection(reason)) => {
                    warn!(statement = index, %reason, "Connection failed; aborting validation pass");
                    outcome = PassOutcome::Aborted {
                        statement: index,
                        reason,
                    };
                    break;
                }
            }
        }

        self.transition(PassState::Done);
        info!(
            statements = spans.len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation pass finished"
        );

        ValidationReport {
            diagnostics,
            statements: spans.len(),
            outcome,
        }
    }
}
