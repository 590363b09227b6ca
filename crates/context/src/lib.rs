// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL LSP - Lexical Context Layer
//!
//! This crate provides the lexical building blocks used by the language server
//! to understand a SQL document without parsing it into a full syntax tree.
//!
//! ## Overview
//!
//! Completion and signature help only know the text *behind* the cursor, so the
//! server scans backward from the cursor instead of parsing forward. Diagnostics
//! need the opposite: a document is carved into statements which are validated
//! independently, and engine error offsets are mapped back onto the document.
//!
//! ## Core Concepts
//!
//! ### Identifiers
//!
//! [`Identifier`] models a name as written in SQL, quoted or not, and implements
//! the engine's folding and quoting rules.
//!
//! ### Backward Iterator
//!
//! [`BackwardIterator`] is a reverse lexer anchored at the cursor. It reads
//! identifiers, dotted chains and argument positions while skipping whitespace
//! and comments.
//!
//! ### Statement Splitting
//!
//! [`StatementSplitter`] lazily yields [`StatementSpan`]s, one per statement,
//! each carrying its original line/column anchor so diagnostics can be remapped
//! with [`StatementSpan::remap_offset`].
//!
//! ## Examples
//!
//! ```rust
//! use pg_sql_lsp_context::{BackwardIterator, split_statements};
//!
//! let mut iter = BackwardIterator::from_position("SELECT * FROM public.", 0, 21);
//! let idents = iter.read_idents(3);
//! assert_eq!(idents[0].name, "public");
//!
//! let spans: Vec<_> = split_statements("SELECT 1; SELECT 2;").collect();
//! assert_eq!(spans.len(), 2);
//! ```

pub mod backward;
pub mod ident;
pub mod span;
pub mod splitter;

// Re-export commonly used types
pub use backward::BackwardIterator;
pub use ident::Identifier;
pub use span::{ExplainStatement, RemappedRange, StatementSpan, split_lines};
pub use splitter::{StatementSplitter, split_statements};
