// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion module
//!
//! Completion is driven by the trigger character and by what the
//! [`BackwardIterator`] reads behind the cursor. Branches are exclusive and
//! checked in order:
//!
//! ```text
//! '"'  just inside an opening quote
//!        "users".|"  -> columns of the table before the dot
//!        |"          -> every table name
//! '.'  dotted chain behind the cursor (up to three segments)
//!        schema.|    -> tables of the schema
//!        table.|     -> columns of the table in the default schema
//! none / ' '  schemas, tables, functions, keywords and databases
//! ```
//!
//! A lookup that finds nothing yields an empty list; completion never fails.

pub mod render;

use pg_sql_lsp_catalog::{DEFAULT_SCHEMA, SchemaCatalog};
use pg_sql_lsp_context::{BackwardIterator, Identifier};
use tower_lsp::lsp_types::CompletionItem;
use tracing::debug;

use crate::completion::render::CompletionRenderer;

/// Maximum number of dotted segments read behind a `.` trigger
const MAX_QUALIFIER_LEVELS: usize = 3;

/// Resolves completion candidates against one catalog snapshot
pub struct CompletionResolver<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> CompletionResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Complete at character `offset` of `text`
    pub fn resolve(&self, text: &str, offset: usize, trigger: Option<&str>) -> Vec<CompletionItem> {
        let mut iter = BackwardIterator::new(text, offset);

        let items = match trigger {
            Some("\"") => self.complete_quoted(&mut iter),
            Some(".") => self.complete_member(&mut iter),
            _ => self.complete_all(),
        };

        debug!(?trigger, offset, items = items.len(), "Resolved completion");
        items
    }

    /// Identifier start inside a just-opened double quote
    fn complete_quoted(&self, iter: &mut BackwardIterator) -> Vec<CompletionItem> {
        if !iter.is_forward_double_quote() {
            return Vec::new();
        }
        iter.previous_char();

        if !iter.is_next_period() {
            return self
                .catalog
                .tables
                .iter()
                .map(CompletionRenderer::quoted_table_item)
                .collect();
        }

        let Some(ident) = Identifier::from_raw(&iter.read_ident()) else {
            return Vec::new();
        };
        self.catalog
            .find_table(None, &ident)
            .map(|table| table.columns.iter().map(CompletionRenderer::column_item).collect())
            .unwrap_or_default()
    }

    /// Member access after `.`
    fn complete_member(&self, iter: &mut BackwardIterator) -> Vec<CompletionItem> {
        let idents = iter.read_idents(MAX_QUALIFIER_LEVELS);
        let Some(first) = idents.first() else {
            return Vec::new();
        };

        let (schema, rest) = match self.catalog.find_schema(first) {
            Some(schema) => (schema.name.as_str(), &idents[1..]),
            None => (DEFAULT_SCHEMA, &idents[..]),
        };

        match rest.first() {
            None => self
                .catalog
                .tables_in_schema(schema)
                .map(|table| CompletionRenderer::table_item(table, false))
                .collect(),
            Some(table) => self
                .catalog
                .find_table(Some(schema), table)
                .map(|table| table.columns.iter().map(CompletionRenderer::column_item).collect())
                .unwrap_or_default(),
        }
    }

    /// Everything that can start an unqualified name
    fn complete_all(&self) -> Vec<CompletionItem> {
        let catalog = self.catalog;
        let mut items = Vec::with_capacity(
            catalog.schemas.len()
                + catalog.tables.len()
                + catalog.functions.len()
                + catalog.keywords.len()
                + catalog.databases.len(),
        );

        items.extend(catalog.schemas.iter().map(CompletionRenderer::schema_item));
        items.extend(
            catalog
                .tables
                .iter()
                .map(|table| CompletionRenderer::table_item(table, true)),
        );
        items.extend(catalog.functions.iter().map(CompletionRenderer::function_item));
        items.extend(
            catalog
                .keywords
                .iter()
                .map(|keyword| CompletionRenderer::keyword_item(keyword)),
        );
        items.extend(
            catalog
                .databases
                .iter()
                .map(|database| CompletionRenderer::database_item(database)),
        );

        items
    }
}
