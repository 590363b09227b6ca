// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion rendering
//!
//! Converts catalog entries into LSP completion items.

use pg_sql_lsp_catalog::{ColumnEntry, DEFAULT_SCHEMA, FunctionEntry, SchemaEntry, TableEntry};
use pg_sql_lsp_context::Identifier;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Documentation};

/// Completion renderer
pub struct CompletionRenderer;

impl CompletionRenderer {
    /// Column item, detailed with its data type
    ///
    /// Sort text keeps columns in table order rather than alphabetical.
    pub fn column_item(column: &ColumnEntry) -> CompletionItem {
        CompletionItem {
            label: column.name.clone(),
            kind: Some(CompletionItemKind::PROPERTY),
            detail: Some(column.data_type.clone()),
            insert_text: Self::quoted_insert(&column.name),
            sort_text: Some(format!("{:05}", column.ordinal.max(0))),
            ..Default::default()
        }
    }

    /// Table name as typed inside an already opened quote
    pub fn quoted_table_item(table: &TableEntry) -> CompletionItem {
        CompletionItem {
            label: table.name.clone(),
            kind: Some(CompletionItemKind::CLASS),
            detail: Self::schema_detail(table),
            insert_text: Some(table.name.replace('"', "\"\"")),
            ..Default::default()
        }
    }

    /// Table or view item
    ///
    /// With `qualify`, tables outside the default schema insert their
    /// schema-qualified name.
    pub fn table_item(table: &TableEntry, qualify: bool) -> CompletionItem {
        let name = Identifier::quote_if_needed(&table.name);
        let insert_text = if qualify && table.schema != DEFAULT_SCHEMA {
            format!("{}.{}", Identifier::quote_if_needed(&table.schema), name)
        } else {
            name
        };

        CompletionItem {
            kind: Some(if table.is_table {
                CompletionItemKind::CLASS
            } else {
                CompletionItemKind::INTERFACE
            }),
            detail: Self::schema_detail(table),
            insert_text: (insert_text != table.name).then_some(insert_text),
            label: table.name.clone(),
            ..Default::default()
        }
    }

    pub fn schema_item(schema: &SchemaEntry) -> CompletionItem {
        CompletionItem {
            label: schema.name.clone(),
            kind: Some(CompletionItemKind::MODULE),
            insert_text: Self::quoted_insert(&schema.name),
            ..Default::default()
        }
    }

    /// Function item, detailed with its result type and first description
    pub fn function_item(function: &FunctionEntry) -> CompletionItem {
        CompletionItem {
            label: function.name.clone(),
            kind: Some(CompletionItemKind::FUNCTION),
            detail: (!function.result_type.is_empty()).then(|| function.result_type.clone()),
            documentation: function
                .description()
                .map(|d| Documentation::String(d.to_string())),
            ..Default::default()
        }
    }

    pub fn keyword_item(keyword: &str) -> CompletionItem {
        CompletionItem {
            label: keyword.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            ..Default::default()
        }
    }

    pub fn database_item(database: &str) -> CompletionItem {
        CompletionItem {
            label: database.to_string(),
            kind: Some(CompletionItemKind::MODULE),
            detail: Some("database".to_string()),
            ..Default::default()
        }
    }

    fn schema_detail(table: &TableEntry) -> Option<String> {
        (table.schema != DEFAULT_SCHEMA).then(|| table.schema.clone())
    }

    fn quoted_insert(name: &str) -> Option<String> {
        let quoted = Identifier::quote_if_needed(name);
        (quoted != name).then_some(quoted)
    }
}
