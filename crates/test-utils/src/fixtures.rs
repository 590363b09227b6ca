// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures: a sample catalog and sample SQL documents

use pg_sql_lsp_catalog::{
    ColumnEntry, FunctionEntry, FunctionKind, Overload, SchemaCatalog, SchemaEntry, TableEntry,
};

/// Sample schema catalog
///
/// ```text
/// public.users(id integer, email text, name text)
/// public.orders(id integer, user_id integer, total numeric(10,2))
/// "Sales"."Order Items" (view)(order_id integer, sku text)
/// ```
pub struct CatalogFixtures;

impl CatalogFixtures {
    pub fn users() -> TableEntry {
        TableEntry::new("public", "users").with_columns(vec![
            ColumnEntry::new("id", "integer", 1),
            ColumnEntry::new("email", "text", 2),
            ColumnEntry::new("name", "text", 3),
        ])
    }

    pub fn orders() -> TableEntry {
        TableEntry::new("public", "orders").with_columns(vec![
            ColumnEntry::new("id", "integer", 1),
            ColumnEntry::new("user_id", "integer", 2),
            ColumnEntry::new("total", "numeric(10,2)", 3),
        ])
    }

    pub fn order_items() -> TableEntry {
        TableEntry::new("Sales", "Order Items")
            .view()
            .with_columns(vec![
                ColumnEntry::new("order_id", "integer", 1),
                ColumnEntry::new("sku", "text", 2),
            ])
    }

    pub fn functions() -> Vec<FunctionEntry> {
        vec![
            FunctionEntry::new("pg_catalog", "count", "bigint")
                .with_kind(FunctionKind::Agg)
                .with_overload(Overload::new(vec![], Some("number of input rows".into())))
                .with_overload(Overload::new(
                    vec!["\"any\"".into()],
                    Some("number of input rows for which the input expression is not null".into()),
                )),
            FunctionEntry::new("pg_catalog", "round", "numeric")
                .with_overload(Overload::new(
                    vec!["numeric".into(), "integer".into()],
                    Some("value rounded to 'scale'".into()),
                ))
                .with_overload(Overload::new(
                    vec!["numeric".into()],
                    Some("value rounded to 'scale' of zero".into()),
                ))
                .with_overload(Overload::new(vec!["double precision".into()], None)),
            FunctionEntry::new("pg_catalog", "substr", "text")
                .with_overload(Overload::new(
                    vec!["text".into(), "integer".into(), "integer".into()],
                    Some("extract portion of string".into()),
                ))
                .with_overload(Overload::new(
                    vec!["text".into(), "integer".into()],
                    Some("extract portion of string".into()),
                )),
            FunctionEntry::new("pg_catalog", "upper", "text").with_overload(Overload::new(
                vec!["text".into()],
                Some("uppercase".into()),
            )),
        ]
    }

    /// The complete catalog
    pub fn catalog() -> SchemaCatalog {
        SchemaCatalog {
            schemas: vec![SchemaEntry::new("Sales"), SchemaEntry::new("public")],
            tables: vec![Self::order_items(), Self::orders(), Self::users()],
            functions: Self::functions(),
            keywords: ["SELECT", "FROM", "WHERE", "INSERT", "UPDATE"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            databases: vec!["analytics".into(), "app".into()],
        }
    }
}

/// Sample SQL documents
pub struct SqlFixtures;

impl SqlFixtures {
    /// Two statements; the second references a column that does not exist
    pub const fn bad_column_script() -> &'static str {
        "SELECT id FROM users WHERE id = 1;\nSELECT bad_col FROM users;\n"
    }

    /// Statements that are all accepted by the mock engine
    pub const fn valid_script() -> &'static str {
        "SELECT id, email FROM users;\n\nSELECT total\nFROM orders\nWHERE user_id = 7;\n"
    }

    /// A function body that contains semicolons inside a dollar quote
    pub const fn function_definition() -> &'static str {
        "CREATE FUNCTION one() RETURNS integer AS $body$\n  SELECT 1;\n$body$ LANGUAGE sql;\n"
    }
}
