// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for database schema information
//!
//! A [`SchemaCatalog`] is an immutable snapshot. It is built once per connection
//! event and replaced wholesale, never patched in place.

use pg_sql_lsp_context::Identifier;
use serde::{Deserialize, Serialize};

/// Schema visible to the current credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub name: String,
}

impl SchemaEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Column of a table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    pub data_type: String,
    /// 1-based attribute number
    pub ordinal: i32,
    pub is_dropped: bool,
}

impl ColumnEntry {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ordinal,
            is_dropped: false,
        }
    }
}

/// Table or view together with its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub schema: String,
    pub name: String,
    /// `quote_ident(schema) || '.' || quote_ident(name)` as computed by the engine
    pub quoted_name: String,
    /// `false` for views
    pub is_table: bool,
    /// Live columns ordered by ordinal; dropped columns never appear here
    pub columns: Vec<ColumnEntry>,
}

impl TableEntry {
    /// Create a table entry, quoting the qualified name like the engine does
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let schema = schema.into();
        let name = name.into();
        let quoted_name = format!(
            "{}.{}",
            Identifier::quote_if_needed(&schema),
            Identifier::quote_if_needed(&name)
        );
        Self {
            schema,
            name,
            quoted_name,
            is_table: true,
            columns: Vec::new(),
        }
    }

    /// Mark the entry as a view
    pub fn view(mut self) -> Self {
        self.is_table = false;
        self
    }

    /// Set columns, dropping deleted ones and ordering by ordinal
    pub fn with_columns(mut self, columns: Vec<ColumnEntry>) -> Self {
        let mut columns: Vec<ColumnEntry> = columns.into_iter().filter(|c| !c.is_dropped).collect();
        columns.sort_by_key(|c| c.ordinal);
        self.columns = columns;
        self
    }
}

/// Kind of routine as reported by `pg_proc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    #[default]
    Normal,
    Agg,
    Window,
    Trigger,
}

impl FunctionKind {
    /// Parse the `type` column of the function query; unknown kinds are normal
    pub fn parse(kind: &str) -> Self {
        match kind {
            "agg" => Self::Agg,
            "window" => Self::Window,
            "trigger" => Self::Trigger,
            _ => Self::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Agg => "agg",
            Self::Window => "window",
            Self::Trigger => "trigger",
        }
    }
}

/// One declared signature of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overload {
    pub arg_types: Vec<String>,
    pub description: Option<String>,
}

impl Overload {
    pub fn new(arg_types: Vec<String>, description: Option<String>) -> Self {
        Self {
            arg_types,
            description,
        }
    }

    /// Build an overload from the text of `pg_get_function_arguments`
    pub fn from_arguments(arguments: &str, description: Option<String>) -> Self {
        Self::new(split_arguments(arguments), description)
    }
}

/// Split an argument list on top-level commas
///
/// Commas inside parentheses, string literals or quoted identifiers belong to
/// a single argument, e.g. `numeric(10,2)` or `sep text DEFAULT ','`.
///
/// # Examples
///
/// ```rust
/// use pg_sql_lsp_catalog::metadata::split_arguments;
///
/// assert_eq!(
///     split_arguments("a numeric(10,2), sep text DEFAULT ','"),
///     vec!["a numeric(10,2)", "sep text DEFAULT ','"]
/// );
/// assert!(split_arguments("").is_empty());
/// ```
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in arguments.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            },
        }
        current.push(ch);
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// All overloads sharing a `(schema, name)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub schema: String,
    pub name: String,
    /// Result type of the first overload seen
    pub result_type: String,
    pub kind: FunctionKind,
    pub overloads: Vec<Overload>,
}

impl FunctionEntry {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        result_type: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            result_type: result_type.into(),
            kind: FunctionKind::Normal,
            overloads: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_overload(mut self, overload: Overload) -> Self {
        self.overloads.push(overload);
        self
    }

    /// Description of the first overload, if any
    pub fn description(&self) -> Option<&str> {
        self.overloads.first().and_then(|o| o.description.as_deref())
    }
}

/// In-memory snapshot of everything completion and signature help need
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub schemas: Vec<SchemaEntry>,
    pub tables: Vec<TableEntry>,
    pub functions: Vec<FunctionEntry>,
    /// Upper-cased keywords
    pub keywords: Vec<String>,
    pub databases: Vec<String>,
}

/// Schema used when a qualifier does not name a known schema
pub const DEFAULT_SCHEMA: &str = "public";

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a schema by identifier, honoring quoting rules
    pub fn find_schema(&self, ident: &Identifier) -> Option<&SchemaEntry> {
        self.schemas.iter().find(|schema| ident.matches(&schema.name))
    }

    /// Tables and views of one schema, matched exactly
    pub fn tables_in_schema<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a TableEntry> + 'a {
        self.tables.iter().filter(move |table| table.schema == schema)
    }

    /// Find a table or view by identifier
    ///
    /// With `Some(schema)` only that schema is searched; otherwise the first
    /// table with a matching name in any schema is returned.
    pub fn find_table(&self, schema: Option<&str>, ident: &Identifier) -> Option<&TableEntry> {
        self.tables.iter().find(|table| {
            schema.is_none_or(|schema| table.schema == schema) && ident.matches(&table.name)
        })
    }

    /// Find a function by name, case-insensitively
    pub fn find_function(&self, name: &str) -> Option<&FunctionEntry> {
        let name = name.to_lowercase();
        self.functions
            .iter()
            .find(|function| function.name.to_lowercase() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.tables.is_empty()
            && self.functions.is_empty()
            && self.keywords.is_empty()
            && self.databases.is_empty()
    }
}
