// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL identifiers
//!
//! Quoted identifiers are case-sensitive and escape an embedded `"` by doubling
//! it. Unquoted identifiers are folded to lower case by PostgreSQL, so they are
//! compared case-insensitively against catalog names.

use serde::{Deserialize, Serialize};

/// Keywords that cannot name a table or column without quotes, sorted
///
/// The engine's reserved keywords plus those it reserves for type and
/// function names.
const RESERVED_KEYWORDS: [&str; 101] = [
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// A name as written in a SQL document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Identifier text with surrounding quotes removed and escapes resolved
    pub name: String,
    /// Whether the identifier was written in double quotes
    pub is_quoted: bool,
}

impl Identifier {
    /// Create an unquoted identifier
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_quoted: false,
        }
    }

    /// Create a quoted identifier from its already-unescaped name
    pub fn quoted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_quoted: true,
        }
    }

    /// Build an identifier from raw document text
    ///
    /// Raw text is either a bare word (`users`) or a complete quoted span
    /// (`"My ""Table"""`). Returns `None` when a quoted span does not
    /// round-trip: a missing opening or closing quote, or a lone `"` inside.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pg_sql_lsp_context::Identifier;
    ///
    /// let ident = Identifier::from_raw("\"Order \"\"Items\"\"\"").unwrap();
    /// assert!(ident.is_quoted);
    /// assert_eq!(ident.name, "Order \"Items\"");
    ///
    /// assert!(Identifier::from_raw("abc\"").is_none());
    /// ```
    pub fn from_raw(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let starts = raw.starts_with('"');
        let ends = raw.len() > 1 && raw.ends_with('"');

        match (starts, ends) {
            (true, true) => Self::unescape(&raw[1..raw.len() - 1]).map(Self::quoted),
            (false, false) if !raw.contains('"') => Some(Self::bare(raw)),
            _ => None,
        }
    }

    /// Resolve doubled quotes inside a quoted span body
    fn unescape(body: &str) -> Option<String> {
        let mut name = String::with_capacity(body.len());
        let mut chars = body.chars();

        while let Some(ch) = chars.next() {
            if ch == '"' {
                // A lone quote would have terminated the identifier
                if chars.next() != Some('"') {
                    return None;
                }
            }
            name.push(ch);
        }

        Some(name)
    }

    /// Quote a name the way the engine does: wrap it and double embedded quotes
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pg_sql_lsp_context::Identifier;
    ///
    /// assert_eq!(Identifier::quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    /// ```
    pub fn quote(name: &str) -> String {
        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push('"');
        for ch in name.chars() {
            if ch == '"' {
                quoted.push('"');
            }
            quoted.push(ch);
        }
        quoted.push('"');
        quoted
    }

    /// Whether `name` is a keyword that must be quoted to name an object
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_KEYWORDS
            .binary_search(&name.to_lowercase().as_str())
            .is_ok()
    }

    /// Whether `name` can be written without quotes
    ///
    /// Only lower-case letters, digits and underscores survive case folding,
    /// the first character may not be a digit, and reserved keywords would
    /// be read as syntax.
    pub fn is_plain(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_lowercase() || first == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_lowercase() || c.is_ascii_digit() || c == '_')
            && !Self::is_reserved(name)
    }

    /// Quote `name` only if it would not survive unquoted
    pub fn quote_if_needed(name: &str) -> String {
        if Self::is_plain(name) {
            name.to_string()
        } else {
            Self::quote(name)
        }
    }

    /// Render the identifier back into SQL text
    pub fn to_sql(&self) -> String {
        if self.is_quoted {
            Self::quote(&self.name)
        } else {
            self.name.clone()
        }
    }

    /// Check whether a catalog name refers to this identifier
    ///
    /// Quoted identifiers match exactly; unquoted identifiers match
    /// case-insensitively.
    pub fn matches(&self, candidate: &str) -> bool {
        if self.is_quoted {
            self.name == candidate
        } else {
            self.name.to_lowercase() == candidate.to_lowercase()
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_bare() {
        let ident = Identifier::from_raw("Users").unwrap();
        assert!(!ident.is_quoted);
        assert_eq!(ident.name, "Users");
    }

    #[test]
    fn test_from_raw_quoted_with_escape() {
        let ident = Identifier::from_raw("\"a\"\"b\"").unwrap();
        assert!(ident.is_quoted);
        assert_eq!(ident.name, "a\"b");
    }

    #[test]
    fn test_from_raw_quoted_empty() {
        let ident = Identifier::from_raw("\"\"").unwrap();
        assert!(ident.is_quoted);
        assert_eq!(ident.name, "");
    }

    #[test]
    fn test_from_raw_malformed() {
        assert!(Identifier::from_raw("").is_none());
        assert!(Identifier::from_raw("\"").is_none());
        assert!(Identifier::from_raw("\"abc").is_none());
        assert!(Identifier::from_raw("abc\"").is_none());
        assert!(Identifier::from_raw("\"a\"b\"").is_none());
    }

    #[test]
    fn test_quote_round_trip() {
        for raw in ["\"users\"", "\"My Table\"", "\"x\"\"y\"", "\"\"\"\"", "\"\""] {
            let ident = Identifier::from_raw(raw).unwrap();
            assert_eq!(Identifier::quote(&ident.name), raw);
            assert_eq!(ident.to_sql(), raw);
        }
    }

    #[test]
    fn test_matches_folding() {
        let bare = Identifier::bare("USERS");
        assert!(bare.matches("users"));
        assert!(bare.matches("Users"));

        let quoted = Identifier::quoted("Users");
        assert!(quoted.matches("Users"));
        assert!(!quoted.matches("users"));
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(Identifier::quote_if_needed("users"), "users");
        assert_eq!(Identifier::quote_if_needed("user_2"), "user_2");
        assert_eq!(Identifier::quote_if_needed("Users"), "\"Users\"");
        assert_eq!(Identifier::quote_if_needed("2fa"), "\"2fa\"");
        assert_eq!(Identifier::quote_if_needed("my table"), "\"my table\"");
    }

    #[test]
    fn test_reserved_keywords_are_quoted() {
        assert_eq!(Identifier::quote_if_needed("user"), "\"user\"");
        assert_eq!(Identifier::quote_if_needed("order"), "\"order\"");
        assert_eq!(Identifier::quote_if_needed("left"), "\"left\"");
        assert_eq!(Identifier::quote_if_needed("current_user"), "\"current_user\"");

        // unreserved and column-name keywords stay bare
        assert_eq!(Identifier::quote_if_needed("name"), "name");
        assert_eq!(Identifier::quote_if_needed("between"), "between");
        assert_eq!(Identifier::quote_if_needed("users"), "users");
    }

    #[test]
    fn test_reserved_keywords_are_sorted() {
        assert!(RESERVED_KEYWORDS.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(Identifier::is_reserved("SELECT"));
        assert!(!Identifier::is_reserved("selected"));
    }
}
