// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Signature help
//!
//! Finds the call enclosing the cursor, counts the argument position and
//! lists the overloads of the called function that accept at least that many
//! arguments.

use pg_sql_lsp_catalog::{FunctionEntry, Overload, SchemaCatalog};
use pg_sql_lsp_context::BackwardIterator;
use tower_lsp::lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, SignatureHelp, SignatureInformation,
};
use tracing::debug;

/// Resolves signature help against one catalog snapshot
pub struct SignatureResolver<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> SignatureResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self { catalog }
    }

    /// Signature help at character `offset` of `text`
    ///
    /// Returns `None` outside a call, for quoted function names, for unknown
    /// functions and when no overload takes enough arguments.
    pub fn resolve(&self, text: &str, offset: usize) -> Option<SignatureHelp> {
        let mut iter = BackwardIterator::new(text, offset);
        let position = iter.read_arguments()?;

        let name = iter.read_ident();
        if name.is_empty() || name.starts_with('"') {
            return None;
        }

        let function = self.catalog.find_function(&name)?;
        let overloads: Vec<&Overload> = function
            .overloads
            .iter()
            .filter(|overload| overload.arg_types.len() >= position)
            .collect();
        let first = overloads.first()?;

        let active_parameter = position.min(first.arg_types.len().saturating_sub(1));
        debug!(function = %function.name, position, overloads = overloads.len(), "Resolved signature");

        Some(SignatureHelp {
            signatures: overloads
                .iter()
                .map(|overload| signature(function, overload))
                .collect(),
            active_signature: Some(0),
            active_parameter: Some(active_parameter as u32),
        })
    }
}

/// Render `name( arg , arg )`
fn signature(function: &FunctionEntry, overload: &Overload) -> SignatureInformation {
    SignatureInformation {
        label: format!("{}( {} )", function.name, overload.arg_types.join(" , ")),
        documentation: overload
            .description
            .as_ref()
            .map(|d| Documentation::String(d.clone())),
        parameters: Some(
            overload
                .arg_types
                .iter()
                .map(|arg| ParameterInformation {
                    label: ParameterLabel::Simple(arg.clone()),
                    documentation: None,
                })
                .collect(),
        ),
        active_parameter: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog {
            functions: vec![
                FunctionEntry::new("pg_catalog", "substr", "text")
                    .with_overload(Overload::new(
                        vec!["text".into(), "integer".into(), "integer".into()],
                        Some("extract portion of string".into()),
                    ))
                    .with_overload(Overload::new(vec!["text".into(), "integer".into()], None)),
                FunctionEntry::new("pg_catalog", "now", "timestamp with time zone")
                    .with_overload(Overload::new(vec![], None)),
            ],
            ..SchemaCatalog::default()
        }
    }

    fn labels(help: &SignatureHelp) -> Vec<&str> {
        help.signatures.iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_first_argument() {
        let catalog = catalog();
        let text = "SELECT SUBSTR(";
        let help = SignatureResolver::new(&catalog).resolve(text, text.len()).unwrap();

        assert_eq!(
            labels(&help),
            vec!["substr( text , integer , integer )", "substr( text , integer )"]
        );
        assert_eq!(help.active_signature, Some(0));
        assert_eq!(help.active_parameter, Some(0));
        assert_eq!(
            help.signatures[0].documentation,
            Some(Documentation::String("extract portion of string".into()))
        );
        assert_eq!(help.signatures[1].parameters.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_filters_short_overloads() {
        let catalog = catalog();
        let resolver = SignatureResolver::new(&catalog);

        let text = "SELECT substr(name, 1, ";
        let help = resolver.resolve(text, text.len()).unwrap();
        assert_eq!(help.signatures.len(), 2);
        assert_eq!(help.active_parameter, Some(2));

        let catalog = SchemaCatalog {
            functions: vec![
                FunctionEntry::new("pg_catalog", "pair", "text")
                    .with_overload(Overload::new(vec!["text".into()], None))
                    .with_overload(Overload::new(vec!["text".into(), "text".into()], None)),
            ],
            ..SchemaCatalog::default()
        };
        let text = "SELECT pair(a, b, ";
        let help = SignatureResolver::new(&catalog).resolve(text, text.len()).unwrap();
        assert_eq!(labels(&help), vec!["pair( text , text )"]);
        assert_eq!(help.active_parameter, Some(1));

        let text = "SELECT substr(name, 1, 2, ";
        assert!(resolver.resolve(text, text.len()).is_none());
    }

    #[test]
    fn test_nested_call_and_clamping() {
        let catalog = catalog();
        let resolver = SignatureResolver::new(&catalog);

        // Commas inside the inner call do not count
        let text = "SELECT substr(lower(a, b), ";
        let help = resolver.resolve(text, text.len()).unwrap();
        assert_eq!(help.active_parameter, Some(1));

        let text = "SELECT now(";
        let help = resolver.resolve(text, text.len()).unwrap();
        assert_eq!(labels(&help), vec!["now(  )"]);
        assert_eq!(help.active_parameter, Some(0));
    }

    #[test]
    fn test_declines() {
        let catalog = catalog();
        let resolver = SignatureResolver::new(&catalog);

        for text in [
            "SELECT substr",
            "SELECT \"substr\"(",
            "SELECT unknown_fn(",
            "SELECT (",
            "SELECT substr(a); SELECT ",
        ] {
            assert!(resolver.resolve(text, text.len()).is_none(), "{text}");
        }
    }
}
