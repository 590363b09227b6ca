// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement splitting
//!
//! Splits a document on top-level `;` while respecting the lexical contexts in
//! which a semicolon does not end a statement: string literals (including
//! `E'...'` escape strings), quoted identifiers, dollar-quoted bodies, line
//! comments and (nested) block comments.
//!
//! The splitter is a lazy iterator. Cloning it or calling [`split_statements`]
//! again restarts the scan.

use crate::span::StatementSpan;

/// Lexical context of the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
enum LexState {
    Normal,
    /// `'...'` with `''` as escape
    SingleQuote,
    /// `E'...'` with both `''` and backslash escapes
    EscapeString,
    /// `"..."` with `""` as escape
    DoubleQuote,
    /// `$tag$...$tag$`
    DollarQuote(String),
    /// `-- ...` up to the next `\n` or `\r`
    LineComment,
    /// `/* ... */`, with the current nesting depth
    BlockComment(usize),
}

/// Lazy iterator over the statements of a document
#[derive(Debug, Clone)]
pub struct StatementSplitter<'a> {
    text: &'a str,
    /// Byte offset of the next character
    byte: usize,
    /// Character offset of the next character
    offset: usize,
    line: usize,
    column: usize,
}

/// Split `text` into statements
///
/// # Examples
///
/// ```rust
/// use pg_sql_lsp_context::split_statements;
///
/// let spans: Vec<_> = split_statements("SELECT ';'; -- done;\nSELECT 2").collect();
/// assert_eq!(spans.len(), 2);
/// assert_eq!(spans[0].text, "SELECT ';'");
/// assert_eq!(spans[1].start_line, 0);
/// ```
pub fn split_statements(text: &str) -> StatementSplitter<'_> {
    StatementSplitter::new(text)
}

impl<'a> StatementSplitter<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            offset: 0,
            line: 0,
            column: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.byte..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume one character, tracking line and column
    ///
    /// `\n`, `\r\n` and a lone `\r` each end one line.
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.byte += ch.len_utf8();
        self.offset += 1;
        match ch {
            '\r' if self.peek() == Some('\n') => {}
            '\r' | '\n' => {
                self.line += 1;
                self.column = 0;
            }
            _ => self.column += 1,
        }
        Some(ch)
    }

    fn bump_n(&mut self, count: usize) {
        for _ in 0..count {
            if self.bump().is_none() {
                break;
            }
        }
    }

    /// Tag of a dollar quote opening right after an already consumed `$`
    ///
    /// `$1` style parameters are not dollar quotes, so a tag may not start
    /// with a digit.
    fn dollar_tag(&self) -> Option<String> {
        let mut tag = String::new();
        for ch in self.rest().chars() {
            match ch {
                '$' => return Some(tag),
                c if c.is_alphanumeric() || c == '_' => {
                    if tag.is_empty() && c.is_ascii_digit() {
                        return None;
                    }
                    tag.push(c);
                }
                _ => return None,
            }
        }
        None
    }

    /// Scan one statement, returning its end byte and whether it had content
    fn scan_statement(&mut self) -> (usize, bool) {
        let mut state = LexState::Normal;
        let mut has_content = false;
        let mut last: Option<char> = None;

        loop {
            let here = self.byte;
            let Some(ch) = self.bump() else {
                return (here, has_content);
            };

            match &mut state {
                LexState::Normal => {
                    let after_word = last.is_some_and(|c| c.is_alphanumeric() || c == '_');
                    match ch {
                        ';' => return (here, has_content),
                        '\'' => state = LexState::SingleQuote,
                        '"' => state = LexState::DoubleQuote,
                        'E' | 'e' if !after_word && self.peek() == Some('\'') => {
                            self.bump();
                            state = LexState::EscapeString;
                        }
                        '-' if self.peek() == Some('-') => {
                            self.bump();
                            state = LexState::LineComment;
                        }
                        '/' if self.peek() == Some('*') => {
                            self.bump();
                            state = LexState::BlockComment(1);
                        }
                        '$' if !after_word && last != Some('$') => {
                            if let Some(tag) = self.dollar_tag() {
                                self.bump_n(tag.chars().count() + 1);
                                state = LexState::DollarQuote(tag);
                            }
                        }
                        _ => {}
                    }

                    let is_trivia = ch.is_whitespace()
                        || matches!(state, LexState::LineComment | LexState::BlockComment(_));
                    if !is_trivia {
                        has_content = true;
                    }
                }
                LexState::SingleQuote => {
                    if ch == '\'' {
                        if self.peek() == Some('\'') {
                            self.bump();
                        } else {
                            state = LexState::Normal;
                        }
                    }
                }
                LexState::EscapeString => match ch {
                    '\\' => {
                        self.bump();
                    }
                    '\'' if self.peek() == Some('\'') => {
                        self.bump();
                    }
                    '\'' => state = LexState::Normal,
                    _ => {}
                },
                LexState::DoubleQuote => {
                    if ch == '"' {
                        if self.peek() == Some('"') {
                            self.bump();
                        } else {
                            state = LexState::Normal;
                        }
                    }
                }
                LexState::DollarQuote(tag) => {
                    if ch == '$' {
                        let closing = format!("{tag}$");
                        if self.rest().starts_with(&closing) {
                            self.bump_n(closing.chars().count());
                            state = LexState::Normal;
                        }
                    }
                }
                LexState::LineComment => {
                    if ch == '\n' || ch == '\r' {
                        state = LexState::Normal;
                    }
                }
                LexState::BlockComment(depth) => {
                    if ch == '*' && self.peek() == Some('/') {
                        self.bump();
                        *depth -= 1;
                        if *depth == 0 {
                            state = LexState::Normal;
                        }
                    } else if ch == '/' && self.peek() == Some('*') {
                        self.bump();
                        *depth += 1;
                    }
                }
            }

            last = Some(ch);
        }
    }
}

impl Iterator for StatementSplitter<'_> {
    type Item = StatementSpan;

    fn next(&mut self) -> Option<Self::Item> {
        while self.byte < self.text.len() {
            let (start_byte, start_offset) = (self.byte, self.offset);
            let (start_line, start_column) = (self.line, self.column);

            let (end_byte, has_content) = self.scan_statement();

            if has_content {
                return Some(StatementSpan::new(
                    &self.text[start_byte..end_byte],
                    start_line,
                    start_column,
                    start_offset,
                ));
            }

            tracing::trace!(
                line = start_line,
                column = start_column,
                "Skipping statement without content"
            );
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        split_statements(input).map(|span| span.text).collect()
    }

    #[test]
    fn test_split_simple() {
        assert_eq!(texts("SELECT 1; SELECT 2"), vec!["SELECT 1", " SELECT 2"]);
    }

    #[test]
    fn test_trailing_semicolon_yields_nothing_extra() {
        assert_eq!(texts("SELECT 1;\n  \n"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_empty_and_blank_documents() {
        assert!(texts("").is_empty());
        assert!(texts("  \n\t").is_empty());
        assert!(texts(";;;").is_empty());
    }

    #[test]
    fn test_comment_only_statement_dropped() {
        assert_eq!(
            texts("-- header;\n/* a; b */;SELECT 1"),
            vec!["SELECT 1"]
        );
    }

    #[test]
    fn test_semicolon_in_single_quotes() {
        assert_eq!(texts("SELECT 'a;b''c;'; SELECT 2"), vec!["SELECT 'a;b''c;'", " SELECT 2"]);
    }

    #[test]
    fn test_semicolon_in_escape_string() {
        assert_eq!(texts(r"SELECT E'it\'s;'; SELECT 2").len(), 2);
        assert_eq!(texts(r"SELECT E'it\'s;'; SELECT 2")[0], r"SELECT E'it\'s;'");
    }

    #[test]
    fn test_word_ending_in_e_is_not_escape_string() {
        // `type'` cannot open an escape string; the quote is a plain literal
        assert_eq!(texts("SELECT type'x;'; SELECT 2").len(), 2);
    }

    #[test]
    fn test_semicolon_in_quoted_identifier() {
        assert_eq!(texts("SELECT \"a;\"\"b\" FROM t; SELECT 2").len(), 2);
    }

    #[test]
    fn test_semicolon_in_dollar_quotes() {
        let input = "CREATE FUNCTION f() RETURNS int AS $body$ SELECT 1; $$ ; $body$ LANGUAGE sql; SELECT 2";
        let spans = texts(input);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].ends_with("LANGUAGE sql"));
    }

    #[test]
    fn test_anonymous_dollar_quotes() {
        assert_eq!(texts("DO $$ BEGIN; END $$; SELECT 1").len(), 2);
    }

    #[test]
    fn test_positional_parameter_is_not_dollar_quote() {
        assert_eq!(texts("SELECT $1; SELECT $2").len(), 2);
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(texts("SELECT 1 /* a /* b; */ c; */; SELECT 2").len(), 2);
    }

    #[test]
    fn test_line_comment_semicolon() {
        assert_eq!(texts("SELECT 1 -- not; here\n, 2; SELECT 3").len(), 2);
    }

    #[test]
    fn test_line_comment_ends_at_carriage_return() {
        assert_eq!(
            texts("SELECT 1 -- note\r;DELETE FROM t;"),
            vec!["SELECT 1 -- note\r", "DELETE FROM t"]
        );
        assert_eq!(texts("-- note\rSELECT 1; SELECT 2").len(), 2);
    }

    #[test]
    fn test_unterminated_literal_runs_to_end() {
        assert_eq!(texts("SELECT 'open; SELECT 2"), vec!["SELECT 'open; SELECT 2"]);
    }

    #[test]
    fn test_positions() {
        let spans: Vec<_> = split_statements("SELECT 1;\nSELECT 2; SELECT 3").collect();
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].start_line, spans[0].start_column), (0, 0));
        assert_eq!((spans[1].start_line, spans[1].start_column), (0, 9));
        assert_eq!((spans[2].start_line, spans[2].start_column), (1, 9));
        assert_eq!(spans[2].start_offset, 19);
    }

    #[test]
    fn test_positions_with_carriage_returns() {
        let spans: Vec<_> = split_statements("SELECT 1;\r\nSELECT 2;\rSELECT 3").collect();
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[1].start_line, spans[1].start_column), (0, 9));
        assert_eq!((spans[2].start_line, spans[2].start_column), (1, 9));
        assert_eq!(spans[2].start_offset, 20);
        assert_eq!(spans[2].lines, vec!["", "SELECT 3"]);
    }

    #[test]
    fn test_positions_count_characters() {
        let spans: Vec<_> = split_statements("SELECT 'é';SELECT 2").collect();
        assert_eq!(spans[1].start_column, 11);
        assert_eq!(spans[1].start_offset, 11);
    }

    #[test]
    fn test_restartable() {
        let splitter = split_statements("SELECT 1; SELECT 2");
        let first: Vec<_> = splitter.clone().collect();
        let second: Vec<_> = splitter.collect();
        assert_eq!(first, second);
    }
}
