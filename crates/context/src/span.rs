// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statement spans
//!
//! A [`StatementSpan`] is one statement cut out of a document together with the
//! position where it started. Validation submits a rewritten form of the
//! statement (`EXPLAIN <statement>`), so engine error offsets point into text
//! the document never contained; this module maps them back.
//!
//! Lines end at `\n`, `\r\n` or a lone `\r`, the same breaks the document
//! store counts.

use serde::{Deserialize, Serialize};

/// Prefix prepended to every statement for dry-run validation
pub const EXPLAIN_PREFIX: &str = "EXPLAIN ";

/// Option words that may follow `EXPLAIN` without parentheses
const EXPLAIN_WORDS: [&str; 3] = ["ANALYZE", "ANALYSE", "VERBOSE"];

/// Option names that may open a parenthesized `EXPLAIN` option list
const EXPLAIN_LIST_OPTIONS: [&str; 13] = [
    "ANALYZE",
    "ANALYSE",
    "VERBOSE",
    "COSTS",
    "SETTINGS",
    "GENERIC_PLAN",
    "BUFFERS",
    "SERIALIZE",
    "WAL",
    "TIMING",
    "SUMMARY",
    "MEMORY",
    "FORMAT",
];

/// One statement of a document and its original position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSpan {
    /// Statement text, without the terminating `;`
    pub text: String,
    /// Zero-based document line the statement starts on
    pub start_line: usize,
    /// Zero-based column (in characters) the statement starts at
    pub start_column: usize,
    /// Character offset of the statement start in the document
    pub start_offset: usize,
    /// The statement text split at line breaks, without the breaks
    pub lines: Vec<String>,
}

/// The dry-run form of a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainStatement {
    /// SQL submitted to the engine
    pub sql: String,
    /// Characters removed from the front of the statement before wrapping
    pub stripped: usize,
}

/// A single-line document range in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemappedRange {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

/// Whether `ch` can continue an unquoted word
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Split `text` at `\n`, `\r\n` and lone `\r`
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                chars.next_if_eq(&'\n');
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    lines.push(current);
    lines
}

/// Skip whitespace, `--` comments and nested `/* */` comments from `pos`
fn skip_trivia(chars: &[char], mut pos: usize) -> usize {
    loop {
        match (chars.get(pos), chars.get(pos + 1)) {
            (Some(ch), _) if ch.is_whitespace() => pos += 1,
            (Some('-'), Some('-')) => {
                pos += 2;
                while chars.get(pos).is_some_and(|&c| c != '\n' && c != '\r') {
                    pos += 1;
                }
            }
            (Some('/'), Some('*')) => {
                pos += 2;
                let mut depth = 1usize;
                while depth > 0 && pos < chars.len() {
                    match (chars[pos], chars.get(pos + 1)) {
                        ('/', Some('*')) => {
                            depth += 1;
                            pos += 2;
                        }
                        ('*', Some('/')) => {
                            depth -= 1;
                            pos += 2;
                        }
                        _ => pos += 1,
                    }
                }
                pos = pos.min(chars.len());
            }
            _ => return pos,
        }
    }
}

/// Whether `word` (case-insensitive) starts at `pos` and is not the prefix of
/// a longer word
fn word_at(chars: &[char], pos: usize, word: &str) -> bool {
    let len = word.chars().count();
    let Some(candidate) = chars.get(pos..pos + len) else {
        return false;
    };

    candidate
        .iter()
        .zip(word.chars())
        .all(|(a, b)| a.eq_ignore_ascii_case(&b))
        && !chars.get(pos + len).copied().is_some_and(is_word_char)
}

/// Length of a parenthesized `EXPLAIN` option list starting at `pos`
///
/// The list must open with a known option name. Nested parentheses and
/// string literals are balanced; an unterminated list is not a list.
fn option_list_len(chars: &[char], pos: usize) -> Option<usize> {
    if chars.get(pos) != Some(&'(') {
        return None;
    }
    let first = skip_trivia(chars, pos + 1);
    if !EXPLAIN_LIST_OPTIONS
        .iter()
        .any(|option| word_at(chars, first, option))
    {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    for (idx, &ch) in chars.iter().enumerate().skip(pos) {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1 - pos);
                }
            }
            _ => {}
        }
    }
    None
}

impl StatementSpan {
    /// Create a span anchored at the given document position
    pub fn new(
        text: impl Into<String>,
        start_line: usize,
        start_column: usize,
        start_offset: usize,
    ) -> Self {
        let text = text.into();
        let lines = split_lines(&text);
        Self {
            text,
            start_line,
            start_column,
            start_offset,
            lines,
        }
    }

    /// Length of the statement in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines.get(line).map_or(0, |l| l.chars().count())
    }

    /// Build the `EXPLAIN` form of this statement
    ///
    /// A leading `EXPLAIN` clause written by the user is stripped first:
    /// every `EXPLAIN` word, bare `ANALYZE`/`VERBOSE` option words and
    /// parenthesized option lists, with any comments between them. The
    /// submitted body therefore never starts with an option that would make
    /// the engine run the statement.
    pub fn explain_statement(&self) -> ExplainStatement {
        let stripped = Self::user_explain_len(&self.text);
        let body: String = self.text.chars().skip(stripped).collect();

        ExplainStatement {
            sql: format!("{EXPLAIN_PREFIX}{body}"),
            stripped,
        }
    }

    /// Number of leading characters taken up by a user-written `EXPLAIN`
    /// clause, or zero when there is none
    fn user_explain_len(text: &str) -> usize {
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;
        let mut stripped_any = false;

        loop {
            let word_start = skip_trivia(&chars, pos);

            let clause = if word_at(&chars, word_start, "EXPLAIN") {
                Some("EXPLAIN".len())
            } else if let Some(option) = EXPLAIN_WORDS
                .iter()
                .find(|option| word_at(&chars, word_start, option))
            {
                Some(option.len())
            } else {
                option_list_len(&chars, word_start)
            };

            match clause {
                Some(len) => {
                    pos = word_start + len;
                    stripped_any = true;
                }
                None if stripped_any => return word_start,
                None => return 0,
            }
        }
    }

    /// Map an engine error position back onto the document
    ///
    /// `position` is the engine's 1-based character position inside
    /// `explain.sql`. Without a position the error is anchored at the first
    /// non-blank character of the statement.
    pub fn remap_engine_position(
        &self,
        explain: &ExplainStatement,
        position: Option<usize>,
    ) -> RemappedRange {
        let offset = match position {
            Some(position) => {
                let in_explain = position.saturating_sub(1);
                in_explain.saturating_sub(EXPLAIN_PREFIX.len()) + explain.stripped
            }
            None => self.text.chars().take_while(|c| c.is_whitespace()).count(),
        };

        self.remap_offset(offset)
    }

    /// Convert a character offset within the statement into a document range
    ///
    /// The range starts at the offset and ends at the next whitespace
    /// character or the end of its line. An offset on a line break stays on
    /// the line the break ends. Offsets past the end of the statement are
    /// clamped to its last character position.
    pub fn remap_offset(&self, offset: usize) -> RemappedRange {
        let chars: Vec<char> = self.text.chars().collect();
        let target = offset.min(chars.len());

        let mut line = 0;
        let mut line_start = 0;
        let mut idx = 0;
        while idx < target {
            let step = match (chars[idx], chars.get(idx + 1)) {
                ('\r', Some('\n')) => 2,
                ('\r' | '\n', _) => 1,
                _ => {
                    idx += 1;
                    continue;
                }
            };
            if idx + step > target {
                break;
            }
            idx += step;
            line += 1;
            line_start = idx;
        }

        let line_len = self.line_len(line);
        let column = (target - line_start).min(line_len);
        let end = self.lines.get(line).map_or(column, |text| {
            text.chars()
                .skip(column)
                .position(char::is_whitespace)
                .map_or(line_len, |gap| column + gap)
        });

        // Only the first line of a statement can start mid-line
        let shift = if line == 0 { self.start_column } else { 0 };

        RemappedRange {
            line: self.start_line + line,
            start_column: column + shift,
            end_column: end + shift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_on_newline() {
        let span = StatementSpan::new("SELECT 1\nFROM t", 2, 4, 30);
        assert_eq!(span.lines, vec!["SELECT 1", "FROM t"]);
    }

    #[test]
    fn test_lines_split_on_carriage_returns() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\r"), vec!["a", ""]);
        assert_eq!(split_lines("a\u{2028}b"), vec!["a\u{2028}b"]);
    }

    #[test]
    fn test_explain_statement_plain() {
        let span = StatementSpan::new("SELECT 1", 0, 0, 0);
        let explain = span.explain_statement();
        assert_eq!(explain.sql, "EXPLAIN SELECT 1");
        assert_eq!(explain.stripped, 0);
    }

    #[test]
    fn test_explain_statement_strips_user_explain() {
        let span = StatementSpan::new("  explain SELECT 1", 0, 0, 0);
        let explain = span.explain_statement();
        assert_eq!(explain.sql, "EXPLAIN SELECT 1");
        assert_eq!(explain.stripped, 10);
    }

    #[test]
    fn test_explain_statement_strips_analyze() {
        let span = StatementSpan::new("EXPLAIN ANALYZE VERBOSE DELETE FROM t", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN DELETE FROM t");

        let span = StatementSpan::new("EXPLAIN (ANALYZE, BUFFERS) SELECT 1", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN SELECT 1");
    }

    #[test]
    fn test_analyze_behind_comments_is_stripped() {
        for text in [
            "EXPLAIN /* plan */ ANALYZE DELETE FROM t",
            "EXPLAIN -- plan\nANALYZE DELETE FROM t",
            "EXPLAIN -- plan\rANALYZE DELETE FROM t",
            "-- note\nEXPLAIN ANALYZE DELETE FROM t",
            "/* a /* nested */ note */ EXPLAIN/**/ANALYZE DELETE FROM t",
            "EXPLAIN(ANALYZE)DELETE FROM t",
            "EXPLAIN (FORMAT JSON, ANALYZE) DELETE FROM t",
            "EXPLAIN (COSTS off) (ANALYZE true) DELETE FROM t",
            "EXPLAIN EXPLAIN ANALYZE DELETE FROM t",
        ] {
            let span = StatementSpan::new(text, 0, 0, 0);
            assert_eq!(span.explain_statement().sql, "EXPLAIN DELETE FROM t", "{text:?}");
        }
    }

    #[test]
    fn test_leading_option_word_without_explain_is_stripped() {
        let span = StatementSpan::new("ANALYZE DELETE FROM t", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN DELETE FROM t");

        let span = StatementSpan::new("(analyze) DELETE FROM t", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN DELETE FROM t");
    }

    #[test]
    fn test_leading_comment_alone_is_kept() {
        let span = StatementSpan::new("-- note\nSELECT 1", 0, 0, 0);
        let explain = span.explain_statement();
        assert_eq!(explain.sql, "EXPLAIN -- note\nSELECT 1");
        assert_eq!(explain.stripped, 0);

        let span = StatementSpan::new("-- note\nEXPLAIN SELECT 1", 0, 0, 0);
        let explain = span.explain_statement();
        assert_eq!(explain.sql, "EXPLAIN SELECT 1");
        assert_eq!(explain.stripped, 16);
    }

    #[test]
    fn test_parenthesized_query_is_not_an_option_list() {
        let span = StatementSpan::new("(SELECT 1) UNION (SELECT 2)", 0, 0, 0);
        assert_eq!(span.explain_statement().stripped, 0);

        let span = StatementSpan::new("EXPLAIN (ANALYZE DELETE FROM t", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN (ANALYZE DELETE FROM t");
    }

    #[test]
    fn test_explain_word_must_stand_alone() {
        let span = StatementSpan::new("EXPLAINED", 0, 0, 0);
        assert_eq!(span.explain_statement().sql, "EXPLAIN EXPLAINED");

        let span = StatementSpan::new("analyze_all()", 0, 0, 0);
        assert_eq!(span.explain_statement().stripped, 0);
    }

    #[test]
    fn test_remap_second_line() {
        // "\nSELECT bad_col FROM users" right after the `;` at column 33
        let span = StatementSpan::new("\nSELECT bad_col FROM users", 0, 34, 34);
        let explain = span.explain_statement();
        // engine reports 1-based position of `bad_col` inside the submitted SQL
        let position = explain.sql.find("bad_col").unwrap() + 1;
        let range = span.remap_engine_position(&explain, Some(position));
        assert_eq!(
            range,
            RemappedRange {
                line: 1,
                start_column: 7,
                end_column: 14
            }
        );
    }

    #[test]
    fn test_remap_across_carriage_returns() {
        let span = StatementSpan::new("\r\nSELECT 1,\r  bad_col", 2, 9, 40);
        let explain = span.explain_statement();
        let position = explain.sql.find("bad_col").unwrap() + 1;
        let range = span.remap_engine_position(&explain, Some(position));
        assert_eq!(
            range,
            RemappedRange {
                line: 4,
                start_column: 2,
                end_column: 9
            }
        );
    }

    #[test]
    fn test_remap_inside_crlf_stays_on_line() {
        let span = StatementSpan::new("SELECT\r\nx", 0, 0, 0);
        assert_eq!(span.remap_offset(6).line, 0);
        assert_eq!(span.remap_offset(7), RemappedRange { line: 0, start_column: 6, end_column: 6 });
        assert_eq!(span.remap_offset(8), RemappedRange { line: 1, start_column: 0, end_column: 1 });
    }

    #[test]
    fn test_remap_first_line_adds_start_column() {
        let span = StatementSpan::new(" SELECT nope", 3, 10, 50);
        let range = span.remap_offset(8);
        assert_eq!(range.line, 3);
        assert_eq!(range.start_column, 18);
        assert_eq!(range.end_column, 22);
    }

    #[test]
    fn test_remap_with_stripped_explain() {
        let span = StatementSpan::new("EXPLAIN SELECT x FROM t", 0, 0, 0);
        let explain = span.explain_statement();
        let position = explain.sql.find('x').unwrap() + 1;
        let range = span.remap_engine_position(&explain, Some(position));
        assert_eq!(range.start_column, 15);
        assert_eq!(range.end_column, 16);
    }

    #[test]
    fn test_remap_behind_stripped_comment() {
        let span = StatementSpan::new("EXPLAIN /* a */ ANALYZE\nSELECT x", 0, 0, 0);
        let explain = span.explain_statement();
        assert_eq!(explain.sql, "EXPLAIN SELECT x");
        let position = explain.sql.find('x').unwrap() + 1;
        let range = span.remap_engine_position(&explain, Some(position));
        assert_eq!(range, RemappedRange { line: 1, start_column: 7, end_column: 8 });
    }

    #[test]
    fn test_remap_without_position_points_at_statement() {
        let span = StatementSpan::new("\n  SELEC 1", 0, 5, 5);
        let explain = span.explain_statement();
        let range = span.remap_engine_position(&explain, None);
        assert_eq!(range.line, 1);
        assert_eq!(range.start_column, 2);
        assert_eq!(range.end_column, 7);
    }

    #[test]
    fn test_remap_is_clamped() {
        let span = StatementSpan::new("SELECT 1\nFROM t", 0, 0, 0);
        let range = span.remap_offset(1_000);
        assert_eq!(range.line, 1);
        assert_eq!(range.start_column, 6);
        assert_eq!(range.end_column, 6);
    }

    #[test]
    fn test_every_explain_offset_stays_inside_statement() {
        for text in ["\n  SELECT a,\n    b\n  FROM t", "\r\n  SELECT a,\r    b\r\n  FROM t"] {
            let span = StatementSpan::new(text, 4, 12, 80);
            let explain = span.explain_statement();

            for position in 1..=explain.sql.chars().count() + 1 {
                let range = span.remap_engine_position(&explain, Some(position));
                let line = range.line - span.start_line;
                assert!(line < span.lines.len());

                let shift = if line == 0 { span.start_column } else { 0 };
                let line_len = span.lines[line].chars().count();
                assert!(range.start_column >= shift);
                assert!(range.start_column - shift <= line_len);
                assert!(range.end_column >= range.start_column);
                assert!(range.end_column - shift <= line_len);
            }
        }
    }
}
