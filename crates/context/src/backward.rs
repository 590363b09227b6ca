// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Backward iterator
//!
//! A reverse lexer anchored at the cursor.
//!
//! ## Overview
//!
//! Editors ask for completions with only the text up to the cursor being
//! meaningful, so every scan here walks *backward* and never looks ahead.
//! Whitespace, `-- line` comments and `/* block */` comments are separators and
//! are skipped silently by every reading operation.
//!
//! ## Example
//!
//! ```rust
//! use pg_sql_lsp_context::BackwardIterator;
//!
//! // Cursor after the second comma of `coalesce(a, b, `
//! let text = "SELECT coalesce(a, b, ";
//! let mut iter = BackwardIterator::new(text, text.len());
//! assert_eq!(iter.read_arguments(), Some(2));
//! assert_eq!(iter.read_ident(), "coalesce");
//! ```

use crate::ident::Identifier;

/// Characters that may appear in an unquoted identifier
fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_line_break(ch: char) -> bool {
    ch == '\n' || ch == '\r'
}

/// Length of the `$tag$` delimiter starting at `idx`, if one starts there
///
/// `$1` style parameters and `$` inside a word are not delimiters.
fn dollar_delimiter_len(chars: &[char], idx: usize) -> Option<usize> {
    if idx > 0 && is_ident_char(chars[idx - 1]) {
        return None;
    }

    let tag_len = chars[idx + 1..]
        .iter()
        .take_while(|&&c| is_ident_char(c))
        .count();
    if chars.get(idx + 1).is_some_and(char::is_ascii_digit) {
        return None;
    }

    (chars.get(idx + 1 + tag_len) == Some(&'$')).then_some(tag_len + 2)
}

/// Lexical context of the forward scan in [`open_line_comment`]
enum Lex {
    Normal,
    Quote(char),
    Dollar(Vec<char>),
    Line(usize),
    Block(usize),
}

/// Start of the `--` comment still open at the end of `chars`, if any
///
/// Scans forward from the start of the buffer, so markers inside string
/// literals, dollar-quoted bodies and block comments are not comments.
fn open_line_comment(chars: &[char]) -> Option<usize> {
    let mut state = Lex::Normal;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        let next = chars.get(idx + 1).copied();

        match &mut state {
            Lex::Normal => match (ch, next) {
                ('-', Some('-')) => {
                    state = Lex::Line(idx);
                    idx += 1;
                }
                ('/', Some('*')) => {
                    state = Lex::Block(1);
                    idx += 1;
                }
                ('\'' | '"', _) => state = Lex::Quote(ch),
                ('$', _) => {
                    if let Some(len) = dollar_delimiter_len(chars, idx) {
                        state = Lex::Dollar(chars[idx..idx + len].to_vec());
                        idx += len - 1;
                    }
                }
                _ => {}
            },
            Lex::Quote(quote) => {
                if ch == *quote {
                    state = Lex::Normal;
                }
            }
            Lex::Dollar(delimiter) => {
                if chars[idx..].starts_with(delimiter) {
                    idx += delimiter.len() - 1;
                    state = Lex::Normal;
                }
            }
            Lex::Line(_) => {
                if is_line_break(ch) {
                    state = Lex::Normal;
                }
            }
            Lex::Block(depth) => match (ch, next) {
                ('*', Some('/')) => {
                    *depth -= 1;
                    idx += 1;
                    if *depth == 0 {
                        state = Lex::Normal;
                    }
                }
                ('/', Some('*')) => {
                    *depth += 1;
                    idx += 1;
                }
                _ => {}
            },
        }

        idx += 1;
    }

    match state {
        Lex::Line(start) => Some(start),
        _ => None,
    }
}

/// Cursor-relative reverse lexer over a text buffer
///
/// The scan position is a character offset; characters before it are still
/// to be read, characters at or after it have been consumed.
#[derive(Debug, Clone)]
pub struct BackwardIterator {
    chars: Vec<char>,
    pos: usize,
}

impl BackwardIterator {
    /// Create an iterator positioned at character `offset` of `text`
    ///
    /// Offsets past the end of the text are clamped to the end.
    pub fn new(text: &str, offset: usize) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let pos = offset.min(chars.len());
        Self { chars, pos }
    }

    /// Create an iterator at a zero-based line/character position
    ///
    /// Lines end at `\n`, `\r\n` or a lone `\r`. Characters are counted as
    /// Unicode scalar values. A position past the end
    /// of its line is clamped to the line end; a line past the end of the
    /// document is clamped to the document end.
    pub fn from_position(text: &str, line: u32, character: u32) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let pos = Self::offset_of(&chars, line as usize, character as usize);
        Self { chars, pos }
    }

    fn offset_of(chars: &[char], line: usize, character: usize) -> usize {
        let mut line_start = 0;
        for _ in 0..line {
            match chars[line_start..].iter().position(|&c| is_line_break(c)) {
                Some(brk) => {
                    let at = line_start + brk;
                    let crlf = chars[at] == '\r' && chars.get(at + 1) == Some(&'\n');
                    line_start = at + if crlf { 2 } else { 1 };
                }
                None => return chars.len(),
            }
        }

        let line_len = chars[line_start..]
            .iter()
            .position(|&c| is_line_break(c))
            .unwrap_or(chars.len() - line_start);

        line_start + character.min(line_len)
    }

    /// Current scan position (character offset)
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether any characters remain behind the scan position
    pub fn has_previous(&self) -> bool {
        self.pos > 0
    }

    /// The character immediately before the scan position, without consuming it
    pub fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    /// The character `back` positions before [`peek`](Self::peek)
    fn peek_at(&self, back: usize) -> Option<char> {
        self.pos
            .checked_sub(back + 1)
            .and_then(|idx| self.chars.get(idx).copied())
    }

    /// Consume and return the character before the scan position
    ///
    /// Returns `None` at the start of the buffer. Line break characters are
    /// returned like any other whitespace character.
    pub fn previous_char(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos -= 1;
        Some(ch)
    }

    /// Skip whitespace and comments behind the scan position
    pub fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some('\n' | '\r') => {
                    self.pos -= 1;
                    self.skip_line_comment();
                }
                Some(ch) if ch.is_whitespace() => self.pos -= 1,
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => break,
            }
        }
    }

    /// Position of the first character of the line containing `pos`
    fn line_start(&self, pos: usize) -> usize {
        self.chars[..pos]
            .iter()
            .rposition(|&c| is_line_break(c))
            .map_or(0, |newline| newline + 1)
    }

    /// After stepping back over a line break, jump over a trailing `--` comment
    /// on the line now behind the scan position
    fn skip_line_comment(&mut self) {
        if let Some(start) = open_line_comment(&self.chars[..self.pos]) {
            self.pos = start;
        }
    }

    /// Jump over a `/* ... */` comment whose end sits behind the scan position
    ///
    /// An unterminated comment runs to the start of the buffer.
    fn skip_block_comment(&mut self) {
        self.pos -= 2;
        loop {
            if self.pos < 2 {
                self.pos = 0;
                return;
            }
            if self.chars[self.pos - 2] == '/' && self.chars[self.pos - 1] == '*' {
                self.pos -= 2;
                return;
            }
            self.pos -= 1;
        }
    }

    /// Whether the character right behind the scan position is a `.`
    pub fn is_next_period(&self) -> bool {
        self.peek() == Some('.')
    }

    /// Whether the character right behind the scan position is a `"` that
    /// opens a quoted identifier (rather than closing one)
    ///
    /// Quotes are counted on the current line, ignoring those inside string
    /// literals; an odd count means the last one is an opening quote.
    pub fn is_forward_double_quote(&self) -> bool {
        if self.peek() != Some('"') {
            return false;
        }

        let start = self.line_start(self.pos);
        let mut in_string = false;
        let mut quotes = 0usize;
        for &ch in &self.chars[start..self.pos] {
            match ch {
                '\'' if quotes % 2 == 0 => in_string = !in_string,
                '"' if !in_string => quotes += 1,
                _ => {}
            }
        }

        quotes % 2 == 1
    }

    /// Read one identifier backward
    ///
    /// Leading separators and periods are skipped first. Returns the raw text,
    /// including the surrounding quotes for a quoted identifier, or an empty
    /// string if no identifier precedes the scan position.
    pub fn read_ident(&mut self) -> String {
        loop {
            self.skip_trivia();
            if self.is_next_period() {
                self.pos -= 1;
            } else {
                break;
            }
        }

        match self.peek() {
            Some('"') => self.read_quoted_ident(),
            Some(ch) if is_ident_char(ch) => {
                let end = self.pos;
                while matches!(self.peek(), Some(ch) if is_ident_char(ch)) {
                    self.pos -= 1;
                }
                self.chars[self.pos..end].iter().collect()
            }
            _ => String::new(),
        }
    }

    /// Read a quoted identifier whose closing quote is right behind the scan
    /// position
    fn read_quoted_ident(&mut self) -> String {
        let end = self.pos;
        self.pos -= 1;

        while let Some(ch) = self.previous_char() {
            if ch == '"' {
                if self.peek() == Some('"') {
                    // doubled quote inside the identifier
                    self.pos -= 1;
                } else {
                    break;
                }
            }
        }

        self.chars[self.pos..end].iter().collect()
    }

    /// Read a dotted identifier chain of up to `max_levels` segments
    ///
    /// Segments are returned left to right, so `schema.table.` yields
    /// `[schema, table]`. A segment that is not a well-formed identifier ends
    /// the chain.
    pub fn read_idents(&mut self, max_levels: usize) -> Vec<Identifier> {
        let mut idents = Vec::new();

        for _ in 0..max_levels {
            let raw = self.read_ident();
            let Some(ident) = Identifier::from_raw(&raw) else {
                break;
            };
            idents.push(ident);

            if !self.is_next_period() {
                break;
            }
        }

        idents.reverse();
        idents
    }

    /// Determine which argument of the enclosing call the scan position is in
    ///
    /// Walks back to the unmatched `(`, counting commas at nesting depth zero.
    /// Returns `None` when a statement boundary (`;`), an unmatched bracket or
    /// the start of the buffer is reached first. On success the scan position
    /// sits right before the `(`, ready for [`read_ident`](Self::read_ident).
    pub fn read_arguments(&mut self) -> Option<usize> {
        let mut paren_depth = 0usize;
        let mut bracket_depth = 0usize;
        let mut curly_depth = 0usize;
        let mut param_count = 0usize;

        loop {
            self.skip_trivia();
            let ch = self.previous_char()?;

            match ch {
                '(' => match paren_depth.checked_sub(1) {
                    Some(depth) => paren_depth = depth,
                    None => return Some(param_count),
                },
                ')' => paren_depth += 1,
                '[' => bracket_depth = bracket_depth.checked_sub(1)?,
                ']' => bracket_depth += 1,
                '{' => curly_depth = curly_depth.checked_sub(1)?,
                '}' => curly_depth += 1,
                '\'' | '"' => self.skip_quoted(ch),
                '$' => self.skip_dollar_quoted(),
                ',' if paren_depth == 0 && bracket_depth == 0 && curly_depth == 0 => {
                    param_count += 1;
                }
                ';' => return None,
                _ => {}
            }
        }
    }

    /// Skip back over a `$tag$...$tag$` body whose closing `$` was just
    /// consumed
    ///
    /// Anything that is not a closing delimiter with a matching opener, such
    /// as a `$1` parameter, is left alone.
    fn skip_dollar_quoted(&mut self) {
        let close_end = self.pos + 1;
        let tag_start = self.pos
            - self.chars[..self.pos]
                .iter()
                .rev()
                .take_while(|&&c| is_ident_char(c))
                .count();
        let Some(open) = tag_start.checked_sub(1) else {
            return;
        };
        let tag_is_param = self.chars.get(tag_start).is_some_and(char::is_ascii_digit);
        if self.chars[open] != '$' || tag_is_param {
            return;
        }

        let delimiter = &self.chars[open..close_end];
        let opener = open
            .checked_sub(delimiter.len())
            .and_then(|last| (0..=last).rev().find(|&i| self.chars[i..].starts_with(delimiter)));
        if let Some(opener) = opener {
            self.pos = opener;
        }
    }

    /// Skip back to the quote that opens the literal whose closing `quote` was
    /// just consumed
    fn skip_quoted(&mut self, quote: char) {
        while let Some(ch) = self.previous_char() {
            if ch == quote {
                break;
            }
        }
    }
}
