// Copyright (c) 2025 pg-sql-lsp contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Document Management
//!
//! Open documents are kept as ropes keyed by URI.
//!
//! ## Positions
//!
//! LSP positions count UTF-16 code units while the lexical layer counts
//! Unicode scalar values. [`Document::char_offset`] and
//! [`Document::lsp_position`] convert between the two so nothing outside this
//! module has to care.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pg_sql_lsp_lsp::DocumentStore;
//! use tower_lsp::lsp_types::Url;
//!
//! let store = DocumentStore::new();
//! let uri = Url::parse("file:///query.sql").unwrap();
//! store.open_document(uri.clone(), "SELECT 1".into(), 1, "sql".into()).await;
//!
//! if let Some(doc) = store.get_document(&uri).await {
//!     println!("Content: {}", doc.get_content());
//! }
//! ```

use ropey::Rope;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{
    Position, TextDocumentContentChangeEvent, Url, VersionedTextDocumentIdentifier,
};

/// A document managed by the LSP server
#[derive(Debug, Clone)]
pub struct Document {
    uri: Url,
    language_id: String,
    version: i32,
    content: Rope,
}

impl Document {
    pub fn new(uri: Url, content: String, version: i32, language_id: String) -> Self {
        Self {
            uri,
            language_id,
            version,
            content: Rope::from_str(&content),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn line_count(&self) -> usize {
        self.content.len_lines()
    }

    /// Full document content
    pub fn get_content(&self) -> String {
        self.content.to_string()
    }

    /// Character offset of an LSP position
    ///
    /// Positions past the end of a line clamp to the line end, and lines past
    /// the end of the document clamp to the document end.
    pub fn char_offset(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_count() {
            return self.content.len_chars();
        }

        let line_start = self.content.line_to_char(line);
        let line_end = line_start + self.line_len_chars(line);

        let start_cu = self.content.char_to_utf16_cu(line_start);
        let end_cu = self.content.char_to_utf16_cu(line_end);
        let target_cu = (start_cu + position.character as usize).min(end_cu);

        self.content.utf16_cu_to_char(target_cu)
    }

    /// LSP position of a zero-based line and character column
    pub fn lsp_position(&self, line: usize, column: usize) -> Position {
        if line >= self.line_count() {
            let last = self.line_count().saturating_sub(1);
            return self.lsp_position(last, usize::MAX);
        }

        let line_start = self.content.line_to_char(line);
        let column = column.min(self.line_len_chars(line));
        let character = self.content.char_to_utf16_cu(line_start + column)
            - self.content.char_to_utf16_cu(line_start);

        Position::new(line as u32, character as u32)
    }

    /// Characters on `line`, excluding the line ending
    fn line_len_chars(&self, line: usize) -> usize {
        let slice = self.content.line(line);
        let mut len = slice.len_chars();
        for ending in ['\n', '\r'] {
            if len > 0 && slice.char(len - 1) == ending {
                len -= 1;
            }
        }
        len
    }

    /// Apply content changes to the document
    ///
    /// A change without a range replaces the whole document. `range_length` is
    /// deprecated in the protocol and ignored.
    pub fn apply_changes(
        &mut self,
        changes: &[TextDocumentContentChangeEvent],
        new_version: i32,
    ) -> Result<(), DocumentError> {
        for change in changes {
            match &change.range {
                Some(range) => {
                    let (start_line, end_line) =
                        (range.start.line as usize, range.end.line as usize);

                    // A range may end at the position just past the last line
                    if start_line > self.line_count() || end_line > self.line_count() {
                        return Err(DocumentError::InvalidRange {
                            start: (start_line, range.start.character as usize),
                            end: (end_line, range.end.character as usize),
                        });
                    }

                    let start_char = self.char_offset(range.start);
                    let end_char = self.char_offset(range.end);
                    if start_char > end_char {
                        return Err(DocumentError::InvalidChange);
                    }

                    self.content.remove(start_char..end_char);
                    self.content.insert(start_char, &change.text);
                }
                None => {
                    self.content = Rope::from_str(&change.text);
                }
            }
        }

        self.version = new_version;

        Ok(())
    }
}

/// Document store for managing multiple documents
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Arc<RwLock<HashMap<Url, Document>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) a document
    pub async fn open_document(&self, uri: Url, content: String, version: i32, language_id: String) {
        let mut docs = self.documents.write().await;
        docs.insert(uri.clone(), Document::new(uri, content, version, language_id));
    }

    /// Close a document, returning whether it was open
    pub async fn close_document(&self, uri: &Url) -> bool {
        let mut docs = self.documents.write().await;
        docs.remove(uri).is_some()
    }

    /// Apply changes and return a snapshot of the updated document
    pub async fn update_document(
        &self,
        identifier: &VersionedTextDocumentIdentifier,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<Document, DocumentError> {
        let mut docs = self.documents.write().await;

        let document = docs
            .get_mut(&identifier.uri)
            .ok_or_else(|| DocumentError::DocumentNotFound(identifier.uri.clone()))?;

        document.apply_changes(changes, identifier.version)?;

        Ok(document.clone())
    }

    /// Snapshot of a document
    pub async fn get_document(&self, uri: &Url) -> Option<Document> {
        let docs = self.documents.read().await;
        docs.get(uri).cloned()
    }

    pub async fn has_document(&self, uri: &Url) -> bool {
        let docs = self.documents.read().await;
        docs.contains_key(uri)
    }

    pub async fn list_uris(&self) -> Vec<Url> {
        let docs = self.documents.read().await;
        docs.keys().cloned().collect()
    }

    pub async fn document_count(&self) -> usize {
        let docs = self.documents.read().await;
        docs.len()
    }
}

/// Document-related errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Url),

    #[error("Invalid range: start={start:?}, end={end:?}")]
    InvalidRange {
        start: (usize, usize),
        end: (usize, usize),
    },

    #[error("Invalid content change")]
    InvalidChange,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Range;

    fn create_test_uri() -> Url {
        Url::parse("file:///test.sql").unwrap()
    }

    fn doc(content: &str) -> Document {
        Document::new(create_test_uri(), content.to_string(), 1, "sql".to_string())
    }

    fn ranged(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_lines_end_at_lf_crlf_and_cr_only() {
        let doc = doc("SELECT *\r\nFROM users\rWHERE x = '\u{2028}'");
        assert_eq!(doc.line_count(), 3);

        assert_eq!(doc.char_offset(Position::new(0, 99)), 8);
        assert_eq!(doc.char_offset(Position::new(1, 4)), 14);
        assert_eq!(doc.char_offset(Position::new(2, 0)), 21);
        assert_eq!(doc.lsp_position(2, 99), Position::new(2, 12));
    }

    #[test]
    fn test_char_offset_counts_utf16() {
        // 'é' is one unit, '𝄞' is two
        let doc = doc("SELECT 'é𝄞' AS x\nFROM t");

        assert_eq!(doc.char_offset(Position::new(0, 0)), 0);
        assert_eq!(doc.char_offset(Position::new(0, 9)), 9);
        assert_eq!(doc.char_offset(Position::new(0, 11)), 10);
        assert_eq!(doc.char_offset(Position::new(0, 99)), 16);
        assert_eq!(doc.char_offset(Position::new(1, 4)), 21);
        assert_eq!(doc.char_offset(Position::new(7, 0)), 23);
    }

    #[test]
    fn test_lsp_position_round_trip() {
        let doc = doc("SELECT '𝄞', bad\nFROM t");

        let position = doc.lsp_position(0, 12);
        assert_eq!(position, Position::new(0, 13));
        assert_eq!(doc.char_offset(position), 12);
        assert_eq!(doc.lsp_position(0, 500), Position::new(0, 16));
        assert_eq!(doc.lsp_position(9, 0), Position::new(1, 6));
    }

    #[test]
    fn test_apply_changes_full() {
        let mut doc = doc("old content");

        let changes = vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new content".to_string(),
        }];
        doc.apply_changes(&changes, 2).unwrap();

        assert_eq!(doc.get_content(), "new content");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_apply_changes_incremental() {
        let mut doc = doc("SELECT * FROM users");

        doc.apply_changes(&[ranged((0, 7), (0, 8), "id")], 2).unwrap();
        assert_eq!(doc.get_content(), "SELECT id FROM users");

        doc.apply_changes(&[ranged((0, 20), (0, 20), ";\nSELECT 2;")], 3)
            .unwrap();
        assert_eq!(doc.get_content(), "SELECT id FROM users;\nSELECT 2;");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.version(), 3);
    }

    #[test]
    fn test_apply_changes_invalid_range() {
        let mut doc = doc("SELECT *");

        let result = doc.apply_changes(&[ranged((0, 0), (10, 0), "x")], 2);
        assert!(matches!(result, Err(DocumentError::InvalidRange { .. })));

        let result = doc.apply_changes(&[ranged((0, 5), (0, 2), "x")], 2);
        assert!(matches!(result, Err(DocumentError::InvalidChange)));
        assert_eq!(doc.version(), 1);
    }

    #[tokio::test]
    async fn test_document_store_lifecycle() {
        let store = DocumentStore::new();
        let uri = create_test_uri();

        store
            .open_document(uri.clone(), "old".to_string(), 1, "sql".to_string())
            .await;
        assert!(store.has_document(&uri).await);

        let identifier = VersionedTextDocumentIdentifier {
            uri: uri.clone(),
            version: 2,
        };
        let changes = vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        }];
        let updated = store.update_document(&identifier, &changes).await.unwrap();
        assert_eq!(updated.get_content(), "new");
        assert_eq!(updated.version(), 2);

        assert!(store.close_document(&uri).await);
        assert!(!store.has_document(&uri).await);
        assert_eq!(store.document_count().await, 0);
        assert!(matches!(
            store.update_document(&identifier, &changes).await,
            Err(DocumentError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_document_store_list_uris() {
        let store = DocumentStore::new();
        let uri1 = Url::parse("file:///test1.sql").unwrap();
        let uri2 = Url::parse("file:///test2.sql").unwrap();

        store
            .open_document(uri1.clone(), "SELECT 1".to_string(), 1, "sql".to_string())
            .await;
        store
            .open_document(uri2.clone(), "SELECT 2".to_string(), 1, "sql".to_string())
            .await;

        let uris = store.list_uris().await;
        assert_eq!(uris.len(), 2);
        assert!(uris.contains(&uri1));
        assert!(uris.contains(&uri2));
    }
}
