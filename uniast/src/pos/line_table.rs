//! Per-file line-offset table: converts `(line, character)` LSP positions to
//! byte offsets in O(1) after an O(n) scan, and caches that scan by URI so a
//! file is never re-counted across the many symbols/tokens the collector
//! queries within it.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{FileUri, Position};

/// Byte index of the start of each line within some text, plus the total
/// byte length. Index 0 is always 0 (the start of line 0).
#[derive(Debug, Clone)]
pub struct LineTable {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineTable {
    /// Scans `text` once, recording the byte offset where each line begins.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start_byte(&self, line: u32) -> usize {
        self.line_starts
            .get(line as usize)
            .copied()
            .unwrap_or(self.len)
    }

    fn line_end_byte(&self, line: u32) -> usize {
        self.line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.len)
    }

    /// Converts a UTF-16-based LSP position into a byte offset into `text`.
    /// `text` must be the same text this table was built from.
    pub fn byte_offset(&self, text: &str, pos: Position) -> usize {
        let line_start = self.line_start_byte(pos.line);
        let line_end = self.line_end_byte(pos.line).min(text.len());
        if line_start >= text.len() {
            return text.len();
        }
        let line_text = &text[line_start..line_end];

        // Walk UTF-16 code units within the line until `character` is consumed.
        let mut utf16_count = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16_count >= pos.character {
                return line_start + byte_idx;
            }
            utf16_count += ch.len_utf16() as u32;
        }
        line_start + line_text.len()
    }

    /// `relativeOffset` from spec §4.1: turns an LSP position into a byte
    /// offset without re-reading the file, given a cached table and text.
    pub fn relative_offset(&self, text: &str, pos: Position) -> usize {
        self.byte_offset(text, pos)
    }
}

/// Caches [`LineTable`]s keyed by file URI so repeated symbol/token queries
/// against the same open document don't re-scan it.
#[derive(Default)]
pub struct LineTableCache {
    inner: RwLock<HashMap<FileUri, std::sync::Arc<LineTable>>>,
}

impl LineTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, uri: &FileUri, text: &str) -> std::sync::Arc<LineTable> {
        if let Some(existing) = self.inner.read().unwrap().get(uri) {
            return existing.clone();
        }
        let table = std::sync::Arc::new(LineTable::new(text));
        self.inner
            .write()
            .unwrap()
            .insert(uri.clone(), table.clone());
        table
    }

    pub fn invalidate(&self, uri: &FileUri) {
        self.inner.write().unwrap().remove(uri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_and_converts_positions() {
        let text = "fn a() {\n  1\n}\n";
        let table = LineTable::new(text);
        assert_eq!(table.line_count(), 4); // trailing newline starts a 4th (empty) line
        assert_eq!(table.byte_offset(text, Position::new(1, 2)), 11);
    }

    #[test]
    fn cache_avoids_recompute_for_same_uri() {
        let cache = LineTableCache::new();
        let uri = FileUri::from_path(std::path::Path::new("/tmp/a.rs"));
        let text = "a\nb\nc\n";
        let t1 = cache.get_or_compute(&uri, text);
        let t2 = cache.get_or_compute(&uri, text);
        assert!(std::sync::Arc::ptr_eq(&t1, &t2));
    }
}
