//! Two layers of caching sit in front of every LSP round-trip (spec §4.2
//! "Caching"):
//!
//! - [`FileCache`]: in-memory, per-URI. Holds the file's text, its
//!   [`LineTable`], and whatever symbols/definitions/tokens have already been
//!   fetched for it, so the collector's nested module/file/symbol walk never
//!   asks the server for the same thing twice.
//! - [`DiskCache`]: a flat `method + sha256(params)` -> JSON-value map,
//!   persisted under the directory `ParseOptions::lsp_cache_path` names (or
//!   the OS cache dir), so re-running the collector against an unchanged
//!   repo skips the language server almost entirely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use lsp_types::DocumentSymbol;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::pos::{FileUri, LineTable, Location, Position};

use super::semantic_tokens::Token;

#[derive(Default)]
pub struct FileCacheEntry {
    pub text: Option<Arc<String>>,
    pub line_table: Option<Arc<LineTable>>,
    pub symbols: Option<Arc<Vec<DocumentSymbol>>>,
    pub tokens: Option<Arc<Vec<Token>>>,
    pub definitions: HashMap<Position, Arc<Vec<Location>>>,
    pub type_definitions: HashMap<Position, Arc<Vec<Location>>>,
    pub references: HashMap<Position, Arc<Vec<Location>>>,
}

/// In-memory per-file state, keyed by URI behind a lock-per-entry so queries
/// against different files never contend.
#[derive(Default)]
pub struct FileCache {
    entries: RwLock<HashMap<FileUri, Arc<Mutex<FileCacheEntry>>>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry(&self, uri: &FileUri) -> Arc<Mutex<FileCacheEntry>> {
        if let Some(existing) = self.entries.read().unwrap().get(uri) {
            return existing.clone();
        }
        let mut write = self.entries.write().unwrap();
        write
            .entry(uri.clone())
            .or_insert_with(|| Arc::new(Mutex::new(FileCacheEntry::default())))
            .clone()
    }

    pub fn invalidate(&self, uri: &FileUri) {
        self.entries.write().unwrap().remove(uri);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

/// Content-addressed on-disk cache for raw request/response pairs. Flushed
/// periodically rather than on every write, since the collector issues many
/// thousands of requests per medium-sized repo.
pub struct DiskCache {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, serde_json::Value>>,
    dirty_since_flush: std::sync::atomic::AtomicUsize,
}

const FLUSH_EVERY: usize = 64;

impl DiskCache {
    /// `path` names the JSON file backing the cache. `None` disables
    /// persistence; the cache still works in-memory for the duration of the
    /// process (spec §9: disk persistence is opt-in via `--cache`).
    pub fn open(path: Option<PathBuf>) -> Self {
        let entries = path
            .as_deref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: RwLock::new(entries),
            dirty_since_flush: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn key(method: &str, params: &impl Serialize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\0");
        if let Ok(bytes) = serde_json::to_vec(params) {
            hasher.update(&bytes);
        }
        format!("{method}:{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.read().unwrap().get(key).cloned()
    }

    pub fn put(&self, key: String, value: serde_json::Value) {
        self.entries.write().unwrap().insert(key, value);
        let count = self
            .dirty_since_flush
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        if count >= FLUSH_EVERY {
            let _ = self.flush();
        }
    }

    pub fn flush(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let entries = self.entries.read().unwrap();
        let body = serde_json::to_vec(&*entries)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, body)?;
        self.dirty_since_flush
            .store(0, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for DiskCache {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Default disk-cache location when the user doesn't set
/// `ParseOptions::lsp_cache_path`: `<os cache dir>/uniast/<repo_id>.json`.
pub fn default_cache_path(repo_id: &str) -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("uniast").join(format!("{repo_id}.json")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_cache_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let key = DiskCache::key("textDocument/definition", &serde_json::json!({"a": 1}));
        {
            let cache = DiskCache::open(Some(path.clone()));
            cache.put(key.clone(), serde_json::json!({"hit": true}));
            cache.flush().unwrap();
        }

        let reopened = DiskCache::open(Some(path));
        assert_eq!(reopened.get(&key), Some(serde_json::json!({"hit": true})));
    }

    #[test]
    fn key_is_stable_for_identical_method_and_params() {
        let a = DiskCache::key("m", &serde_json::json!({"x": 1}));
        let b = DiskCache::key("m", &serde_json::json!({"x": 1}));
        let c = DiskCache::key("m", &serde_json::json!({"x": 2}));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn file_cache_returns_same_entry_for_same_uri() {
        let cache = FileCache::new();
        let uri = FileUri::from_path(Path::new("/tmp/a.rs"));
        let e1 = cache.entry(&uri).await;
        let e2 = cache.entry(&uri).await;
        assert!(Arc::ptr_eq(&e1, &e2));
    }
}
