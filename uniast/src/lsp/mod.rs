//! The LSP client (spec §4.2): spawns a language server, drives the
//! handshake, and exposes the handful of request types the collector needs,
//! each transparently cached.

mod cache;
mod protocol;
mod semantic_tokens;
mod symbols;
mod transport;

pub use cache::{default_cache_path, DiskCache, FileCache};
pub use semantic_tokens::Token;
pub use symbols::{flatten, FileStructure, FlatSymbol};
pub use transport::ServerHandshake;

use std::path::Path;
use std::sync::Arc;

use lsp_types::DocumentSymbol;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::pos::{FileUri, LineTable, Location, Position, Range};

/// Owns one language-server subprocess and every cache layered in front of
/// it. One `LspClient` per repo per language.
pub struct LspClient {
    socket: Mutex<async_lsp::ClientSocket>,
    handshake: ServerHandshake,
    language_id: &'static str,
    files: FileCache,
    disk: DiskCache,
}

impl LspClient {
    pub async fn spawn(
        command: &str,
        args: &[String],
        root: &Path,
        language_id: &'static str,
        disk_cache_path: Option<std::path::PathBuf>,
    ) -> Result<Self> {
        let (socket, handshake) = transport::start_server(command, args, root).await?;
        Ok(Self {
            socket: Mutex::new(socket),
            handshake,
            language_id,
            files: FileCache::new(),
            disk: DiskCache::open(disk_cache_path),
        })
    }

    pub fn handshake(&self) -> &ServerHandshake {
        &self.handshake
    }

    pub fn supports_semantic_tokens_range(&self) -> bool {
        matches!(
            self.handshake.capabilities.semantic_tokens_provider,
            Some(lsp_types::SemanticTokensServerCapabilities::SemanticTokensOptions(
                lsp_types::SemanticTokensOptions { range: Some(true), .. }
            )) | Some(
                lsp_types::SemanticTokensServerCapabilities::SemanticTokensRegistrationOptions(
                    lsp_types::SemanticTokensRegistrationOptions {
                        semantic_tokens_options: lsp_types::SemanticTokensOptions {
                            range: Some(true),
                            ..
                        },
                        ..
                    }
                )
            )
        )
    }

    /// Opens `path` on the server (idempotent: a no-op if already open) and
    /// returns its cached text + line table.
    pub async fn open_file(&self, path: &Path) -> Result<(FileUri, Arc<String>, Arc<LineTable>)> {
        let uri = protocol::abs_path_to_uri(path);
        let entry_lock = self.files.entry(&uri).await;
        let mut entry = entry_lock.lock().await;

        if let (Some(text), Some(table)) = (&entry.text, &entry.line_table) {
            return Ok((uri, text.clone(), table.clone()));
        }

        let text = Arc::new(std::fs::read_to_string(path)?);
        let table = Arc::new(LineTable::new(&text));

        let mut socket = self.socket.lock().await;
        protocol::did_open(&mut socket, &uri, self.language_id, &text)?;
        drop(socket);

        entry.text = Some(text.clone());
        entry.line_table = Some(table.clone());
        Ok((uri, text, table))
    }

    pub async fn document_symbol(&self, uri: &FileUri) -> Result<Arc<Vec<DocumentSymbol>>> {
        let entry_lock = self.files.entry(uri).await;
        let mut entry = entry_lock.lock().await;
        if let Some(symbols) = &entry.symbols {
            return Ok(symbols.clone());
        }
        let mut socket = self.socket.lock().await;
        let symbols = Arc::new(protocol::document_symbol(&mut socket, &self.disk, uri).await?);
        entry.symbols = Some(symbols.clone());
        Ok(symbols)
    }

    pub async fn semantic_tokens(
        &self,
        uri: &FileUri,
        range: Range,
        file_text: &str,
        line_table: &LineTable,
    ) -> Result<Arc<Vec<Token>>> {
        let entry_lock = self.files.entry(uri).await;
        let mut entry = entry_lock.lock().await;
        if let Some(tokens) = &entry.tokens {
            return Ok(tokens.clone());
        }
        let mut socket = self.socket.lock().await;
        let tokens = Arc::new(
            protocol::semantic_tokens_range(
                &mut socket,
                &self.disk,
                uri,
                range,
                &self.handshake.token_legend,
                file_text,
                line_table,
                self.supports_semantic_tokens_range(),
            )
            .await?,
        );
        entry.tokens = Some(tokens.clone());
        Ok(tokens)
    }

    pub async fn references(&self, uri: &FileUri, pos: Position) -> Result<Arc<Vec<Location>>> {
        let entry_lock = self.files.entry(uri).await;
        let mut entry = entry_lock.lock().await;
        if let Some(locs) = entry.references.get(&pos) {
            return Ok(locs.clone());
        }
        let mut socket = self.socket.lock().await;
        let locs = Arc::new(protocol::references(&mut socket, &self.disk, uri, pos).await?);
        entry.references.insert(pos, locs.clone());
        Ok(locs)
    }

    /// All candidate definitions for the token at `pos`, in server-returned
    /// order. Spec §4.4: the collector, not this client, decides which
    /// candidate wins when there's more than one.
    pub async fn definition(&self, uri: &FileUri, pos: Position) -> Result<Arc<Vec<Location>>> {
        let entry_lock = self.files.entry(uri).await;
        let mut entry = entry_lock.lock().await;
        if let Some(cached) = entry.definitions.get(&pos) {
            return Ok(cached.clone());
        }
        let mut socket = self.socket.lock().await;
        let locs = Arc::new(protocol::definition(&mut socket, &self.disk, uri, pos).await?);
        entry.definitions.insert(pos, locs.clone());
        Ok(locs)
    }

    pub async fn type_definition(&self, uri: &FileUri, pos: Position) -> Result<Arc<Vec<Location>>> {
        let entry_lock = self.files.entry(uri).await;
        let mut entry = entry_lock.lock().await;
        if let Some(cached) = entry.type_definitions.get(&pos) {
            return Ok(cached.clone());
        }
        let mut socket = self.socket.lock().await;
        let locs = Arc::new(protocol::type_definition(&mut socket, &self.disk, uri, pos).await?);
        entry.type_definitions.insert(pos, locs.clone());
        Ok(locs)
    }

    pub fn invalidate(&self, uri: &FileUri) {
        self.files.invalidate(uri);
    }

    pub fn flush_disk_cache(&self) -> std::io::Result<()> {
        self.disk.flush()
    }
}
