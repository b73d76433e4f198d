//! Typed wrappers over the LSP methods the collector drives (spec §4.2).
//!
//! Every call here goes through [`DiskCache`] first and is written back on a
//! miss, so re-running the collector against an unchanged file costs one
//! hash lookup instead of a round-trip to the language server.

use std::path::Path;

use async_lsp::LanguageServer;
use lsp_types::{
    DefinitionParams, DocumentSymbol, DocumentSymbolParams, DocumentSymbolResponse,
    GotoDefinitionResponse, Location as LspLocation, PartialResultParams, ReferenceContext,
    ReferenceParams, SemanticTokensParams, SemanticTokensRangeParams, SemanticTokensRangeResult,
    SemanticTokensResult, TextDocumentIdentifier, TextDocumentPositionParams,
    TypeDefinitionParams, WorkDoneProgressParams,
};

use crate::error::{CollectError, Result};
use crate::pos::{FileUri, Location, Position, Range};

use super::cache::DiskCache;
use super::semantic_tokens::{self, Token};

fn text_document(uri: &FileUri) -> TextDocumentIdentifier {
    TextDocumentIdentifier {
        uri: uri.to_lsp_uri(),
    }
}

fn position_params(uri: &FileUri, pos: Position) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: text_document(uri),
        position: pos.into(),
    }
}

/// `textDocument/documentSymbol`, hierarchical form (requested via
/// `hierarchical_document_symbol_support`, see `transport::client_capabilities`).
pub async fn document_symbol(
    socket: &mut async_lsp::ClientSocket,
    cache: &DiskCache,
    uri: &FileUri,
) -> Result<Vec<DocumentSymbol>> {
    let params = DocumentSymbolParams {
        text_document: text_document(uri),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };
    let key = DiskCache::key("textDocument/documentSymbol", &params);
    if let Some(cached) = cache.get(&key) {
        if let Ok(symbols) = serde_json::from_value(cached) {
            return Ok(symbols);
        }
    }

    let response = socket
        .document_symbol(params)
        .await
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;

    let symbols = match response {
        Some(DocumentSymbolResponse::Nested(symbols)) => symbols,
        // Flat `SymbolInformation` responses carry no nesting; the caller
        // treats a single flat level the same as a degenerate tree.
        Some(DocumentSymbolResponse::Flat(infos)) => infos
            .into_iter()
            .map(|info| {
                #[allow(deprecated)]
                DocumentSymbol {
                    name: info.name,
                    detail: None,
                    kind: info.kind,
                    tags: info.tags,
                    deprecated: info.deprecated,
                    range: info.location.range,
                    selection_range: info.location.range,
                    children: None,
                }
            })
            .collect(),
        None => Vec::new(),
    };

    if let Ok(value) = serde_json::to_value(&symbols) {
        cache.put(key, value);
    }
    Ok(symbols)
}

/// `textDocument/references`, always with `includeDeclaration: true` — the
/// collector needs the declaration site to attribute self-references.
pub async fn references(
    socket: &mut async_lsp::ClientSocket,
    cache: &DiskCache,
    uri: &FileUri,
    pos: Position,
) -> Result<Vec<Location>> {
    let params = ReferenceParams {
        text_document_position: position_params(uri, pos),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: ReferenceContext {
            include_declaration: true,
        },
    };
    let key = DiskCache::key("textDocument/references", &params);
    if let Some(cached) = cache.get(&key) {
        if let Ok(locs) = serde_json::from_value::<Vec<LspLocation>>(cached) {
            return Ok(locs.into_iter().map(Location::from).collect());
        }
    }

    let response = socket
        .references(params)
        .await
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?
        .unwrap_or_default();

    if let Ok(value) = serde_json::to_value(&response) {
        cache.put(key, value);
    }
    Ok(response.into_iter().map(Location::from).collect())
}

/// `textDocument/definition`. Servers may answer with a single location, a
/// list, or links; all three collapse to the first location.
pub async fn definition(
    socket: &mut async_lsp::ClientSocket,
    cache: &DiskCache,
    uri: &FileUri,
    pos: Position,
) -> Result<Vec<Location>> {
    let params = DefinitionParams {
        text_document_position_params: position_params(uri, pos),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };
    let key = DiskCache::key("textDocument/definition", &params);
    if let Some(cached) = cache.get(&key) {
        if let Ok(locs) = serde_json::from_value::<Vec<LspLocation>>(cached) {
            return Ok(locs.into_iter().map(Location::from).collect());
        }
    }

    let response = socket
        .definition(params)
        .await
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;

    let locs = response.map(goto_response_to_locations).unwrap_or_default();
    if let Ok(value) = serde_json::to_value(
        locs.iter()
            .cloned()
            .map(lsp_types::Location::from)
            .collect::<Vec<_>>(),
    ) {
        cache.put(key, value);
    }
    Ok(locs)
}

/// `textDocument/typeDefinition` — same collapsing rule as `definition`.
pub async fn type_definition(
    socket: &mut async_lsp::ClientSocket,
    cache: &DiskCache,
    uri: &FileUri,
    pos: Position,
) -> Result<Vec<Location>> {
    let params = TypeDefinitionParams {
        text_document_position_params: position_params(uri, pos),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
    };
    let key = DiskCache::key("textDocument/typeDefinition", &params);
    if let Some(cached) = cache.get(&key) {
        if let Ok(locs) = serde_json::from_value::<Vec<LspLocation>>(cached) {
            return Ok(locs.into_iter().map(Location::from).collect());
        }
    }

    let response = socket
        .type_definition(params)
        .await
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;

    let locs = response.map(goto_response_to_locations).unwrap_or_default();
    if let Ok(value) = serde_json::to_value(
        locs.iter()
            .cloned()
            .map(lsp_types::Location::from)
            .collect::<Vec<_>>(),
    ) {
        cache.put(key, value);
    }
    Ok(locs)
}

/// Collapses `definition`/`typeDefinition`'s three possible response shapes
/// (scalar, array, link) down to a flat list of locations.
fn goto_response_to_locations(resp: GotoDefinitionResponse) -> Vec<Location> {
    match resp {
        GotoDefinitionResponse::Scalar(loc) => vec![loc.into()],
        GotoDefinitionResponse::Array(locs) => locs.into_iter().map(Location::from).collect(),
        GotoDefinitionResponse::Link(links) => links
            .into_iter()
            .map(|l| {
                Location::new(
                    FileUri::from_lsp_uri(&l.target_uri),
                    Range::from(l.target_range),
                )
            })
            .collect(),
    }
}

/// `textDocument/semanticTokens/range`, falling back to `/full` and slicing
/// client-side when the server doesn't support ranged requests (spec §4.2:
/// "falls back to semanticTokens/full when range is unsupported").
pub async fn semantic_tokens_range(
    socket: &mut async_lsp::ClientSocket,
    cache: &DiskCache,
    uri: &FileUri,
    range: Range,
    legend: &lsp_types::SemanticTokensLegend,
    file_text: &str,
    line_table: &crate::pos::LineTable,
    supports_range: bool,
) -> Result<Vec<Token>> {
    let raw = if supports_range {
        let params = SemanticTokensRangeParams {
            text_document: text_document(uri),
            range: range.into(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        let key = DiskCache::key("textDocument/semanticTokens/range", &params);
        if let Some(cached) = cache.get(&key) {
            if let Ok(data) = serde_json::from_value::<Vec<u32>>(cached) {
                return Ok(semantic_tokens::decode(&data, legend, file_text, line_table));
            }
        }
        let response = socket
            .semantic_tokens_range(params)
            .await
            .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;
        let data = match response {
            Some(SemanticTokensRangeResult::Tokens(t)) => t.data,
            Some(SemanticTokensRangeResult::Partial(p)) => p.data,
            None => Vec::new(),
        };
        if let Ok(value) = serde_json::to_value(&data) {
            cache.put(key, value);
        }
        data
    } else {
        let params = SemanticTokensParams {
            text_document: text_document(uri),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        let key = DiskCache::key("textDocument/semanticTokens/full", &params);
        let data = if let Some(cached) = cache.get(&key) {
            serde_json::from_value::<Vec<u32>>(cached).unwrap_or_default()
        } else {
            let response = socket
                .semantic_tokens_full(params)
                .await
                .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;
            let data = match response {
                Some(SemanticTokensResult::Tokens(t)) => t.data,
                Some(SemanticTokensResult::Partial(p)) => p.data,
                None => Vec::new(),
            };
            if let Ok(value) = serde_json::to_value(&data) {
                cache.put(key, value);
            }
            data
        };
        data
    };

    let decoded = semantic_tokens::decode(&raw, legend, file_text, line_table);
    if supports_range {
        return Ok(decoded);
    }
    // Slice the full-file decode down to `range` client-side.
    Ok(decoded
        .into_iter()
        .filter(|t| range.includes(&t.range))
        .collect())
}

/// `workspace/didOpen` notification — every file must be opened before the
/// server will answer per-document queries about it.
pub fn did_open(socket: &mut async_lsp::ClientSocket, uri: &FileUri, language_id: &str, text: &str) -> Result<()> {
    use lsp_types::{DidOpenTextDocumentParams, TextDocumentItem};
    socket
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.to_lsp_uri(),
                language_id: language_id.to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))
}

pub fn abs_path_to_uri(path: &Path) -> FileUri {
    FileUri::from_path(path)
}
