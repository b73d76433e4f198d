//! Subprocess lifecycle and the raw JSON-RPC transport (spec §4.2 steps 1-3).

use std::path::Path;
use std::process::Stdio;

use async_lsp::concurrency::ConcurrencyLayer;
use async_lsp::panic::CatchUnwindLayer;
use async_lsp::router::Router;
use async_lsp::{LanguageClient, LanguageServer};
use lsp_types::{
    ClientCapabilities, DocumentSymbolClientCapabilities, InitializeParams, InitializeResult,
    InitializedParams, TextDocumentClientCapabilities, Uri,
};
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{CollectError, Result};

/// Client-side state returned once `initialize`/`initialized` has completed.
pub struct ServerHandshake {
    pub capabilities: lsp_types::ServerCapabilities,
    pub token_legend: lsp_types::SemanticTokensLegend,
}

/// Spawns `command args...` with stdio wired for Content-Length-framed
/// JSON-RPC, stderr piped to the tracing log sink, and performs the full
/// `initialize` / `initialized` handshake (spec §4.2 steps 1-3).
///
/// Returns the raw `async_lsp::ClientSocket` the rest of the client module
/// drives, plus the negotiated capabilities/legend.
pub async fn start_server(
    command: &str,
    args: &[String],
    root: &Path,
) -> Result<(async_lsp::ClientSocket, ServerHandshake)> {
    let root_uri = crate::pos::FileUri::from_path(root).to_lsp_uri();

    let (mainloop, socket) = async_lsp::MainLoop::new_client(|_server| {
        let mut router = Router::new(());
        router.event(|_, _: async_lsp::LspStopped| std::ops::ControlFlow::Break(Ok(())));
        ConcurrencyLayer::new(CatchUnwindLayer::new(router))
    });

    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CollectError::ServerSpawnFailed {
            command: command.to_string(),
            source,
        })?;

    let stdout = child.stdout.take().expect("piped stdout");
    let stdin = child.stdin.take().expect("piped stdin");
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            use tokio::io::{AsyncBufReadExt, BufReader};
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "lsp_stderr", "{line}");
            }
        });
    }

    tokio::spawn(async move {
        if let Err(e) = mainloop.run_buffered(stdout, stdin).await {
            warn!("LSP main loop exited: {e}");
        }
    });

    let params = InitializeParams {
        process_id: Some(std::process::id()),
        root_uri: Some(root_uri),
        client_info: Some(lsp_types::ClientInfo {
            name: "vscode".to_string(),
            version: None,
        }),
        trace: Some(lsp_types::TraceValue::Off),
        capabilities: client_capabilities(),
        ..Default::default()
    };

    let mut socket = socket;
    let init_result: InitializeResult = socket
        .initialize(params)
        .await
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;

    socket
        .initialized(InitializedParams {})
        .map_err(|e| CollectError::InitializeFailed(e.to_string()))?;

    let caps = init_result.capabilities;
    if caps.definition_provider.is_none()
        || caps.type_definition_provider.is_none()
        || caps.document_symbol_provider.is_none()
        || caps.references_provider.is_none()
    {
        return Err(CollectError::InsufficientCapabilities(
            "missing one of definitionProvider/typeDefinitionProvider/documentSymbolProvider/referencesProvider".into(),
        ));
    }
    let legend = match &caps.semantic_tokens_provider {
        Some(lsp_types::SemanticTokensServerCapabilities::SemanticTokensOptions(opts)) => {
            opts.legend.clone()
        }
        Some(lsp_types::SemanticTokensServerCapabilities::SemanticTokensRegistrationOptions(opts)) => {
            opts.semantic_tokens_options.legend.clone()
        }
        None => {
            return Err(CollectError::InsufficientCapabilities(
                "server does not advertise semanticTokensProvider".into(),
            ));
        }
    };
    if legend.token_types.is_empty() {
        return Err(CollectError::InsufficientCapabilities(
            "semanticTokensProvider.legend.tokenTypes is empty".into(),
        ));
    }

    info!(
        token_types = legend.token_types.len(),
        token_modifiers = legend.token_modifiers.len(),
        "LSP server initialized"
    );

    Ok((
        socket,
        ServerHandshake {
            capabilities: caps,
            token_legend: legend,
        },
    ))
}

fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            document_symbol: Some(DocumentSymbolClientCapabilities {
                hierarchical_document_symbol_support: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Convenience: build the file:// URI the transport's `initialize` expects.
pub fn root_uri(root: &Path) -> Uri {
    crate::pos::FileUri::from_path(root).to_lsp_uri()
}
