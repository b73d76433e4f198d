//! Error taxonomy (spec §7). Boot errors are fatal and bubble out of
//! [`crate::Parse`](crate::parse::Parse) unmodified; everything else is
//! recoverable and gets logged + counted on [`crate::collector::CollectStats`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("language toolchain unavailable: {0}")]
    ToolchainMissing(String),

    #[error("failed to spawn language server `{command}`: {source}")]
    ServerSpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "language server does not advertise required capabilities (needs documentSymbol + \
         definition + references + semanticTokens): {0}"
    )]
    InsufficientCapabilities(String),

    #[error("LSP initialize handshake failed: {0}")]
    InitializeFailed(String),

    #[error("no LanguageSpec registered for language `{0}`")]
    UnknownLanguage(String),

    #[error("workspace discovery failed reading manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CollectError>;
