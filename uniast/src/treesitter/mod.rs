//! Direct source-syntax parsing, as opposed to going through `LanguageSpec`'s
//! token/symbol abstractions end to end.
//!
//! Java (`walker`) is a true hybrid: its CST walk runs *alongside* the
//! `jdtls` LSP client, filling in structural facts (field declarations,
//! `extends`/`implements`) `documentSymbol` tends to flatten or omit. Go
//! (`go`) and TypeScript (`typescript`) have no LSP client to hybridize with
//! at all — each is the sole source of its language's entities, per spec §6's
//! native-AST bypass.

pub mod go;
pub mod pom;
pub mod typescript;
pub mod walker;

/// Out-of-process companion for Java CST enrichment that needs a real JVM
/// (e.g. resolving annotation processors) the pure-Rust tree-sitter grammar
/// can't do alone. Gated behind the `java-companion` feature; the default
/// build never spawns a JVM.
#[cfg(feature = "java-companion")]
pub trait JavaCompanion: Send + Sync {
    /// Sends a source file to the companion process and returns whatever
    /// supplementary symbol annotations it produces, keyed by symbol name.
    fn annotate(&self, source: &str) -> crate::error::Result<std::collections::HashMap<String, String>>;
}
