//! The `LanguageSpec` contract (spec §4.3): the single polymorphic interface
//! the collector consumes to stay language-agnostic. One implementation per
//! source language; the collector never inspects source syntax directly
//! through any other door (Java's tree-sitter hybrid is the sole exception,
//! see `crate::treesitter`).

mod c;
mod go;
mod java;
mod python;
mod rust;
mod typescript;

pub use c::CSpec;
pub use go::GoSpec;
pub use java::JavaSpec;
pub use python::PythonSpec;
pub use rust::{ensure_toolchain, RustSpec};
pub use typescript::TypeScriptSpec;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lsp_types::{DocumentSymbol, SymbolKind};

use crate::error::Result;
use crate::lsp::Token;
use crate::model::Import;
use crate::options::Language;
use crate::pos::Location;

/// Token-index bounds for `impl Trait for Type { fn method ... }`-shaped
/// constructs. `iface_token_idx` is legitimately `None` both when there is no
/// `for`-clause (inherent impl) and when the construct doesn't decompose at
/// all — callers must not treat absence as an error (spec Open Questions).
#[derive(Clone, Debug, Default)]
pub struct ImplDecomposition {
    pub iface_token_idx: Option<usize>,
    pub receiver_type_token_idx: usize,
    pub first_method_token_idx: usize,
}

/// Token-index bounds for a function/method symbol's signature components,
/// as offsets into that symbol's own semantic-token array.
#[derive(Clone, Debug, Default)]
pub struct FunctionSignatureRanges {
    pub receiver_token_idx: Option<usize>,
    pub type_param_token_idxs: Vec<usize>,
    pub input_param_token_idxs: Vec<usize>,
    pub output_token_idxs: Vec<usize>,
}

pub trait LanguageSpec: Send + Sync {
    /// Used to select a server binary and `languageId` for LSP `didOpen`.
    fn language(&self) -> Language;

    /// Discover modules in-tree by parsing the manifest (`go.mod`,
    /// `Cargo.toml [package]`, `pom.xml` modules, …). Returns module name ->
    /// absolute root path. Populates whatever internal state `name_space`
    /// needs (crate registry maps, workspace member lists, …).
    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>>;

    /// Maps any file — repo-internal or external — to its `(ModPath, PkgPath)`
    /// identity prefix. External handling is language-specific, e.g. Rust's
    /// crates-registry path pattern `^name-\d+\.\d+\.\d+$` yields `name@version`.
    fn name_space(&self, abs_path: &Path) -> (String, String);

    /// Exclude build outputs, non-source files, generated artifacts.
    fn should_skip(&self, path: &Path) -> bool;

    /// Cheap syntactic import parse directly from file bytes.
    fn file_imports(&self, bytes: &[u8]) -> Vec<Import>;

    /// Index into `tokens` marking the declarator name token of `sym`.
    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize>;

    fn is_entity_token(&self, tok: &Token) -> bool;
    fn is_std_token(&self, tok: &Token) -> bool;
    fn is_doc_token(&self, tok: &Token) -> bool;
    fn is_external_entity_token(&self, tok: &Token) -> bool;

    /// Maps a semantic token's type string to the LSP `SymbolKind` it stands
    /// in for (function/method/type/variable/constant/…).
    fn token_kind(&self, tok: &Token) -> SymbolKind;

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool;
    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool;
    fn is_main_function(&self, sym: &DocumentSymbol) -> bool;

    /// Whether this language has an impl-block-like construct at all
    /// (`impl Trait for Type`). Rust: yes. Most others: no.
    fn has_impl_symbol(&self) -> bool {
        false
    }

    fn impl_symbol(&self, _sym: &DocumentSymbol, _tokens: &[Token]) -> Option<ImplDecomposition> {
        None
    }

    fn function_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> FunctionSignatureRanges;

    /// Maps a declared type's name to the names of its supertypes (Java
    /// `extends`/`implements`, ...), read straight from `source` rather than
    /// from any symbol the language server emits. Most languages have no
    /// syntactic supertype relationship worth extracting this way.
    fn supertypes(&self, _source: &str) -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }

    /// Whether `path` is a test file whose entities `ParseOptions::not_need_test`
    /// should skip. The default heuristic covers the common `test`/`.spec.`
    /// filename conventions; languages with their own convention override it.
    fn is_test_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.contains("test") || n.contains(".spec.") || n.contains("Test"))
            .unwrap_or(false)
    }

    /// Resolves late-bound symbols the language server will never enumerate
    /// (e.g. symbols produced by Rust's `lazy_static!`), by reading the
    /// name textually at the target location.
    fn get_unloaded_symbol(&self, _tok: &Token, _loc: &Location) -> Option<String> {
        None
    }

    /// Splices a second, syntax-derived symbol tree into the language
    /// server's own `documentSymbol` response wherever the server's tree is
    /// missing a node (spec §4.6a's Java note: `jdtls` flattens field
    /// declarations and skips anonymous classes). A no-op for every language
    /// without such a companion CST walk.
    fn merge_cst_symbols(&self, _source: &str, symbols: Vec<DocumentSymbol>) -> Vec<DocumentSymbol> {
        symbols
    }
}

/// Builds the `LanguageSpec` registered for `language`.
pub fn for_language(language: Language) -> Box<dyn LanguageSpec> {
    match language {
        Language::Rust => Box::new(RustSpec::default()),
        Language::Python => Box::new(PythonSpec::default()),
        Language::C => Box::new(CSpec::default()),
        Language::Java => Box::new(JavaSpec::default()),
        Language::Go => Box::new(GoSpec::default()),
        Language::TypeScript => Box::new(TypeScriptSpec::default()),
    }
}
