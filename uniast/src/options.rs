//! `ParseOptions` — the programmatic entry surface described in spec §6.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;

/// Which `LanguageSpec` to drive the collector with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    C,
    Java,
    Go,
    TypeScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::C => "c",
            Language::Java => "java",
            Language::Go => "go",
            Language::TypeScript => "typescript",
        }
    }

    /// Spec §6: "Go/TS bypass LSP with language-native AST libraries."
    pub fn bypasses_lsp(&self) -> bool {
        matches!(self, Language::Go | Language::TypeScript)
    }
}

/// A compiled `--exclude`/`--include` pattern. Wraps `Regex` so `ParseOptions`
/// can derive nothing fancier than `Clone` (regexes aren't `Eq`).
#[derive(Clone, Debug)]
pub struct PathPattern(pub Regex);

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.0.is_match(path)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    pub language: Option<Language>,
    /// Explicit language server binary, overriding the `LanguageSpec`'s
    /// default (e.g. a vendored `rust-analyzer`).
    pub lsp: Option<PathBuf>,
    pub load_external_symbol: bool,
    pub no_need_comment: bool,
    pub not_need_test: bool,
    pub load_by_packages: bool,
    pub excludes: Vec<PathPattern>,
    pub includes: Vec<PathPattern>,
    pub repo_id: Option<String>,
    pub lsp_cache_path: Option<PathBuf>,
    pub verbose: bool,
    /// TypeScript: path to `tsconfig.json`, for the native-AST bypass path.
    pub ts_config: Option<PathBuf>,
    /// Rust/other: extra source roots the native-AST bypass should scan in
    /// addition to what workspace discovery finds.
    pub ts_src_dirs: Vec<PathBuf>,
    pub lsp_options: HashMap<String, serde_json::Value>,
    /// Depth external-symbol expansion is allowed to recurse (spec §9,
    /// default 1).
    pub refer_code_depth: u32,
}

impl ParseOptions {
    pub fn new(language: Language) -> Self {
        Self {
            language: Some(language),
            refer_code_depth: 1,
            ..Default::default()
        }
    }

    pub fn should_skip_path(&self, repo_relative: &str) -> bool {
        if !self.includes.is_empty() && !self.includes.iter().any(|p| p.is_match(repo_relative)) {
            return true;
        }
        self.excludes.iter().any(|p| p.is_match(repo_relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_win_over_unset_includes() {
        let mut opts = ParseOptions::new(Language::Rust);
        opts.excludes.push(PathPattern::new(r"/target/").unwrap());
        assert!(opts.should_skip_path("proj/target/debug/foo.rs"));
        assert!(!opts.should_skip_path("proj/src/foo.rs"));
    }

    #[test]
    fn includes_restrict_when_present() {
        let mut opts = ParseOptions::new(Language::Rust);
        opts.includes.push(PathPattern::new(r"\.rs$").unwrap());
        assert!(opts.should_skip_path("proj/README.md"));
        assert!(!opts.should_skip_path("proj/src/lib.rs"));
    }
}
