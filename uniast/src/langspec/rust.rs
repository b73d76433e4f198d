//! Rust `LanguageSpec` (spec §4.3, §4.6 "Rust specifics").
//!
//! Workspace discovery reads `Cargo.toml` (`[workspace.members]` plus any
//! standalone `[package]`); external crates are namespaced by matching the
//! registry cache's `name-x.y.z` directory convention. Impl-block
//! decomposition is the one piece of real per-language surgery this crate
//! does: `impl Trait for Type { fn method }` has to become a `Type.method`
//! (or `Trait<Type>.method`) entity, not a bare `method`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lsp_types::{DocumentSymbol, SymbolKind};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::Result;
use crate::lsp::Token;
use crate::model::Import;
use crate::options::Language;
use crate::pos::Location;

use super::{FunctionSignatureRanges, ImplDecomposition, LanguageSpec};

/// Matches a vendored/registry crate source directory: `serde-1.0.219`.
fn external_crate_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<name>[A-Za-z0-9_\-]+)-(?P<version>\d+\.\d+\.\d+[^/]*)$").unwrap())
}

fn use_line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);").unwrap())
}

#[derive(Default)]
pub struct RustSpec {
    /// Crate name -> absolute source root (`src/`), discovered during
    /// `workspace`. Used by `name_space` to tell workspace-member crates
    /// apart from registry dependencies sharing the same target/ tree.
    members: OnceCell<BTreeMap<String, PathBuf>>,
}

impl RustSpec {
    fn members(&self) -> &BTreeMap<String, PathBuf> {
        self.members.get_or_init(BTreeMap::new)
    }
}

impl LanguageSpec for RustSpec {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let manifest_text = std::fs::read_to_string(root.join("Cargo.toml")).map_err(|source| {
            crate::error::CollectError::ManifestRead {
                path: root.join("Cargo.toml").display().to_string(),
                source,
            }
        })?;
        let manifest: toml::Value = manifest_text
            .parse()
            .map_err(|e: toml::de::Error| {
                crate::error::CollectError::ManifestRead {
                    path: root.join("Cargo.toml").display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
                }
            })?;

        let mut members = BTreeMap::new();

        if let Some(pkg) = manifest.get("package").and_then(|p| p.get("name")).and_then(|n| n.as_str()) {
            members.insert(pkg.to_string(), root.join("src"));
        }

        if let Some(globs) = manifest
            .get("workspace")
            .and_then(|w| w.get("members"))
            .and_then(|m| m.as_array())
        {
            for glob in globs.iter().filter_map(|v| v.as_str()) {
                for entry in glob_dirs(root, glob) {
                    let member_manifest = entry.join("Cargo.toml");
                    if let Ok(text) = std::fs::read_to_string(&member_manifest) {
                        if let Ok(value) = text.parse::<toml::Value>() {
                            if let Some(name) = value.get("package").and_then(|p| p.get("name")).and_then(|n| n.as_str()) {
                                members.insert(name.to_string(), entry.join("src"));
                            }
                        }
                    }
                }
            }
        }

        self.members = OnceCell::with_value(members.clone());
        Ok(members)
    }

    fn name_space(&self, abs_path: &Path) -> (String, String) {
        for (name, src_root) in self.members() {
            if abs_path.starts_with(src_root) {
                let pkg = module_path_from_src(src_root, abs_path);
                return (name.clone(), pkg);
            }
        }

        // External: walk ancestors looking for `<name>-<version>` inside a
        // registry `src/` checkout.
        for ancestor in abs_path.ancestors() {
            if let Some(file_name) = ancestor.file_name().and_then(|s| s.to_str()) {
                if let Some(caps) = external_crate_pattern().captures(file_name) {
                    let name = caps["name"].to_string();
                    let version = caps["version"].to_string();
                    let mod_path = format!("{name}@{version}");
                    let pkg = ancestor
                        .join("src")
                        .canonicalize()
                        .ok()
                        .and_then(|src| abs_path.canonicalize().ok().map(|p| module_path_from_src(&src, &p)))
                        .unwrap_or_else(|| name.clone());
                    return (mod_path, pkg);
                }
            }
        }

        (
            "unknown".to_string(),
            abs_path.to_string_lossy().to_string(),
        )
    }

    fn should_skip(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "target")
            || path.extension().and_then(|e| e.to_str()) != Some("rs")
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        let text = String::from_utf8_lossy(bytes);
        let mut imports = Vec::new();
        for line in text.lines() {
            if let Some(caps) = use_line_pattern().captures(line) {
                let body = caps[1].trim();
                let (path, alias) = match body.split_once(" as ") {
                    Some((p, a)) => (p.trim().to_string(), Some(a.trim().to_string())),
                    None => (body.to_string(), None),
                };
                imports.push(Import { path, alias });
            }
        }
        imports
    }

    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize> {
        let target: crate::pos::Range = sym.selection_range.into();
        tokens.iter().position(|t| t.range == target)
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(
            tok.type_name.as_str(),
            "function" | "method" | "struct" | "enum" | "interface" | "typeAlias" | "trait"
        )
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        tok.modifiers.iter().any(|m| m == "defaultLibrary")
    }

    fn is_doc_token(&self, tok: &Token) -> bool {
        tok.type_name == "comment"
    }

    fn is_external_entity_token(&self, _tok: &Token) -> bool {
        false
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.type_name.as_str() {
            "function" | "method" => SymbolKind::FUNCTION,
            "struct" => SymbolKind::STRUCT,
            "enum" => SymbolKind::ENUM,
            "interface" | "trait" => SymbolKind::INTERFACE,
            "variable" | "parameter" => SymbolKind::VARIABLE,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::FUNCTION
                | SymbolKind::METHOD
                | SymbolKind::STRUCT
                | SymbolKind::ENUM
                | SymbolKind::INTERFACE
                | SymbolKind::CONSTANT
                | SymbolKind::VARIABLE
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.detail
            .as_deref()
            .map(|d| d.trim_start().starts_with("pub"))
            .unwrap_or(false)
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.name == "main" && sym.kind == SymbolKind::FUNCTION
    }

    fn has_impl_symbol(&self) -> bool {
        true
    }

    fn impl_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<ImplDecomposition> {
        let name = sym.name.trim();
        if !name.starts_with("impl") {
            return None;
        }

        // `impl<T> Trait<U> for Type<T>` -> iface = "Trait<U>", receiver = "Type<T>".
        // Inherent `impl Type` has no `for`.
        let body = name.trim_start_matches("impl").trim();
        let (iface_text, receiver_text) = match body.split_once(" for ") {
            Some((iface, receiver)) => (Some(iface.trim()), receiver.trim()),
            None => (None, body),
        };

        let sym_range: crate::pos::Range = sym.range.into();
        let local_tokens: Vec<(usize, &Token)> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| sym_range.includes(&t.range))
            .collect();

        let receiver_type_token_idx = local_tokens
            .iter()
            .find(|(_, t)| receiver_text.starts_with(t.text.as_str()))
            .map(|(i, _)| *i)
            .unwrap_or(0);

        let iface_token_idx = iface_text.and_then(|iface| {
            local_tokens
                .iter()
                .find(|(_, t)| iface.starts_with(t.text.as_str()))
                .map(|(i, _)| *i)
        });

        let first_method_token_idx = local_tokens
            .iter()
            .find(|(_, t)| t.type_name == "keyword" && t.text == "fn")
            .map(|(i, _)| *i)
            .unwrap_or(local_tokens.len());

        Some(ImplDecomposition {
            iface_token_idx,
            receiver_type_token_idx,
            first_method_token_idx,
        })
    }

    fn function_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> FunctionSignatureRanges {
        let sym_range: crate::pos::Range = sym.range.into();
        let mut ranges = FunctionSignatureRanges::default();
        let mut in_params = false;
        let mut in_return = false;

        for (i, tok) in tokens.iter().enumerate() {
            if !sym_range.includes(&tok.range) {
                continue;
            }
            match tok.text.as_str() {
                "(" => in_params = true,
                ")" => in_params = false,
                "->" => in_return = true,
                "{" => in_return = false,
                "self" | "&self" | "&mut self" if ranges.receiver_token_idx.is_none() => {
                    ranges.receiver_token_idx = Some(i);
                }
                _ => {}
            }
            if tok.type_name == "typeParameter" {
                ranges.type_param_token_idxs.push(i);
            } else if in_params && self.is_entity_token(tok) {
                ranges.input_param_token_idxs.push(i);
            } else if in_return && self.is_entity_token(tok) {
                ranges.output_token_idxs.push(i);
            }
        }
        ranges
    }

    fn get_unloaded_symbol(&self, tok: &Token, _loc: &Location) -> Option<String> {
        // rust-analyzer resolves `lazy_static!`/proc-macro-generated items
        // poorly; fall back to the raw token text so the symbol at least
        // gets a name instead of being dropped.
        if tok.modifiers.iter().any(|m| m == "attribute") {
            Some(tok.text.clone())
        } else {
            None
        }
    }
}

fn module_path_from_src(src_root: &Path, abs_path: &Path) -> String {
    let rel = abs_path.strip_prefix(src_root).unwrap_or(abs_path);
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if let Some(last) = parts.last_mut() {
        *last = last.trim_end_matches(".rs").to_string();
        if last == "mod" || last == "lib" || last == "main" {
            parts.pop();
        }
    }
    if parts.is_empty() {
        "crate".to_string()
    } else {
        parts.join("::")
    }
}

/// Toolchain repair loop (spec §4.4 Initialization step 3, §9): `rust-analyzer`
/// refuses to boot usefully against a repo whose toolchain can't build. Tries
/// a plain `cargo build` first; on failure asks `rustup` to install whatever
/// toolchain the repo's `rust-toolchain.toml` names (or `stable` if there is
/// none), retrying up to `MAX_ATTEMPTS` times total before giving up.
const MAX_TOOLCHAIN_ATTEMPTS: u32 = 3;

pub fn ensure_toolchain(root: &Path) -> Result<()> {
    for attempt in 1..=MAX_TOOLCHAIN_ATTEMPTS {
        let build = std::process::Command::new("cargo")
            .arg("build")
            .arg("--quiet")
            .current_dir(root)
            .output();

        match build {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => {
                tracing::warn!(
                    attempt,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "cargo build failed during toolchain check"
                );
            }
            Err(e) => {
                return Err(crate::error::CollectError::ToolchainMissing(format!(
                    "cargo not found: {e}"
                )));
            }
        }

        if attempt == MAX_TOOLCHAIN_ATTEMPTS {
            break;
        }

        let toolchain = toolchain_channel(root);
        let install = std::process::Command::new("rustup")
            .args(["toolchain", "install", &toolchain])
            .output();
        match install {
            Ok(output) if output.status.success() => continue,
            Ok(output) => tracing::warn!(
                attempt,
                toolchain,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "rustup toolchain install failed"
            ),
            Err(e) => tracing::warn!(attempt, "rustup not available: {e}"),
        }
    }

    Err(crate::error::CollectError::ToolchainMissing(format!(
        "cargo build still failing after {MAX_TOOLCHAIN_ATTEMPTS} attempts"
    )))
}

/// Reads `rust-toolchain.toml`'s `[toolchain] channel`, defaulting to
/// `stable` when the file is absent or unparsable.
fn toolchain_channel(root: &Path) -> String {
    let Ok(text) = std::fs::read_to_string(root.join("rust-toolchain.toml")) else {
        return "stable".to_string();
    };
    text.parse::<toml::Value>()
        .ok()
        .and_then(|v| v.get("toolchain")?.get("channel")?.as_str().map(str::to_string))
        .unwrap_or_else(|| "stable".to_string())
}

fn glob_dirs(root: &Path, glob: &str) -> Vec<PathBuf> {
    if let Some(prefix) = glob.strip_suffix("/*") {
        let base = root.join(prefix);
        std::fs::read_dir(&base)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect()
    } else {
        vec![root.join(glob)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_crate_pattern_extracts_name_and_version() {
        let caps = external_crate_pattern().captures("serde-1.0.219").unwrap();
        assert_eq!(&caps["name"], "serde");
        assert_eq!(&caps["version"], "1.0.219");
    }

    #[test]
    fn module_path_strips_mod_rs_and_extension() {
        let src = Path::new("/repo/src");
        assert_eq!(module_path_from_src(src, Path::new("/repo/src/foo/mod.rs")), "foo");
        assert_eq!(module_path_from_src(src, Path::new("/repo/src/foo/bar.rs")), "foo::bar");
        assert_eq!(module_path_from_src(src, Path::new("/repo/src/lib.rs")), "crate");
    }

    #[test]
    fn file_imports_parses_simple_use_statements() {
        let spec = RustSpec::default();
        let imports = spec.file_imports(b"use std::fmt;\nuse foo::bar as baz;\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "std::fmt");
        assert_eq!(imports[1].alias.as_deref(), Some("baz"));
    }

    #[test]
    fn impl_symbol_splits_trait_and_receiver() {
        #[allow(deprecated)]
        let sym = DocumentSymbol {
            name: "impl MyTrait for MyType".to_string(),
            detail: None,
            kind: SymbolKind::OBJECT,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(3, 1)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            children: None,
        };
        let spec = RustSpec::default();
        let decomposition = spec.impl_symbol(&sym, &[]).unwrap();
        assert_eq!(decomposition.receiver_type_token_idx, 0);
    }
}
