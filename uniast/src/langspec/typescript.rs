//! TypeScript/JavaScript `LanguageSpec`. Per spec §6 this language bypasses
//! the LSP client entirely: `parse_native` (`src/parse.rs`) calls
//! `crate::treesitter::typescript::collect_file`, an OXC-driven walk that
//! builds Function/Type/Var entities straight off the parsed AST, not off
//! this type's token/symbol methods below (those exist only to satisfy the
//! `LanguageSpec` contract other languages drive through `Collector::scan`).
//! Workspace discovery still reads `tsconfig.json`/`package.json` the way
//! every other language's manifest gets read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lsp_types::{DocumentSymbol, SymbolKind};

use crate::error::Result;
use crate::lsp::Token;
use crate::model::Import;
use crate::options::Language;

use super::{FunctionSignatureRanges, LanguageSpec};

#[derive(Default)]
pub struct TypeScriptSpec {
    package_name: String,
}

impl LanguageSpec for TypeScriptSpec {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let mut members = BTreeMap::new();
        if let Ok(text) = std::fs::read_to_string(root.join("package.json")) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                self.package_name = value
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("app")
                    .to_string();
            }
        }
        if self.package_name.is_empty() {
            self.package_name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "app".to_string());
        }
        members.insert(self.package_name.clone(), root.to_path_buf());
        Ok(members)
    }

    fn name_space(&self, abs_path: &Path) -> (String, String) {
        let dir = abs_path.parent().unwrap_or(abs_path);
        let pkg = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        (self.package_name.clone(), pkg)
    }

    fn should_skip(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "node_modules")
            || !matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("ts") | Some("tsx") | Some("js") | Some("jsx")
            )
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        // `treesitter::typescript::collect_file` re-parses each file's own
        // imports via OXC already; this textual fallback only serves the
        // pre-scan `parse_native` does before deciding whether to invoke
        // that full parse at all.
        let text = String::from_utf8_lossy(bytes);
        let mut imports = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if !trimmed.starts_with("import ") {
                continue;
            }
            if let Some(from_idx) = trimmed.rfind("from ") {
                let spec = trimmed[from_idx + 5..].trim().trim_matches(|c| c == '\'' || c == '"' || c == ';');
                imports.push(Import {
                    path: spec.to_string(),
                    alias: None,
                });
            }
        }
        imports
    }

    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize> {
        let target: crate::pos::Range = sym.selection_range.into();
        tokens.iter().position(|t| t.range == target)
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.type_name.as_str(), "function" | "method" | "class" | "interface" | "type")
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
            "class" => SymbolKind::CLASS,
            "interface" => SymbolKind::INTERFACE,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::FUNCTION | SymbolKind::METHOD | SymbolKind::CLASS | SymbolKind::INTERFACE | SymbolKind::VARIABLE
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        // Module-scoped `export` is the closest TS analogue of "public"; OXC's
        // semantic pass tags this on the declaration, surfaced here via detail.
        sym.detail
            .as_deref()
            .map(|d| d.contains("export"))
            .unwrap_or(true)
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.name == "main"
    }

    fn function_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> FunctionSignatureRanges {
        let sym_range: crate::pos::Range = sym.range.into();
        let mut ranges = FunctionSignatureRanges::default();
        let mut in_params = false;
        for (i, tok) in tokens.iter().enumerate() {
            if !sym_range.includes(&tok.range) {
                continue;
            }
            match tok.text.as_str() {
                "(" => in_params = true,
                ")" => in_params = false,
                "this" if ranges.receiver_token_idx.is_none() => ranges.receiver_token_idx = Some(i),
                _ => {}
            }
            if in_params && tok.type_name == "parameter" {
                ranges.input_param_token_idxs.push(i);
            }
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_default_import_specifiers() {
        let spec = TypeScriptSpec::default();
        let imports = spec.file_imports(b"import { foo } from \"./foo\";\nimport bar from 'bar';\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "./foo");
        assert_eq!(imports[1].path, "bar");
    }

    #[test]
    fn should_skip_excludes_node_modules() {
        let spec = TypeScriptSpec::default();
        assert!(spec.should_skip(Path::new("/repo/node_modules/x/index.ts")));
        assert!(!spec.should_skip(Path::new("/repo/src/index.ts")));
    }
}
