//! C `LanguageSpec`. No package system at all: every `.c`/`.h` file in the
//! repo is namespaced to a single synthetic package per directory, since
//! that's the closest C gets to Go/Rust's module boundaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use lsp_types::{DocumentSymbol, SymbolKind};
use regex::Regex;

use crate::error::Result;
use crate::lsp::Token;
use crate::model::Import;
use crate::options::Language;

use super::{FunctionSignatureRanges, LanguageSpec};

fn include_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*#include\s*[<"]([^">]+)[">]"#).unwrap())
}

#[derive(Default)]
pub struct CSpec;

impl LanguageSpec for CSpec {
    fn language(&self) -> Language {
        Language::C
    }

    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string());
        let mut members = BTreeMap::new();
        members.insert(name, root.to_path_buf());
        Ok(members)
    }

    fn name_space(&self, abs_path: &Path) -> (String, String) {
        let dir = abs_path.parent().unwrap_or(abs_path);
        let pkg = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());
        ("app".to_string(), pkg)
    }

    fn should_skip(&self, path: &Path) -> bool {
        !matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("c") | Some("h")
        )
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        let text = String::from_utf8_lossy(bytes);
        text.lines()
            .filter_map(|line| include_pattern().captures(line))
            .map(|caps| Import {
                path: caps[1].to_string(),
                alias: None,
            })
            .collect()
    }

    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize> {
        let target: crate::pos::Range = sym.selection_range.into();
        tokens.iter().position(|t| t.range == target)
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.type_name.as_str(), "function" | "struct" | "enum" | "typeAlias" | "union")
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
            "function" => SymbolKind::FUNCTION,
            "struct" | "union" => SymbolKind::STRUCT,
            "enum" => SymbolKind::ENUM,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::FUNCTION | SymbolKind::STRUCT | SymbolKind::ENUM | SymbolKind::VARIABLE
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        // C has no visibility keyword; `static` functions are the only
        // file-local ones, and clangd surfaces that as a detail string.
        !sym.detail.as_deref().unwrap_or("").contains("static")
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
    fn parses_angle_and_quoted_includes() {
        let spec = CSpec;
        let imports = spec.file_imports(b"#include <stdio.h>\n#include \"local.h\"\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "stdio.h");
        assert_eq!(imports[1].path, "local.h");
    }

    #[test]
    fn static_functions_are_not_public() {
        #[allow(deprecated)]
        let sym = DocumentSymbol {
            name: "helper".into(),
            detail: Some("static int helper(void)".into()),
            kind: SymbolKind::FUNCTION,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(1, 0)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            children: None,
        };
        assert!(!CSpec.is_public_symbol(&sym));
    }
}
