//! Go `LanguageSpec`. Per spec §6, Go bypasses the LSP client entirely:
//! `parse_native` calls `crate::treesitter::go::collect_file` directly,
//! which builds Function/Type/Var entities straight off tree-sitter-go's
//! CST, never through this type's token/symbol methods below. `GoSpec`
//! still owns workspace/namespace logic (`go.mod` parsing) since that runs
//! regardless of which extraction path a language takes; the token-shaped
//! predicates exist only to satisfy `LanguageSpec` for tooling that expects
//! every language to implement the full trait.

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

fn module_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^module\s+(\S+)").unwrap())
}

fn require_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*require\s+(\S+)\s+(\S+)").unwrap())
}

fn import_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:(\w+)\s+)?"([^"]+)""#).unwrap())
}

#[derive(Default)]
pub struct GoSpec {
    module_name: String,
    requires: BTreeMap<String, String>,
}

impl LanguageSpec for GoSpec {
    fn language(&self) -> Language {
        Language::Go
    }

    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let text = std::fs::read_to_string(root.join("go.mod")).map_err(|source| {
            crate::error::CollectError::ManifestRead {
                path: root.join("go.mod").display().to_string(),
                source,
            }
        })?;

        self.module_name = module_directive()
            .captures(&text)
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        for caps in require_directive().captures_iter(&text) {
            self.requires.insert(caps[1].to_string(), caps[2].to_string());
        }

        let mut members = BTreeMap::new();
        members.insert(self.module_name.clone(), root.to_path_buf());
        Ok(members)
    }

    fn name_space(&self, abs_path: &Path) -> (String, String) {
        let dir = abs_path.parent().unwrap_or(abs_path);
        let pkg_path = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        (self.module_name.clone(), pkg_path)
    }

    fn should_skip(&self, path: &Path) -> bool {
        // `_test.go` files are collected, just flagged via `Package::is_test`
        // downstream — only non-Go files are actually excluded here.
        path.extension().and_then(|e| e.to_str()) != Some("go")
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        let text = String::from_utf8_lossy(bytes);
        let Some(block_start) = text.find("import (") else {
            return single_line_import(&text);
        };
        let Some(block_end) = text[block_start..].find(')') else {
            return Vec::new();
        };
        let block = &text[block_start..block_start + block_end];
        import_block()
            .captures_iter(block)
            .map(|caps| Import {
                path: caps[2].to_string(),
                alias: caps.get(1).map(|m| m.as_str().to_string()),
            })
            .collect()
    }

    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize> {
        let target: crate::pos::Range = sym.selection_range.into();
        tokens.iter().position(|t| t.range == target)
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.type_name.as_str(), "function" | "method" | "struct" | "interface" | "typeAlias")
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
            "interface" => SymbolKind::INTERFACE,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::FUNCTION | SymbolKind::METHOD | SymbolKind::STRUCT | SymbolKind::INTERFACE | SymbolKind::VARIABLE
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.name == "main"
    }

    fn function_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> FunctionSignatureRanges {
        let sym_range: crate::pos::Range = sym.range.into();
        let mut ranges = FunctionSignatureRanges::default();
        let mut in_params = false;
        let mut paren_depth = 0;
        for (i, tok) in tokens.iter().enumerate() {
            if !sym_range.includes(&tok.range) {
                continue;
            }
            if tok.text == "(" {
                paren_depth += 1;
                if paren_depth == 1 {
                    in_params = true;
                }
            }
            if tok.text == ")" {
                paren_depth -= 1;
                if paren_depth == 0 {
                    in_params = false;
                }
            }
            if in_params && tok.type_name == "parameter" {
                ranges.input_param_token_idxs.push(i);
            }
        }
        ranges
    }
}

fn single_line_import(text: &str) -> Vec<Import> {
    text.lines()
        .filter_map(|l| l.trim().strip_prefix("import "))
        .filter_map(|rest| import_block().captures(rest))
        .map(|caps| Import {
            path: caps[2].to_string(),
            alias: caps.get(1).map(|m| m.as_str().to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_and_require_directives() {
        let mut spec = GoSpec::default();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("go.mod"),
            "module example.com/app\n\nrequire github.com/pkg/errors v0.9.1\n",
        )
        .unwrap();
        spec.workspace(dir.path()).unwrap();
        assert_eq!(spec.module_name, "example.com/app");
        assert_eq!(spec.requires.get("github.com/pkg/errors").unwrap(), "v0.9.1");
    }

    #[test]
    fn parses_import_block_with_alias() {
        let spec = GoSpec::default();
        let imports = spec.file_imports(
            b"import (\n\t\"fmt\"\n\tfoo \"example.com/foo\"\n)\n",
        );
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "fmt");
        assert_eq!(imports[1].path, "example.com/foo");
        assert_eq!(imports[1].alias.as_deref(), Some("foo"));
    }

    #[test]
    fn exported_symbols_start_uppercase() {
        #[allow(deprecated)]
        let sym = DocumentSymbol {
            name: "DoThing".into(),
            detail: None,
            kind: SymbolKind::FUNCTION,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(1, 0)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            children: None,
        };
        assert!(GoSpec::default().is_public_symbol(&sym));
    }
}
