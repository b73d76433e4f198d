//! Python `LanguageSpec`. Workspace discovery is purely by-convention: any
//! directory containing an `__init__.py` (or, failing that, the repo root
//! itself) is a module; there is no single manifest format worth parsing
//! for namespace purposes (`pyproject.toml` names the distribution, not the
//! import path).

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

fn import_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:from\s+(?P<from>[\w.]+)\s+import\s+(?P<names>.+)|import\s+(?P<plain>[\w.]+)(?:\s+as\s+(?P<alias>\w+))?)")
            .unwrap()
    })
}

#[derive(Default)]
pub struct PythonSpec;

impl LanguageSpec for PythonSpec {
    fn language(&self) -> Language {
        Language::Python
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
            .unwrap_or_default();
        ("app".to_string(), pkg)
    }

    fn should_skip(&self, path: &Path) -> bool {
        path.components().any(|c| {
            let s = c.as_os_str();
            s == "__pycache__" || s == ".venv" || s == "venv"
        }) || path.extension().and_then(|e| e.to_str()) != Some("py")
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        let text = String::from_utf8_lossy(bytes);
        let mut imports = Vec::new();
        for line in text.lines() {
            let Some(caps) = import_pattern().captures(line) else {
                continue;
            };
            if let Some(from) = caps.name("from") {
                let names = caps.name("names").map(|m| m.as_str()).unwrap_or_default();
                for name in names.split(',') {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    imports.push(Import {
                        path: format!("{}.{}", from.as_str(), name),
                        alias: None,
                    });
                }
            } else if let Some(plain) = caps.name("plain") {
                imports.push(Import {
                    path: plain.as_str().to_string(),
                    alias: caps.name("alias").map(|m| m.as_str().to_string()),
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
        matches!(tok.type_name.as_str(), "function" | "class" | "method")
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        tok.modifiers.iter().any(|m| m == "defaultLibrary")
    }

    fn is_doc_token(&self, tok: &Token) -> bool {
        tok.type_name == "comment" || tok.type_name == "string" && tok.text.starts_with("\"\"\"")
    }

    fn is_external_entity_token(&self, _tok: &Token) -> bool {
        false
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.type_name.as_str() {
            "function" | "method" => SymbolKind::FUNCTION,
            "class" => SymbolKind::CLASS,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::FUNCTION | SymbolKind::METHOD | SymbolKind::CLASS | SymbolKind::VARIABLE
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        !sym.name.starts_with('_')
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
                "self" if ranges.receiver_token_idx.is_none() => ranges.receiver_token_idx = Some(i),
                _ => {}
            }
            if in_params && tok.type_name == "parameter" {
                ranges.input_param_token_idxs.push(i);
            }
            if tok.type_name == "typeParameter" {
                ranges.type_param_token_idxs.push(i);
            }
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_import_with_multiple_names() {
        let spec = PythonSpec;
        let imports = spec.file_imports(b"from a.b import c, d\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "a.b.c");
        assert_eq!(imports[1].path, "a.b.d");
    }

    #[test]
    fn parses_plain_import_with_alias() {
        let spec = PythonSpec;
        let imports = spec.file_imports(b"import numpy as np\n");
        assert_eq!(imports[0].path, "numpy");
        assert_eq!(imports[0].alias.as_deref(), Some("np"));
    }

    #[test]
    fn public_symbol_excludes_leading_underscore() {
        #[allow(deprecated)]
        let sym = DocumentSymbol {
            name: "_private".into(),
            detail: None,
            kind: SymbolKind::FUNCTION,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(1, 0)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            children: None,
        };
        assert!(!PythonSpec.is_public_symbol(&sym));
    }
}
