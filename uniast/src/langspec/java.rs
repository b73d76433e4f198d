//! Java `LanguageSpec`. Java is the one language that keeps the LSP client
//! (for `jdtls` definition/reference lookups) but also routes through the
//! tree-sitter CST (`crate::treesitter`) for structural facts `jdtls`'s
//! `documentSymbol` tends to flatten or omit — see spec §4.6's Java note.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lsp_types::{DocumentSymbol, SymbolKind};

use crate::error::Result;
use crate::lsp::Token;
use crate::model::Import;
use crate::options::Language;
use crate::treesitter::{pom, walker};

use super::{FunctionSignatureRanges, LanguageSpec};

#[derive(Default)]
pub struct JavaSpec {
    /// groupId:artifactId -> version, read from the root POM (and any
    /// modules it declares) during `workspace`.
    coordinates: BTreeMap<String, String>,
}

impl LanguageSpec for JavaSpec {
    fn language(&self) -> Language {
        Language::Java
    }

    fn workspace(&mut self, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
        let root_pom = pom::load(&root.join("pom.xml"))?;
        let mut members = BTreeMap::new();
        members.insert(root_pom.artifact_id.clone(), root.to_path_buf());

        for dep in &root_pom.dependencies {
            self.coordinates
                .insert(format!("{}:{}", dep.group_id, dep.artifact_id), dep.version.clone());
        }

        for module_name in &root_pom.modules {
            let module_dir = root.join(module_name);
            if let Ok(module_pom) = pom::load(&module_dir.join("pom.xml")) {
                members.insert(module_pom.artifact_id, module_dir);
            }
        }

        Ok(members)
    }

    fn name_space(&self, abs_path: &Path) -> (String, String) {
        // Java's package declaration is the namespace, not the directory
        // name, but reading it means opening the file — the collector does
        // that once and calls `name_space_from_package_decl` instead. This
        // path-based fallback only runs for files that path never reaches
        // (e.g. external jar sources resolved purely by sourcepath).
        let pkg = abs_path
            .parent()
            .map(|p| p.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "."))
            .unwrap_or_default();
        ("app".to_string(), pkg)
    }

    fn should_skip(&self, path: &Path) -> bool {
        path.components().any(|c| c.as_os_str() == "target")
            || path.extension().and_then(|e| e.to_str()) != Some("java")
    }

    fn file_imports(&self, bytes: &[u8]) -> Vec<Import> {
        let text = String::from_utf8_lossy(bytes);
        text.lines()
            .filter_map(|line| line.trim().strip_prefix("import "))
            .map(|rest| rest.trim_end_matches(';').trim())
            .map(|path| Import {
                path: path.to_string(),
                alias: None,
            })
            .collect()
    }

    fn declare_token_of_symbol(&self, sym: &DocumentSymbol, tokens: &[Token]) -> Option<usize> {
        let target: crate::pos::Range = sym.selection_range.into();
        tokens.iter().position(|t| t.range == target)
    }

    fn is_entity_token(&self, tok: &Token) -> bool {
        matches!(tok.type_name.as_str(), "method" | "class" | "interface" | "enum")
    }

    fn is_std_token(&self, tok: &Token) -> bool {
        tok.modifiers.iter().any(|m| m == "defaultLibrary")
    }

    fn is_doc_token(&self, tok: &Token) -> bool {
        tok.type_name == "comment"
    }

    fn is_external_entity_token(&self, tok: &Token) -> bool {
        self.coordinates.keys().any(|coord| tok.text.starts_with(coord.split(':').last().unwrap_or("")))
    }

    fn token_kind(&self, tok: &Token) -> SymbolKind {
        match tok.type_name.as_str() {
            "method" => SymbolKind::METHOD,
            "class" => SymbolKind::CLASS,
            "interface" => SymbolKind::INTERFACE,
            "enum" => SymbolKind::ENUM,
            _ => SymbolKind::VARIABLE,
        }
    }

    fn is_entity_symbol(&self, sym: &DocumentSymbol) -> bool {
        matches!(
            sym.kind,
            SymbolKind::METHOD | SymbolKind::CLASS | SymbolKind::INTERFACE | SymbolKind::ENUM | SymbolKind::FIELD
        )
    }

    fn is_public_symbol(&self, sym: &DocumentSymbol) -> bool {
        sym.detail
            .as_deref()
            .map(|d| d.contains("public"))
            .unwrap_or(false)
    }

    fn is_main_function(&self, sym: &DocumentSymbol) -> bool {
        sym.name == "main"
            && sym
                .detail
                .as_deref()
                .map(|d| d.contains("static") && d.contains("void"))
                .unwrap_or(false)
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
                "<" if !in_params => {}
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

    fn supertypes(&self, source: &str) -> BTreeMap<String, Vec<String>> {
        walker::supertypes(source).unwrap_or_default()
    }

    fn is_test_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with("Test.java") || n.starts_with("Test") || n.ends_with("Tests.java"))
            .unwrap_or(false)
    }

    fn merge_cst_symbols(&self, source: &str, symbols: Vec<DocumentSymbol>) -> Vec<DocumentSymbol> {
        match walker::parse(source) {
            Ok((_, cst_symbols)) => walker::merge_trees(symbols, cst_symbols),
            Err(_) => symbols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_import_statements() {
        let spec = JavaSpec::default();
        let imports = spec.file_imports(b"package com.example;\n\nimport java.util.List;\nimport static java.lang.Math.max;\n");
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "java.util.List");
        assert_eq!(imports[1].path, "static java.lang.Math.max");
    }

    #[test]
    fn supertypes_reads_extends_clause() {
        let spec = JavaSpec::default();
        let supers = spec.supertypes("package shapes;\n\nclass Shape {}\n\nclass Circle extends Shape {}\n");
        assert_eq!(supers.get("Circle").unwrap(), &vec!["Shape".to_string()]);
    }

    #[test]
    fn is_test_file_matches_java_test_conventions() {
        let spec = JavaSpec::default();
        assert!(spec.is_test_file(Path::new("/repo/src/test/java/CircleTest.java")));
        assert!(!spec.is_test_file(Path::new("/repo/src/main/java/Circle.java")));
    }

    #[test]
    fn merge_cst_symbols_recovers_a_field_jdtls_flattened() {
        let spec = JavaSpec::default();
        let source = "package shapes;\n\nclass Circle {\n    private int radius;\n}\n";

        #[allow(deprecated)]
        let jdtls_symbols = vec![lsp_types::DocumentSymbol {
            name: "Circle".to_string(),
            detail: None,
            kind: SymbolKind::CLASS,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 0)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 0)),
            children: Some(vec![]),
        }];

        let merged = spec.merge_cst_symbols(source, jdtls_symbols);
        let circle = merged.iter().find(|s| s.name == "Circle").unwrap();
        let children = circle.children.as_ref().unwrap();
        assert!(children.iter().any(|c| c.name == "radius"));
    }
}
