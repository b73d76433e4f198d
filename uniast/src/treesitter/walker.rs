//! Tree-sitter CST walk for Java (SPEC_FULL.md §4.6a).
//!
//! `jdtls`'s own `documentSymbol` response is usable for top-level types and
//! methods but tends to flatten field declarations and skip anonymous
//! classes; this walker produces a second, CST-grounded symbol tree the
//! collector merges in wherever `jdtls`'s tree is missing a node tree-sitter
//! saw. Shaped as `lsp_types::DocumentSymbol` so the rest of the collector
//! (symbol flattening, token attribution) never needs to know which source
//! produced a given symbol.

use std::collections::BTreeMap;

use tree_sitter::{Node, Parser, Tree};

use lsp_types::{DocumentSymbol, Position, Range, SymbolKind};

use crate::error::{CollectError, Result};

/// Parses `source` as Java and returns the raw tree-sitter tree alongside
/// the decomposed symbol forest. Callers needing the raw tree (e.g. to
/// extract a node's exact byte span for `Content`) get both from one parse.
pub fn parse(source: &str) -> Result<(Tree, Vec<DocumentSymbol>)> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| CollectError::ToolchainMissing(format!("tree-sitter-java grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CollectError::ToolchainMissing("tree-sitter-java failed to parse file".to_string()))?;

    let root = tree.root_node();
    let mut symbols = Vec::new();
    for child in root.children(&mut root.walk()) {
        if let Some(sym) = convert(child, source) {
            symbols.push(sym);
        }
    }
    Ok((tree, symbols))
}

fn convert(node: Node, source: &str) -> Option<DocumentSymbol> {
    let kind = match node.kind() {
        "class_declaration" => SymbolKind::CLASS,
        "interface_declaration" => SymbolKind::INTERFACE,
        "enum_declaration" => SymbolKind::ENUM,
        "method_declaration" | "constructor_declaration" => SymbolKind::METHOD,
        "field_declaration" => SymbolKind::FIELD,
        _ => return None,
    };

    let name_node = node
        .child_by_field_name("name")
        .or_else(|| find_declarator_name(node));
    let name = name_node
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .unwrap_or("<anonymous>")
        .to_string();

    let range = node_range(node);
    let selection_range = name_node.map(node_range).unwrap_or(range);

    let body = node.child_by_field_name("body");
    let children: Vec<DocumentSymbol> = body
        .map(|body| {
            body.children(&mut body.walk())
                .filter_map(|child| convert(child, source))
                .collect()
        })
        .unwrap_or_default();

    #[allow(deprecated)]
    Some(DocumentSymbol {
        name,
        detail: node.utf8_text(source.as_bytes()).ok().map(|t| {
            t.lines().next().unwrap_or_default().trim().to_string()
        }),
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range,
        children: if children.is_empty() { None } else { Some(children) },
    })
}

/// Maps each top-level class/interface's name to the names of its
/// `extends`/`implements` supertypes (spec §8 scenario 3: `Circle extends
/// Shape`). Used by `JavaSpec::supertypes` to populate `Type.implements`
/// since `jdtls`'s `documentSymbol` response carries no inheritance edges.
pub fn supertypes(source: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| CollectError::ToolchainMissing(format!("tree-sitter-java grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CollectError::ToolchainMissing("tree-sitter-java failed to parse file".to_string()))?;

    let mut out = BTreeMap::new();
    let root = tree.root_node();
    for child in root.children(&mut root.walk()) {
        collect_supertypes(child, source, &mut out);
    }
    Ok(out)
}

/// Merges `cst` (this module's tree-sitter walk) into `jdtls` (the language
/// server's own `documentSymbol` response): for each CST symbol matching a
/// `jdtls` symbol by name, any CST child absent from the `jdtls` symbol's own
/// children (by name+kind) is appended — recovering fields `jdtls` flattened
/// out. A CST top-level symbol with no `jdtls` counterpart at all (e.g. a
/// package-private nested class jdtls omitted) is appended as-is.
pub fn merge_trees(mut jdtls: Vec<DocumentSymbol>, cst: Vec<DocumentSymbol>) -> Vec<DocumentSymbol> {
    for cst_sym in cst {
        match jdtls.iter_mut().find(|s| s.name == cst_sym.name) {
            Some(existing) => merge_children(existing, cst_sym),
            None => jdtls.push(cst_sym),
        }
    }
    jdtls
}

fn merge_children(existing: &mut DocumentSymbol, cst_sym: DocumentSymbol) {
    let mut children = existing.children.take().unwrap_or_default();
    if let Some(cst_children) = cst_sym.children {
        for cst_child in cst_children {
            if !children.iter().any(|c| c.name == cst_child.name && c.kind == cst_child.kind) {
                children.push(cst_child);
            }
        }
    }
    existing.children = if children.is_empty() { None } else { Some(children) };
}

fn collect_supertypes(node: Node, source: &str, out: &mut BTreeMap<String, Vec<String>>) {
    if !matches!(node.kind(), "class_declaration" | "interface_declaration") {
        return;
    }
    let Some(name) = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
    else {
        return;
    };

    let mut supers = Vec::new();
    if let Some(superclass) = node.child_by_field_name("superclass") {
        collect_type_identifiers(superclass, source, &mut supers);
    }
    if let Some(interfaces) = node.child_by_field_name("interfaces") {
        collect_type_identifiers(interfaces, source, &mut supers);
    }
    if !supers.is_empty() {
        out.insert(name.to_string(), supers);
    }

    if let Some(body) = node.child_by_field_name("body") {
        for child in body.children(&mut body.walk()) {
            collect_supertypes(child, source, out);
        }
    }
}

fn collect_type_identifiers(node: Node, source: &str, out: &mut Vec<String>) {
    if matches!(node.kind(), "type_identifier" | "scoped_type_identifier") {
        if let Ok(text) = node.utf8_text(source.as_bytes()) {
            out.push(text.to_string());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_type_identifiers(child, source, out);
    }
}

/// `field_declaration` nests its name inside a `variable_declarator`, not a
/// direct `name` field.
fn find_declarator_name(node: Node) -> Option<Node> {
    let declarator = node
        .children(&mut node.walk())
        .find(|c| c.kind() == "variable_declarator")?;
    declarator.child_by_field_name("name")
}

fn node_range(node: Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        Position::new(start.row as u32, start.column as u32),
        Position::new(end.row as u32, end.column as u32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_with_method_and_field() {
        let source = r#"
package com.example;

public class Greeter {
    private String prefix;

    public String greet(String name) {
        return prefix + name;
    }
}
"#;
        let (_, symbols) = parse(source).unwrap();
        let class = symbols.iter().find(|s| s.name == "Greeter").expect("class found");
        assert_eq!(class.kind, SymbolKind::CLASS);
        let children = class.children.as_ref().unwrap();
        assert!(children.iter().any(|c| c.name == "prefix" && c.kind == SymbolKind::FIELD));
        assert!(children.iter().any(|c| c.name == "greet" && c.kind == SymbolKind::METHOD));
    }

    #[test]
    fn merge_trees_recovers_flattened_field() {
        let source = r#"
package com.example;

class Greeter {
    private String prefix;

    public String greet(String name) {
        return prefix + name;
    }
}
"#;
        let (_, cst_symbols) = parse(source).unwrap();

        #[allow(deprecated)]
        let jdtls_symbols = vec![DocumentSymbol {
            name: "Greeter".to_string(),
            detail: None,
            kind: SymbolKind::CLASS,
            tags: None,
            deprecated: None,
            range: Range::new(Position::new(0, 0), Position::new(0, 0)),
            selection_range: Range::new(Position::new(0, 0), Position::new(0, 0)),
            children: Some(vec![]),
        }];

        let merged = merge_trees(jdtls_symbols, cst_symbols);
        let greeter = merged.iter().find(|s| s.name == "Greeter").unwrap();
        let children = greeter.children.as_ref().unwrap();
        assert!(children.iter().any(|c| c.name == "prefix" && c.kind == SymbolKind::FIELD));
    }

    #[test]
    fn supertypes_picks_up_extends_and_implements() {
        let source = r#"
package shapes;

interface Sizable {}

class Shape {}

class Circle extends Shape implements Sizable {
}
"#;
        let supers = supertypes(source).unwrap();
        let circle = supers.get("Circle").expect("Circle has supertypes");
        assert!(circle.contains(&"Shape".to_string()));
        assert!(circle.contains(&"Sizable".to_string()));
        assert!(!supers.contains_key("Shape"));
    }
}
