//! Tree-sitter CST walk for Go's native-AST bypass path (spec §6: "Go/TS
//! bypass LSP with language-native AST libraries"). Unlike Java's hybrid
//! (`crate::treesitter::walker`, merged alongside `jdtls`), Go never talks to
//! a language server at all — this is the sole source of `Function`/`Type`/
//! `Var` entities for Go.
//!
//! Without a server there is no `textDocument/definition` to resolve a call
//! or a global-var reference, so dependency resolution here is textual: every
//! top-level name declared in the package is indexed first, then each
//! function body is walked for identifiers that happen to match one.
//! Same-package only — this does not attempt cross-package Go resolution.

use std::collections::{BTreeMap, BTreeSet};

use tree_sitter::{Node, Parser};

use crate::error::{CollectError, Result};
use crate::model::{insert_ordered, Dependency, FileLine, Function, Identity, Package, Receiver, Type, Var};

#[derive(Default)]
struct Declared {
    funcs: BTreeSet<String>,
    vars: BTreeSet<String>,
    types: BTreeSet<String>,
}

/// Parses `source` and inserts every top-level Function/Type/Var it finds
/// into `package`, namespaced under `(mod_path, pkg_path)`.
pub fn collect_file(source: &str, file_path: &str, mod_path: &str, pkg_path: &str, package: &mut Package) -> Result<()> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| CollectError::ToolchainMissing(format!("tree-sitter-go grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CollectError::ToolchainMissing("tree-sitter-go failed to parse file".to_string()))?;

    let root = tree.root_node();
    let mut declared = Declared::default();
    for child in root.children(&mut root.walk()) {
        index_declared_names(child, source, &mut declared);
    }

    for child in root.children(&mut root.walk()) {
        match child.kind() {
            "function_declaration" => {
                if let Some(f) = convert_function(child, source, file_path, mod_path, pkg_path, &declared, None) {
                    package.functions.insert(f.identity.name.clone(), f);
                }
            }
            "method_declaration" => {
                if let Some((f, receiver_type)) = convert_method(child, source, file_path, mod_path, pkg_path, &declared) {
                    let _ = receiver_type;
                    package.functions.insert(f.identity.name.clone(), f);
                }
            }
            "type_declaration" => {
                for t in convert_type_declaration(child, source, file_path, mod_path, pkg_path, &declared) {
                    package.types.insert(t.identity.name.clone(), t);
                }
            }
            "var_declaration" => {
                for v in convert_spec_group(child, source, file_path, mod_path, pkg_path, false, &declared) {
                    package.vars.insert(v.identity.name.clone(), v);
                }
            }
            "const_declaration" => {
                for v in convert_spec_group(child, source, file_path, mod_path, pkg_path, true, &declared) {
                    package.vars.insert(v.identity.name.clone(), v);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn index_declared_names(node: Node, source: &str, declared: &mut Declared) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                declared.funcs.insert(name);
            }
        }
        "type_declaration" => {
            for spec in node.children(&mut node.walk()).filter(|n| n.kind() == "type_spec") {
                if let Some(name) = field_text(spec, "name", source) {
                    declared.types.insert(name);
                }
            }
        }
        "var_declaration" | "const_declaration" => {
            for spec in node.children(&mut node.walk()).filter(|n| n.kind().ends_with("_spec")) {
                for name_node in spec.children(&mut spec.walk()).filter(|n| n.kind() == "identifier") {
                    if let Ok(text) = name_node.utf8_text(source.as_bytes()) {
                        declared.vars.insert(text.to_string());
                    }
                }
            }
        }
        _ => {}
    }
}

fn field_text<'s>(node: Node, field: &str, source: &'s str) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(|s| s.to_string())
}

fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

fn convert_function(
    node: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    declared: &Declared,
    receiver: Option<(Identity, bool)>,
) -> Option<Function> {
    let name = field_text(node, "name", source)?;
    let content = node.utf8_text(source.as_bytes()).ok()?.to_string();
    let params_end = node
        .child_by_field_name("result")
        .map(|n| n.end_byte())
        .or_else(|| node.child_by_field_name("parameters").map(|n| n.end_byte()))
        .unwrap_or(node.end_byte());
    let signature = source.get(node.start_byte()..params_end).unwrap_or("").to_string();

    let (function_calls, method_calls, types, global_vars) = node
        .child_by_field_name("body")
        .map(|body| collect_body_deps(body, source, file_path, mod_path, pkg_path, declared))
        .unwrap_or_default();

    let identity = match &receiver {
        Some((receiver_identity, _)) => Identity::method(mod_path, pkg_path, &receiver_identity.name, &name),
        None => Identity::new(mod_path, pkg_path, name.clone()),
    };

    Some(Function {
        identity,
        file: file_path.to_string(),
        line: node.start_position().row as u32 + 1,
        start_offset: node.start_byte(),
        end_offset: node.end_byte(),
        exported: is_exported(&name),
        is_method: receiver.is_some(),
        is_interface_method: false,
        receiver: receiver.map(|(r#type, is_pointer)| Receiver { is_pointer, r#type }),
        signature,
        content,
        type_parameters: vec![],
        params: vec![],
        results: vec![],
        function_calls,
        method_calls,
        types,
        global_vars,
    })
}

fn convert_method(
    node: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    declared: &Declared,
) -> Option<(Function, String)> {
    let receiver_list = node.child_by_field_name("receiver")?;
    let receiver_param = receiver_list.children(&mut receiver_list.walk()).find(|n| n.kind() == "parameter_declaration")?;
    let receiver_type_node = receiver_param.child_by_field_name("type")?;
    let (receiver_type_name, is_pointer) = if receiver_type_node.kind() == "pointer_type" {
        (
            receiver_type_node
                .child_by_field_name("type")
                .or_else(|| receiver_type_node.named_child(0))
                .and_then(|n| n.utf8_text(source.as_bytes()).ok())
                .unwrap_or_default()
                .to_string(),
            true,
        )
    } else {
        (receiver_type_node.utf8_text(source.as_bytes()).ok().unwrap_or_default().to_string(), false)
    };

    let receiver_identity = Identity::new(mod_path, pkg_path, receiver_type_name.clone());
    let f = convert_function(node, source, file_path, mod_path, pkg_path, declared, Some((receiver_identity, is_pointer)))?;
    Some((f, receiver_type_name))
}

fn collect_body_deps(
    body: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    declared: &Declared,
) -> (Vec<Dependency>, Vec<Dependency>, Vec<Dependency>, Vec<Dependency>) {
    let mut function_calls = Vec::new();
    let mut method_calls = Vec::new();
    let mut types = Vec::new();
    let mut global_vars = Vec::new();

    walk_identifiers(body, &mut |node| {
        let Ok(text) = node.utf8_text(source.as_bytes()) else {
            return;
        };
        let dep = || {
            Dependency::new(
                Identity::new(mod_path, pkg_path, text.to_string()),
                FileLine::new(file_path, node.start_position().row as u32 + 1, node.start_byte(), node.end_byte()),
            )
        };
        let parent_kind = node.parent().map(|p| p.kind()).unwrap_or("");
        if parent_kind == "selector_expression" && node.parent().and_then(|p| p.child_by_field_name("field")) == Some(node) {
            insert_ordered(&mut method_calls, dep());
        } else if declared.funcs.contains(text) {
            insert_ordered(&mut function_calls, dep());
        } else if declared.types.contains(text) {
            insert_ordered(&mut types, dep());
        } else if declared.vars.contains(text) {
            insert_ordered(&mut global_vars, dep());
        }
    });

    (function_calls, method_calls, types, global_vars)
}

/// Depth-first walk calling `visit` on every `identifier`/`field_identifier`
/// leaf, skipping declaration-site names (parameters, `var`/`const` specs,
/// short variable declarations) so a local binding isn't mistaken for a
/// package-level reference.
fn walk_identifiers<'a>(node: Node<'a>, visit: &mut dyn FnMut(Node<'a>)) {
    if matches!(node.kind(), "identifier" | "field_identifier") {
        visit(node);
        return;
    }
    if matches!(node.kind(), "parameter_declaration" | "var_spec" | "const_spec") {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_identifiers(child, visit);
    }
}

fn convert_type_declaration(
    node: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    declared: &Declared,
) -> Vec<Type> {
    node.children(&mut node.walk())
        .filter(|n| n.kind() == "type_spec")
        .filter_map(|spec| convert_type_spec(spec, source, file_path, mod_path, pkg_path, declared))
        .collect()
}

fn convert_type_spec(
    spec: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    declared: &Declared,
) -> Option<Type> {
    let name = field_text(spec, "name", source)?;
    let underlying = spec.child_by_field_name("type")?;
    let content = spec.utf8_text(source.as_bytes()).ok()?.to_string();

    let kind = match underlying.kind() {
        "struct_type" => "struct",
        "interface_type" => "interface",
        _ => "typeAlias",
    };

    let mut sub_struct = Vec::new();
    let mut inline_struct = Vec::new();
    if underlying.kind() == "struct_type" {
        if let Some(fields) = underlying.child_by_field_name("body") {
            for field in fields.children(&mut fields.walk()).filter(|n| n.kind() == "field_declaration") {
                let Some(type_node) = field.child_by_field_name("type") else {
                    continue;
                };
                let Ok(type_text) = type_node.utf8_text(source.as_bytes()) else {
                    continue;
                };
                let type_name = type_text.trim_start_matches('*').to_string();
                if !declared.types.contains(&type_name) {
                    continue;
                }
                let dep = Dependency::new(
                    Identity::new(mod_path, pkg_path, type_name),
                    FileLine::new(file_path, type_node.start_position().row as u32 + 1, type_node.start_byte(), type_node.end_byte()),
                );
                if field.child_by_field_name("name").is_none() {
                    insert_ordered(&mut inline_struct, dep);
                } else {
                    insert_ordered(&mut sub_struct, dep);
                }
            }
        }
    }

    Some(Type {
        identity: Identity::new(mod_path, pkg_path, name.clone()),
        file: file_path.to_string(),
        line: spec.start_position().row as u32 + 1,
        start_offset: spec.start_byte(),
        end_offset: spec.end_byte(),
        exported: is_exported(&name),
        type_kind: kind.to_string(),
        content,
        methods: Default::default(),
        sub_struct,
        inline_struct,
        implements: vec![],
    })
}

/// One `var (...)`/`const (...)` block is exactly the syntactic group spec
/// §8 scenario 5 describes; every spec inside the same block cross-links to
/// its siblings, parenthesized single-spec blocks included (a lone `var (A =
/// 1)` has no peers so its `Groups` ends up empty, same as an unparenthesized
/// `var A = 1`).
fn convert_spec_group(
    node: Node,
    source: &str,
    file_path: &str,
    mod_path: &str,
    pkg_path: &str,
    is_const: bool,
    declared: &Declared,
) -> Vec<Var> {
    let specs: Vec<Node> = node.children(&mut node.walk()).filter(|n| n.kind().ends_with("_spec")).collect();
    let mut names = Vec::new();
    for spec in &specs {
        for name_node in spec.children(&mut spec.walk()).filter(|n| n.kind() == "identifier") {
            if let Ok(text) = name_node.utf8_text(source.as_bytes()) {
                names.push(text.to_string());
            }
        }
    }

    let mut out = Vec::new();
    for spec in &specs {
        for name_node in spec.children(&mut spec.walk()).filter(|n| n.kind() == "identifier") {
            let Ok(name) = name_node.utf8_text(source.as_bytes()) else {
                continue;
            };
            let r#type = spec
                .child_by_field_name("type")
                .and_then(|t| t.utf8_text(source.as_bytes()).ok())
                .map(|t| Identity::new(mod_path, pkg_path, t.to_string()));

            let mut dependencies = Vec::new();
            if let Some(value) = spec.child_by_field_name("value") {
                walk_identifiers(value, &mut |ident| {
                    let Ok(text) = ident.utf8_text(source.as_bytes()) else {
                        return;
                    };
                    if text == name || !(declared.funcs.contains(text) || declared.vars.contains(text) || declared.types.contains(text)) {
                        return;
                    }
                    insert_ordered(
                        &mut dependencies,
                        Dependency::new(
                            Identity::new(mod_path, pkg_path, text.to_string()),
                            FileLine::new(file_path, ident.start_position().row as u32 + 1, ident.start_byte(), ident.end_byte()),
                        ),
                    );
                });
            }

            let groups: Vec<Identity> = names
                .iter()
                .filter(|n| n.as_str() != name)
                .map(|n| Identity::new(mod_path, pkg_path, n.clone()))
                .collect();

            out.push(Var {
                identity: Identity::new(mod_path, pkg_path, name.to_string()),
                file: file_path.to_string(),
                line: spec.start_position().row as u32 + 1,
                start_offset: spec.start_byte(),
                end_offset: spec.end_byte(),
                is_exported: is_exported(name),
                is_const,
                is_pointer: false,
                r#type,
                content: spec.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
                dependencies,
                groups,
            });
        }
    }
    let _ = declared;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_links_var_a_and_function_f() {
        // package p; var A int = 1; func F() int { return A }
        let mut package = Package::new("p");
        collect_file("package p\n\nvar A int = 1\n\nfunc F() int {\n\treturn A\n}\n", "a.go", "p", "p", &mut package).unwrap();

        let a = package.vars.get("A").expect("A collected");
        assert_eq!(a.r#type, Some(Identity::new("p", "p", "int")));

        let f = package.functions.get("F").expect("F collected");
        assert_eq!(f.signature, "func F() int");
        assert_eq!(f.global_vars.len(), 1);
        assert_eq!(f.global_vars[0].identity, Identity::new("p", "p", "A"));
    }

    #[test]
    fn const_group_cross_links_peers() {
        let mut package = Package::new("p");
        collect_file("package p\n\nconst (\n\tA = 1\n\tB = 2\n\tC = 3\n)\n", "a.go", "p", "p", &mut package).unwrap();

        for name in ["A", "B", "C"] {
            let peers: Vec<&str> = package.vars[name].groups.iter().map(|id| id.name.as_str()).collect();
            assert_eq!(peers.len(), 2);
            assert!(!peers.contains(&name));
        }
    }

    #[test]
    fn method_receiver_links_back_to_struct() {
        let mut package = Package::new("p");
        collect_file(
            "package p\n\ntype T struct {\n\tN int\n}\n\nfunc (t *T) M() int {\n\treturn t.N\n}\n",
            "a.go",
            "p",
            "p",
            &mut package,
        )
        .unwrap();
        crate::linking::link_methods_in_package(&mut package);

        let ty = package.types.get("T").expect("T collected");
        assert!(ty.methods.contains_key("T.M"));
        let m = package.functions.get("T.M").expect("method collected");
        assert!(m.is_method);
        assert_eq!(m.receiver.as_ref().unwrap().r#type, Identity::new("p", "p", "T"));
        assert!(m.receiver.as_ref().unwrap().is_pointer);
    }
}
