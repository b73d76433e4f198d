//! Graph builder: the post-pass that turns every entity's dependency lists
//! into a materialized `Node` graph (spec §4.5).
//!
//! This never runs during collection — entities are finished objects by the
//! time `build_graph` sees them. It can be re-run from scratch at any time
//! because it only reads `Module::packages` and writes `Repository::graph`.

use std::collections::BTreeMap;

use crate::model::{
    Dependency, Function, Identity, Node, NodeType, RelationKind, Repository, Type, Var,
};

/// Rebuilds `repo.graph` from every internal module's entities, discarding
/// whatever was there before.
pub fn build_graph(repo: &mut Repository) {
    repo.graph.clear();

    // Pass 1: create a bare Node for every internal entity so target lookups
    // in pass 2 never have to guess a NodeType for something we haven't
    // visited yet.
    for module in repo.modules.values() {
        if module.is_external() {
            continue;
        }
        for package in module.packages.values() {
            for f in package.functions.values() {
                repo.graph
                    .entry(f.identity.full())
                    .or_insert_with(|| Node::new(f.identity.clone(), NodeType::Func));
            }
            for t in package.types.values() {
                repo.graph
                    .entry(t.identity.full())
                    .or_insert_with(|| Node::new(t.identity.clone(), NodeType::Type));
            }
            for v in package.vars.values() {
                repo.graph
                    .entry(v.identity.full())
                    .or_insert_with(|| Node::new(v.identity.clone(), NodeType::Var));
            }
        }
    }

    // Index external entities too (as targets only — they never get their
    // own Dependencies/Implements/etc. edges as a *source*).
    let type_index = index_types(repo);

    // Pass 2: walk every internal entity's dependency slots and materialize
    // edges + reflected references.
    for module in repo.modules.values() {
        if module.is_external() {
            continue;
        }
        for package in module.packages.values() {
            for f in package.functions.values() {
                apply_function_edges(repo, f, &type_index);
            }
            for t in package.types.values() {
                apply_type_edges(repo, t, &type_index);
            }
            for v in package.vars.values() {
                apply_var_edges(repo, v, &type_index);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum TargetKind {
    Func,
    Type,
    Var,
}

/// Full-identity -> NodeType index built once, used to resolve the NodeType
/// of a dependency target the first time it's seen (spec §4.5: "If target
/// Node had no Type yet, assign it by consulting Functions/Types/Vars").
fn index_types(repo: &Repository) -> BTreeMap<String, TargetKind> {
    let mut idx = BTreeMap::new();
    for module in repo.modules.values() {
        for package in module.packages.values() {
            for f in package.functions.values() {
                idx.insert(f.identity.full(), TargetKind::Func);
            }
            for t in package.types.values() {
                idx.insert(t.identity.full(), TargetKind::Type);
            }
            for v in package.vars.values() {
                idx.insert(v.identity.full(), TargetKind::Var);
            }
        }
    }
    idx
}

fn line_offset(entity_line: u32, dep_line: u32) -> u32 {
    dep_line.saturating_sub(entity_line)
}

/// Records `kind` from `source` to `dep.identity`, plus the reflected
/// DEPENDENCY reference on the target's node. If the target has never been
/// seen, its Node is created with whatever NodeType `type_index` knows about
/// it, or left `Unknown` (and not further linked) per spec §4.5/§7.
fn record_edge(
    repo: &mut Repository,
    source: &Identity,
    source_line: u32,
    kind: RelationKind,
    dep: &Dependency,
    type_index: &BTreeMap<String, TargetKind>,
) {
    let offset = line_offset(source_line, dep.file_line.line);

    if let Some(node) = repo.graph.get_mut(&source.full()) {
        node.add_relation(kind, dep.identity.clone(), offset);
    }

    let target_key = dep.identity.full();
    let target = repo.graph.entry(target_key.clone()).or_insert_with(|| {
        let node_type = match type_index.get(&target_key) {
            Some(TargetKind::Func) => NodeType::Func,
            Some(TargetKind::Type) => NodeType::Type,
            Some(TargetKind::Var) => NodeType::Var,
            None => NodeType::Unknown,
        };
        Node::new(dep.identity.clone(), node_type)
    });
    // References entries are always tagged Dependency (spec §4.5): they
    // record "something depends on me", regardless of the originating
    // relation kind recorded on the source's node above. Unknown-typed
    // targets still receive the relation; they're just never upgraded to a
    // concrete NodeType or back-linked to a Repo.
    target.add_relation(RelationKind::Dependency, source.clone(), offset);
}

fn apply_function_edges(repo: &mut Repository, f: &Function, type_index: &BTreeMap<String, TargetKind>) {
    let id = f.identity.clone();
    let line = f.line;

    let slots: Vec<&Dependency> = f
        .type_parameters
        .iter()
        .chain(f.params.iter())
        .chain(f.results.iter())
        .chain(f.function_calls.iter())
        .chain(f.method_calls.iter())
        .chain(f.types.iter())
        .chain(f.global_vars.iter())
        .collect();
    for dep in slots {
        record_edge(repo, &id, line, RelationKind::Dependency, dep, type_index);
    }

    if let Some(receiver) = &f.receiver {
        let dep = Dependency::new(
            receiver.r#type.clone(),
            crate::model::FileLine::new(f.file.clone(), f.line, f.start_offset, f.start_offset + 1),
        );
        record_edge(repo, &id, line, RelationKind::Dependency, &dep, type_index);
    }
}

fn apply_type_edges(repo: &mut Repository, t: &Type, type_index: &BTreeMap<String, TargetKind>) {
    let id = t.identity.clone();
    let line = t.line;

    for dep in &t.sub_struct {
        record_edge(repo, &id, line, RelationKind::Dependency, dep, type_index);
    }
    for dep in &t.inline_struct {
        record_edge(repo, &id, line, RelationKind::Inherit, dep, type_index);
    }
    for iface in &t.implements {
        let dep = Dependency::new(
            iface.clone(),
            crate::model::FileLine::new(t.file.clone(), t.line, t.start_offset, t.start_offset + 1),
        );
        record_edge(repo, &id, line, RelationKind::Implement, &dep, type_index);
    }
}

fn apply_var_edges(repo: &mut Repository, v: &Var, type_index: &BTreeMap<String, TargetKind>) {
    let id = v.identity.clone();
    let line = v.line;

    for dep in &v.dependencies {
        record_edge(repo, &id, line, RelationKind::Dependency, dep, type_index);
    }
    for peer in &v.groups {
        let dep = Dependency::new(
            peer.clone(),
            crate::model::FileLine::new(v.file.clone(), v.line, v.start_offset, v.start_offset + 1),
        );
        record_edge(repo, &id, line, RelationKind::Group, &dep, type_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileLine, Module, Package};

    fn var(mod_path: &str, pkg: &str, name: &str, line: u32, deps: Vec<Dependency>) -> Var {
        Var {
            identity: Identity::new(mod_path, pkg, name),
            file: "a.go".into(),
            line,
            start_offset: 0,
            end_offset: 1,
            is_exported: true,
            is_const: false,
            is_pointer: false,
            r#type: None,
            content: format!("var {name} int"),
            dependencies: deps,
            groups: vec![],
        }
    }

    fn func(mod_path: &str, pkg: &str, name: &str, line: u32, global_vars: Vec<Dependency>) -> Function {
        Function {
            identity: Identity::new(mod_path, pkg, name),
            file: "a.go".into(),
            line,
            start_offset: 10,
            end_offset: 50,
            exported: true,
            is_method: false,
            is_interface_method: false,
            receiver: None,
            signature: format!("func {name}() int"),
            content: format!("func {name}() int {{ return A }}"),
            type_parameters: vec![],
            params: vec![],
            results: vec![],
            function_calls: vec![],
            method_calls: vec![],
            types: vec![],
            global_vars,
        }
    }

    #[test]
    fn scenario_1_go_var_and_function_link_both_ways() {
        // package p; var A int = 1; func F() int { return A }
        let mut repo = Repository::new("/repo");
        let mut module = Module::internal("p", "go", ".");
        let mut package = Package::new("p");
        package.vars.insert("A".into(), var("p", "p", "A", 1, vec![]));
        let a_dep = Dependency::new(
            Identity::new("p", "p", "A"),
            FileLine::new("a.go", 1, 40, 41),
        );
        package
            .functions
            .insert("F".into(), func("p", "p", "F", 1, vec![a_dep]));
        module.packages.insert("p".into(), package);
        repo.modules.insert("p".into(), module);

        build_graph(&mut repo);

        let f_node = repo.graph.get("p?p#F").expect("F node");
        assert_eq!(f_node.dependencies.len(), 1);
        assert_eq!(f_node.dependencies[0].identity, Identity::new("p", "p", "A"));

        let a_node = repo.graph.get("p?p#A").expect("A node");
        assert!(
            a_node
                .references
                .iter()
                .any(|r| r.identity == Identity::new("p", "p", "F"))
        );
    }

    #[test]
    fn unresolved_target_gets_unknown_node_but_is_still_linked() {
        let mut repo = Repository::new("/repo");
        let mut module = Module::internal("p", "go", ".");
        let mut package = Package::new("p");
        let missing_dep = Dependency::new(
            Identity::new("ext", "ext", "Missing"),
            FileLine::new("a.go", 1, 40, 41),
        );
        package
            .functions
            .insert("F".into(), func("p", "p", "F", 1, vec![missing_dep]));
        module.packages.insert("p".into(), package);
        repo.modules.insert("p".into(), module);

        build_graph(&mut repo);

        let target = repo.graph.get("ext?ext#Missing").expect("unknown node created");
        assert_eq!(target.r#type, NodeType::Unknown);
        assert!(!target.references.is_empty());
    }
}
