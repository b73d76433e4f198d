//! Function, Type, Var, and the `Dependency` use-site record that links them.

use serde::{Deserialize, Serialize};

use super::identity::Identity;

/// The token site in the *referring* entity's text — never the definition
/// site. Preserves LLM-addressable provenance: "this call to `foo` is at
/// file F, line L, bytes [s,e)".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLine {
    pub file: String,
    /// 1-based.
    pub line: u32,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl FileLine {
    pub fn new(file: impl Into<String>, line: u32, start_offset: usize, end_offset: usize) -> Self {
        debug_assert!(line >= 1, "FileLine.line must be 1-based, got {line}");
        debug_assert!(start_offset < end_offset, "FileLine offsets must be non-empty");
        Self {
            file: file.into(),
            line,
            start_offset,
            end_offset,
        }
    }
}

/// A use-site pointing at a definition: `Identity` of the thing used, plus
/// where it was used (not where it's defined).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(flatten)]
    pub identity: Identity,
    pub file_line: FileLine,
}

impl Dependency {
    pub fn new(identity: Identity, file_line: FileLine) -> Self {
        Self { identity, file_line }
    }
}

/// Appends `dep` to `list` unless an entry with the same `Identity` is
/// already present. Spec §9: "use an `insertOrdered` helper rather than a
/// set — lists are small and ordering is observable by consumers."
pub fn insert_ordered(list: &mut Vec<Dependency>, dep: Dependency) {
    if !list.iter().any(|existing| existing.identity == dep.identity) {
        list.push(dep);
    }
}

/// The receiver of a method: Rust `impl Trait for Type`, Go `func (r *Type)
/// Method()`, etc.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub is_pointer: bool,
    pub r#type: Identity,
}

/// A top-level (or impl-block) function or method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    #[serde(flatten)]
    pub identity: Identity,
    pub file: String,
    /// 1-based.
    pub line: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    pub exported: bool,
    pub is_method: bool,
    pub is_interface_method: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub receiver: Option<Receiver>,
    /// Source-text slice: name + params + results, no body. Always a prefix
    /// of `content`. Empty for macro-expanded functions with no signature
    /// tokens (spec §8 boundary behavior).
    pub signature: String,
    /// Full text: signature + body, or the interface stub.
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<Dependency>,
    /// First-appearance order, deduplicated by Identity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub function_calls: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub method_calls: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_vars: Vec<Dependency>,
}

impl Function {
    /// Content minus signature, i.e. everything after the signature prefix.
    /// Empty when `signature` is empty (macro-expanded function, spec §8).
    pub fn body_text(&self) -> &str {
        self.content
            .strip_prefix(self.signature.as_str())
            .unwrap_or(self.content.as_str())
    }
}

/// A struct/interface/enum/class/typedef. `type_kind` is free-form per
/// language (`"struct"`, `"interface"`, `"enum"`, `"typedef"`, `"class"`, …).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type {
    #[serde(flatten)]
    pub identity: Identity,
    pub file: String,
    pub line: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    pub exported: bool,
    pub type_kind: String,
    pub content: String,
    /// Excludes methods inherited via inline embedding.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub methods: std::collections::BTreeMap<String, Identity>,
    /// Non-inline field types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_struct: Vec<Dependency>,
    /// Embedded/inherited field types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_struct: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<Identity>,
}

/// A top-level or grouped (`const (...)`) variable/constant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
    #[serde(flatten)]
    pub identity: Identity,
    pub file: String,
    pub line: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    pub is_exported: bool,
    pub is_const: bool,
    pub is_pointer: bool,
    /// `None` for primitives (`int`, `string`, …).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub r#type: Option<Identity>,
    pub content: String,
    /// Symbols referenced in the initializer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Peers co-declared in the same syntactic group (e.g. `const (A=1; B=2)`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Identity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str) -> Dependency {
        Dependency::new(
            Identity::new("m", "p", name),
            FileLine::new("a.rs", 1, 0, 1),
        )
    }

    #[test]
    fn insert_ordered_dedupes_by_identity_keeps_first_appearance() {
        let mut list = Vec::new();
        insert_ordered(&mut list, dep("A"));
        insert_ordered(&mut list, dep("B"));
        insert_ordered(&mut list, dep("A"));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].identity.name, "A");
        assert_eq!(list[1].identity.name, "B");
    }

    #[test]
    fn function_body_text_strips_signature_prefix() {
        let f = Function {
            identity: Identity::new("m", "p", "F"),
            file: "a.go".into(),
            line: 1,
            start_offset: 0,
            end_offset: 30,
            exported: true,
            is_method: false,
            is_interface_method: false,
            receiver: None,
            signature: "func F() int".into(),
            content: "func F() int { return 1 }".into(),
            type_parameters: vec![],
            params: vec![],
            results: vec![],
            function_calls: vec![],
            method_calls: vec![],
            types: vec![],
            global_vars: vec![],
        };
        assert_eq!(f.body_text(), " { return 1 }");
    }
}
