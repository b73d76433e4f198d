//! Graph node and relation records. Populated by the [`crate::graph`] builder
//! pass, never constructed by hand during collection.

use serde::{Deserialize, Serialize};

use super::identity::Identity;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Func,
    Type,
    Var,
    /// The target of a dependency whose defining entity was never itself
    /// collected (e.g. an external symbol past `ReferCodeDepth`). Spec §4.5:
    /// "leave as UNKNOWN and skip Repo back-linking."
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationKind {
    Dependency,
    Reference,
    Implement,
    Inherit,
    Group,
}

/// One edge, from the owning `Node`'s point of view. `line` is 0-based,
/// relative to the **owning node's** start line (not absolute in-file).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub identity: Identity,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub identity: Identity,
    pub r#type: NodeType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Relation>,
}

impl Node {
    pub fn new(identity: Identity, r#type: NodeType) -> Self {
        Self {
            identity,
            r#type,
            dependencies: Vec::new(),
            references: Vec::new(),
            implements: Vec::new(),
            inherits: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn relations_mut(&mut self, kind: RelationKind) -> &mut Vec<Relation> {
        match kind {
            RelationKind::Dependency => &mut self.dependencies,
            RelationKind::Reference => &mut self.references,
            RelationKind::Implement => &mut self.implements,
            RelationKind::Inherit => &mut self.inherits,
            RelationKind::Group => &mut self.groups,
        }
    }

    /// Inserts a relation, deduplicated by target `Identity` within the same
    /// list (spec §4.5).
    pub fn add_relation(&mut self, kind: RelationKind, identity: Identity, line: u32) {
        let list = self.relations_mut(kind);
        if list.iter().any(|r| r.identity == identity) {
            return;
        }
        list.push(Relation { kind, identity, line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_relation_dedupes_by_target_identity() {
        let mut node = Node::new(Identity::new("m", "p", "F"), NodeType::Func);
        let target = Identity::new("m", "p", "A");
        node.add_relation(RelationKind::Dependency, target.clone(), 3);
        node.add_relation(RelationKind::Dependency, target, 7);
        assert_eq!(node.dependencies.len(), 1);
        assert_eq!(node.dependencies[0].line, 3);
    }
}
