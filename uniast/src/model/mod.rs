//! The UniAST data model (spec §3): entities are created once during the
//! collect pass and never mutated afterward except by the graph-build pass,
//! which only appends to `Node` relation lists.

mod containers;
mod entities;
mod graph;
mod identity;

pub use containers::{File, Import, Module, Package, Repository};
pub use entities::{insert_ordered, Dependency, FileLine, Function, Receiver, Type, Var};
pub use graph::{Node, NodeType, Relation, RelationKind};
pub use identity::Identity;
