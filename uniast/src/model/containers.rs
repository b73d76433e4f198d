//! Module / Package / File containers and the top-level Repository.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{Function, Type, Var};
use super::graph::Node;

/// An import statement as the source language writes it — syntax preserved,
/// not normalized into some canonical path form (spec §3, scenario 4).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub alias: Option<String>,
    pub path: String,
}

/// A single source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Repo-relative path.
    pub path: String,
    /// PkgPath of the declarations in this file.
    pub package: String,
    /// Ordered list — import syntax preserved as written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
}

/// A namespace: package / crate-module / Java package / TS directory-package.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub pkg_path: String,
    pub is_main: bool,
    pub is_test: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, Function>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, Type>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, Var>,
}

impl Package {
    pub fn new(pkg_path: impl Into<String>) -> Self {
        Self {
            pkg_path: pkg_path.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.types.is_empty() && self.vars.is_empty()
    }
}

/// A build unit: a repo-internal module, or a third-party/stdlib module.
///
/// `dir == ""` is the load-bearing invariant used everywhere: it means this
/// module is external and was never the subject of `BuildGraph` edges
/// (though it may be their target).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Path relative to repo root; empty means external.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, Package>,
    /// Short dependency name -> ModPath, as declared in the manifest.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, File>,
}

impl Module {
    pub fn internal(name: impl Into<String>, language: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn external(name: impl Into<String>, language: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            version: version.into(),
            dir: String::new(),
            ..Default::default()
        }
    }

    pub fn is_external(&self) -> bool {
        self.dir.is_empty()
    }

    pub fn package_mut(&mut self, pkg_path: &str) -> &mut Package {
        self.packages
            .entry(pkg_path.to_string())
            .or_insert_with(|| Package::new(pkg_path))
    }
}

/// The top-level UniAST container: every internal and (optionally) external
/// module, plus the derived dependency graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Repository {
    /// Opaque repo label, typically the absolute scan path.
    pub identity: String,
    pub modules: BTreeMap<String, Module>,
    pub graph: BTreeMap<String, Node>,
}

impl Repository {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            modules: BTreeMap::new(),
            graph: BTreeMap::new(),
        }
    }

    pub fn module_mut(&mut self, mod_path: &str) -> &mut Module {
        self.modules
            .entry(mod_path.to_string())
            .or_insert_with(Module::default)
    }

    /// Looks a function/type/var up by its full identity string, searching
    /// every module's packages. O(modules * packages); fine for the sizes
    /// this crate targets (spec Non-goals exclude huge monorepos).
    pub fn find_function(&self, full: &str) -> Option<&Function> {
        self.modules.values().find_map(|m| {
            m.packages
                .values()
                .find_map(|p| p.functions.values().find(|f| f.identity.full() == full))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_dir_empty_iff_external() {
        let internal = Module::internal("app", "rust", "src");
        let external = Module::external("serde", "rust", "1.0.219");
        assert!(!internal.is_external());
        assert!(external.is_external());
    }
}
