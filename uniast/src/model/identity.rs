//! The [`Identity`] triple and its canonical string forms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(ModPath, PkgPath, Name)` — unique across the whole universe of entities
/// a parse run can see, repo-internal or external.
///
/// - `mod_path`: a build unit. For repo-internal entities this is the bare
///   module name; for externals it is suffixed `@version` when known
///   (`"serde@1.0.219"`).
/// - `pkg_path`: a namespace, computed by `LanguageSpec::name_space` —
///   package / crate-module / Java package / TS directory-package.
/// - `name`: a package-unique symbol name. Methods use `Type.Method`;
///   trait-qualified methods may use `Trait<Type>.Method`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub mod_path: String,
    pub pkg_path: String,
    pub name: String,
}

impl Identity {
    pub fn new(mod_path: impl Into<String>, pkg_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mod_path: mod_path.into(),
            pkg_path: pkg_path.into(),
            name: name.into(),
        }
    }

    /// `"ModPath?PkgPath#Name"` — the unique key used in the graph and as
    /// the wire-format map key.
    pub fn full(&self) -> String {
        format!("{}?{}#{}", self.mod_path, self.pkg_path, self.name)
    }

    /// `"PkgPath#Name"` — human-facing display form.
    pub fn short(&self) -> String {
        format!("{}#{}", self.pkg_path, self.name)
    }

    /// A method identity qualified by its receiver type: `Type.Method`.
    pub fn method(mod_path: impl Into<String>, pkg_path: impl Into<String>, type_name: &str, method_name: &str) -> Self {
        Self::new(mod_path, pkg_path, format!("{type_name}.{method_name}"))
    }

    /// A trait-qualified method identity: `Trait<Type>.Method`.
    pub fn trait_method(
        mod_path: impl Into<String>,
        pkg_path: impl Into<String>,
        trait_name: &str,
        type_name: &str,
        method_name: &str,
    ) -> Self {
        Self::new(
            mod_path,
            pkg_path,
            format!("{trait_name}<{type_name}>.{method_name}"),
        )
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_and_short_forms() {
        let id = Identity::new("p", "p", "A");
        assert_eq!(id.full(), "p?p#A");
        assert_eq!(id.short(), "p#A");
    }

    #[test]
    fn method_and_trait_method_naming() {
        let m = Identity::method("myint", "myint", "MyInt", "add");
        assert_eq!(m.name, "MyInt.add");
        let tm = Identity::trait_method("myint", "myint", "MyTrait", "MyInt", "add");
        assert_eq!(tm.name, "MyTrait<MyInt>.add");
    }
}
