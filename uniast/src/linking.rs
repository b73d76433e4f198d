//! Same-package method-to-type linking (spec §4.4 step 7: "Populate Methods
//! from same-package impl blocks ... after all symbols are known"). Shared
//! between the LSP collector (`crate::collector`) and the LSP-free native
//! extractors (`crate::treesitter::go`), since only the former drives a
//! `Collector` — Go/TypeScript populate `Package` directly and need the same
//! second pass without a `Repository` to walk.

use crate::model::{Identity, Package};

/// Links every method in `package` whose `Receiver` names a type in the same
/// package back onto that type's `methods` map.
pub fn link_methods_in_package(package: &mut Package) {
    let receivers: Vec<(String, Identity)> = package
        .functions
        .values()
        .filter_map(|f| f.receiver.as_ref().map(|r| (f.identity.name.clone(), r.r#type.clone())))
        .collect();
    for (method_full_name, receiver_identity) in receivers {
        if let Some(type_name) = method_full_name.split('.').next() {
            if let Some(ty) = package.types.get_mut(type_name) {
                let method_identity =
                    Identity::new(&receiver_identity.mod_path, &receiver_identity.pkg_path, method_full_name.clone());
                ty.methods.insert(method_full_name, method_identity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileLine, Function, Receiver, Type};

    fn func(name: &str, receiver: &str) -> Function {
        Function {
            identity: Identity::new("m", "p", name),
            file: "a".into(),
            line: 1,
            start_offset: 0,
            end_offset: 1,
            exported: true,
            is_method: true,
            is_interface_method: false,
            receiver: Some(Receiver {
                is_pointer: false,
                r#type: Identity::new("m", "p", receiver),
            }),
            signature: String::new(),
            content: String::new(),
            type_parameters: vec![],
            params: vec![],
            results: vec![],
            function_calls: vec![],
            method_calls: vec![],
            types: vec![],
            global_vars: vec![],
        }
    }

    fn ty(name: &str) -> Type {
        Type {
            identity: Identity::new("m", "p", name),
            file: "a".into(),
            line: 1,
            start_offset: 0,
            end_offset: 1,
            exported: true,
            type_kind: "struct".into(),
            content: String::new(),
            methods: Default::default(),
            sub_struct: vec![],
            inline_struct: vec![],
            implements: vec![],
        }
    }

    #[test]
    fn links_method_back_onto_its_receiver_type() {
        let _ = FileLine::new("a", 1, 0, 1);
        let mut package = Package::new("p");
        package.types.insert("T".into(), ty("T"));
        package.functions.insert("T.M".into(), func("T.M", "T"));

        link_methods_in_package(&mut package);

        assert!(package.types["T"].methods.contains_key("T.M"));
    }
}
