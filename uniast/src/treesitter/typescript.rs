//! OXC-based native-AST extraction for TypeScript/JavaScript (spec §6:
//! "Go/TS bypass LSP with language-native AST libraries"). TS has no tree-
//! sitter grammar in this crate's dependency set — OXC is the pack's native
//! TS/JS parser, so this module plays the same role `crate::treesitter::go`
//! plays for Go: the sole source of Function/Type/Var entities, no LSP
//! client anywhere in the loop.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, ClassElement, Declaration, ExportDefaultDeclarationKind, Expression, Program, PropertyKey,
    Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::error::{CollectError, Result};
use crate::model::{insert_ordered, Dependency, FileLine, Function, Identity, Package, Receiver, Type, Var};

/// Parses `source` and inserts every top-level Function/Type/Var it finds
/// into `package`, namespaced under `(mod_path, pkg_path)`.
pub fn collect_file(source: &str, file_path: &str, mod_path: &str, pkg_path: &str, package: &mut Package) -> Result<()> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(file_path).unwrap_or_default();
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked {
        return Err(CollectError::ToolchainMissing(format!(
            "OXC failed to parse {file_path}: {:?}",
            parsed.errors
        )));
    }

    let lines = LineIndex::new(source);
    let ctx = FileCtx {
        source,
        file_path,
        mod_path,
        pkg_path,
        lines: &lines,
    };
    walk_program(&parsed.program, &ctx, package);
    Ok(())
}

struct LineIndex {
    newline_offsets: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        Self {
            newline_offsets: source.bytes().enumerate().filter(|(_, b)| *b == b'\n').map(|(i, _)| i).collect(),
        }
    }

    fn line(&self, offset: usize) -> u32 {
        self.newline_offsets.partition_point(|&n| n < offset) as u32 + 1
    }
}

struct FileCtx<'a> {
    source: &'a str,
    file_path: &'a str,
    mod_path: &'a str,
    pkg_path: &'a str,
    lines: &'a LineIndex,
}

impl FileCtx<'_> {
    fn text(&self, span: Span) -> String {
        self.source.get(span.start as usize..span.end as usize).unwrap_or("").to_string()
    }

    fn file_line(&self, span: Span) -> FileLine {
        FileLine::new(self.file_path, self.lines.line(span.start as usize), span.start as usize, span.end as usize)
    }

    fn identity(&self, name: impl Into<String>) -> Identity {
        Identity::new(self.mod_path, self.pkg_path, name.into())
    }
}

fn walk_program(program: &Program, ctx: &FileCtx, package: &mut Package) {
    for stmt in &program.body {
        walk_statement(stmt, ctx, package, None);
    }
}

fn walk_statement(stmt: &Statement, ctx: &FileCtx, package: &mut Package, receiver: Option<&Identity>) {
    match stmt {
        Statement::FunctionDeclaration(f) => insert_function(f, ctx, package, receiver),
        Statement::ClassDeclaration(c) => insert_class(c, ctx, package),
        Statement::VariableDeclaration(v) => insert_vars(v, ctx, package),
        Statement::ExportNamedDeclaration(e) => {
            if let Some(decl) = &e.declaration {
                walk_declaration(decl, ctx, package);
            }
        }
        Statement::ExportDefaultDeclaration(e) => {
            if let ExportDefaultDeclarationKind::FunctionDeclaration(f) = &e.declaration {
                insert_function(f, ctx, package, receiver);
            } else if let ExportDefaultDeclarationKind::ClassDeclaration(c) = &e.declaration {
                insert_class(c, ctx, package);
            }
        }
        _ => {}
    }
}

fn walk_declaration(decl: &Declaration, ctx: &FileCtx, package: &mut Package) {
    match decl {
        Declaration::FunctionDeclaration(f) => insert_function(f, ctx, package, None),
        Declaration::ClassDeclaration(c) => insert_class(c, ctx, package),
        Declaration::VariableDeclaration(v) => insert_vars(v, ctx, package),
        _ => {}
    }
}

fn insert_function(f: &oxc_ast::ast::Function, ctx: &FileCtx, package: &mut Package, receiver: Option<&Identity>) {
    let Some(binding) = &f.id else { return };
    let name = binding.name.as_str();
    let span = f.span;
    let params_end = f.params.span.end.max(f.this_param.as_ref().map(|p| p.span.end).unwrap_or(0));
    let signature = ctx.text(Span::new(span.start, params_end.max(span.start)));

    let identity = match receiver {
        Some(r) => Identity::method(ctx.mod_path, ctx.pkg_path, &r.name, name),
        None => ctx.identity(name),
    };

    let function = Function {
        identity: identity.clone(),
        file: ctx.file_path.to_string(),
        line: ctx.lines.line(span.start as usize),
        start_offset: span.start as usize,
        end_offset: span.end as usize,
        exported: true,
        is_method: receiver.is_some(),
        is_interface_method: false,
        receiver: receiver.map(|r| Receiver {
            is_pointer: false,
            r#type: r.clone(),
        }),
        signature,
        content: ctx.text(span),
        type_parameters: vec![],
        params: vec![],
        results: vec![],
        function_calls: vec![],
        method_calls: vec![],
        types: vec![],
        global_vars: vec![],
    };
    package.functions.insert(identity.name.clone(), function);
}

fn insert_class(c: &oxc_ast::ast::Class, ctx: &FileCtx, package: &mut Package) {
    let Some(binding) = &c.id else { return };
    let name = binding.name.as_str().to_string();
    let identity = ctx.identity(name.clone());

    let implements: Vec<Identity> = c
        .super_class
        .as_ref()
        .and_then(super_class_name)
        .into_iter()
        .chain(c.implements.iter().map(|i| i.expression.name.as_str().to_string()))
        .map(|n| ctx.identity(n))
        .collect();

    let mut sub_struct = Vec::new();
    for element in &c.body.body {
        if let ClassElement::PropertyDefinition(prop) = element {
            if let Some(type_name) = prop.type_annotation.as_ref().and_then(annotation_name) {
                if let Some(key_name) = property_key_name(&prop.key) {
                    insert_ordered(
                        &mut sub_struct,
                        Dependency::new(ctx.identity(type_name), ctx.file_line(prop.key.span())),
                    );
                    let _ = key_name;
                }
            }
        }
    }

    package.types.insert(
        identity.name.clone(),
        Type {
            identity: identity.clone(),
            file: ctx.file_path.to_string(),
            line: ctx.lines.line(c.span.start as usize),
            start_offset: c.span.start as usize,
            end_offset: c.span.end as usize,
            exported: true,
            type_kind: "class".to_string(),
            content: ctx.text(c.span),
            methods: Default::default(),
            sub_struct,
            inline_struct: vec![],
            implements,
        },
    );

    for element in &c.body.body {
        if let ClassElement::MethodDefinition(method) = element {
            let method_name = property_key_name(&method.key).unwrap_or_default();
            let span = method.value.span;
            let receiver_ident = ctx.identity(name.clone());
            let method_identity = Identity::method(ctx.mod_path, ctx.pkg_path, &name, &method_name);
            let func = Function {
                identity: method_identity.clone(),
                file: ctx.file_path.to_string(),
                line: ctx.lines.line(span.start as usize),
                start_offset: span.start as usize,
                end_offset: span.end as usize,
                exported: true,
                is_method: true,
                is_interface_method: false,
                receiver: Some(Receiver {
                    is_pointer: false,
                    r#type: receiver_ident,
                }),
                signature: ctx.text(Span::new(span.start, method.value.params.span.end)),
                content: ctx.text(span),
                type_parameters: vec![],
                params: vec![],
                results: vec![],
                function_calls: vec![],
                method_calls: vec![],
                types: vec![],
                global_vars: vec![],
            };
            package.functions.insert(method_identity.name.clone(), func);
            if let Some(ty) = package.types.get_mut(&name) {
                ty.methods.insert(method_identity.name.clone(), method_identity);
            }
        }
    }
}

fn super_class_name(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Identifier(id) => Some(id.name.as_str().to_string()),
        _ => None,
    }
}

fn annotation_name(annotation: &oxc_ast::ast::TSTypeAnnotation) -> Option<String> {
    match &annotation.type_annotation {
        oxc_ast::ast::TSType::TSTypeReference(r) => match &r.type_name {
            oxc_ast::ast::TSTypeName::IdentifierReference(id) => Some(id.name.as_str().to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn property_key_name(key: &PropertyKey) -> Option<String> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str().to_string()),
        _ => None,
    }
}

fn insert_vars(decl: &oxc_ast::ast::VariableDeclaration, ctx: &FileCtx, package: &mut Package) {
    let names: Vec<String> = decl
        .declarations
        .iter()
        .filter_map(|d| match &d.id.kind {
            BindingPatternKind::BindingIdentifier(id) => Some(id.name.as_str().to_string()),
            _ => None,
        })
        .collect();

    for declarator in &decl.declarations {
        let BindingPatternKind::BindingIdentifier(binding) = &declarator.id.kind else {
            continue;
        };
        let name = binding.name.as_str().to_string();
        let r#type = declarator.id.type_annotation.as_ref().and_then(annotation_name).map(|t| ctx.identity(t));
        let groups: Vec<Identity> = names.iter().filter(|n| *n != &name).map(|n| ctx.identity(n.clone())).collect();

        package.vars.insert(
            name.clone(),
            Var {
                identity: ctx.identity(name),
                file: ctx.file_path.to_string(),
                line: ctx.lines.line(declarator.span.start as usize),
                start_offset: declarator.span.start as usize,
                end_offset: declarator.span.end as usize,
                is_exported: true,
                is_const: decl.kind.is_const(),
                is_pointer: false,
                r#type,
                content: ctx.text(declarator.span),
                dependencies: vec![],
                groups,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_top_level_function_and_typed_var() {
        let mut package = Package::new("app");
        collect_file(
            "export function greet(name: string): string {\n  return name;\n}\n\nconst count: number = 1;\n",
            "a.ts",
            "app",
            "app",
            &mut package,
        )
        .unwrap();

        assert!(package.functions.contains_key("greet"));
        let count = package.vars.get("count").expect("count collected");
        assert_eq!(count.r#type, Some(Identity::new("app", "app", "number")));
    }

    #[test]
    fn class_methods_link_back_to_the_class() {
        let mut package = Package::new("app");
        collect_file(
            "class Greeter {\n  prefix: string;\n  greet(name: string): string {\n    return this.prefix + name;\n  }\n}\n",
            "a.ts",
            "app",
            "app",
            &mut package,
        )
        .unwrap();

        let ty = package.types.get("Greeter").expect("class collected");
        assert!(ty.methods.contains_key("Greeter.greet"));
        let method = package.functions.get("Greeter.greet").expect("method collected");
        assert!(method.is_method);
    }
}
