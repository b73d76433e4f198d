//! The collector (spec §4.4): the orchestration engine driving module ->
//! file -> symbol iteration, with definition-following as the inner loop.

pub mod definitions;
pub mod external;

use std::path::Path;
use std::sync::Arc;

use lsp_types::{DocumentSymbol, SymbolKind};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::langspec::LanguageSpec;
use crate::lsp::LspClient;
use crate::model::{
    insert_ordered, Dependency, FileLine, Function, Identity, Module, Package, Receiver, Repository, Type, Var,
};
use crate::options::ParseOptions;
use crate::pos::{FileUri, Range};

use definitions::VisitedSet;
use external::RecursionBudget;

/// Running counters for recoverable failures (spec §7: "recoverable
/// per-file/per-symbol errors are logged ... and counted on a CollectStats
/// accumulator").
#[derive(Default, Debug, Clone, Copy)]
pub struct CollectStats {
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub symbols_collected: u64,
    pub definition_follows: u64,
    pub rpc_failures: u64,
}

/// Runs the full module -> file -> symbol scan against an already-booted
/// `LspClient`, populating `repo`. Cancellation-aware: checked between files
/// so a long-running scan can be aborted promptly.
pub struct Collector<'a> {
    client: Arc<LspClient>,
    lang: &'a dyn LanguageSpec,
    options: &'a ParseOptions,
    cancel: tokio_util::sync::CancellationToken,
    stats: CollectStats,
    /// Absolute module root directories passed to `scan` — used to tell a
    /// definition-follow target inside the repository apart from one that
    /// landed in an external crate/package checkout (spec §4.4: "prefer the
    /// one inside a repository-internal module").
    internal_roots: Vec<std::path::PathBuf>,
    /// Dependency targets resolved outside `internal_roots`, queued for the
    /// external-symbol loader (spec §4.4/§9). Deduplicated and drained once,
    /// after the main scan, rather than inline per-token to keep file
    /// scanning free of a second network round-trip per external reference.
    pending_external: Vec<(Identity, crate::pos::Location)>,
    /// `(Type identity, Interface identity)` pairs collected from Rust's
    /// `impl Trait for Type` decomposition, drained into `Type.implements`
    /// once every type in the package is known.
    pending_implements: Vec<(Identity, Identity)>,
}

impl<'a> Collector<'a> {
    pub fn new(
        client: Arc<LspClient>,
        lang: &'a dyn LanguageSpec,
        options: &'a ParseOptions,
        cancel: tokio_util::sync::CancellationToken,
    ) -> Self {
        Self {
            client,
            lang,
            options,
            cancel,
            stats: CollectStats::default(),
            internal_roots: Vec::new(),
            pending_external: Vec::new(),
            pending_implements: Vec::new(),
        }
    }

    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    #[instrument(skip_all, fields(modules = modules.len()))]
    pub async fn scan(&mut self, repo: &mut Repository, modules: &[(String, std::path::PathBuf)]) -> Result<()> {
        self.internal_roots = modules
            .iter()
            .map(|(_, dir)| dir.canonicalize().unwrap_or_else(|_| dir.clone()))
            .collect();

        for (name, dir) in modules {
            if self.cancel.is_cancelled() {
                return Err(crate::error::CollectError::Cancelled("scan".into()));
            }
            self.scan_module(repo, name, dir).await?;
        }
        if self.options.load_external_symbol {
            self.load_pending_external(repo).await;
        }
        self.link_impl_methods(repo);
        self.link_implements(repo);
        Ok(())
    }

    /// Drains `pending_implements` (Rust `impl Trait for Type`, Java
    /// `extends`/`implements`) into each `Type.implements` list, satisfying
    /// spec §8 scenario 2 and making `graph::apply_type_edges`'s Implement
    /// edges non-dead.
    fn link_implements(&mut self, repo: &mut Repository) {
        for (type_identity, iface_identity) in self.pending_implements.drain(..) {
            let module = repo.module_mut(&type_identity.mod_path);
            let package = module.package_mut(&type_identity.pkg_path);
            if let Some(ty) = package.types.get_mut(&type_identity.name) {
                if !ty.implements.contains(&iface_identity) {
                    ty.implements.push(iface_identity);
                }
            }
        }
    }

    /// Spec §4.4/§9: when `--load-external-symbols` is set, build a minimal
    /// entity record for every dependency target that resolved outside
    /// `internal_roots`, bounded by `ParseOptions::refer_code_depth` hops.
    async fn load_pending_external(&mut self, repo: &mut Repository) {
        let pending = std::mem::take(&mut self.pending_external);
        let mut seen = std::collections::HashSet::new();
        let mut seen_packages = std::collections::HashSet::new();
        let budget = RecursionBudget::new(self.options.refer_code_depth);

        for (identity, target) in pending {
            if !seen.insert(identity.full()) {
                continue;
            }

            if self.options.load_by_packages {
                // One file load per (mod_path, pkg_path), not per symbol: a
                // second dependency into an already-loaded package is a
                // free hit against `seen_packages`.
                if !seen_packages.insert((identity.mod_path.clone(), identity.pkg_path.clone())) {
                    continue;
                }
                match external::load_external_package(
                    &self.client,
                    self.lang,
                    &identity.mod_path,
                    &identity.pkg_path,
                    &target,
                    budget,
                )
                .await
                {
                    Ok(functions) => {
                        let module = repo.module_mut(&identity.mod_path);
                        if module.dir.is_empty() && module.language.is_empty() {
                            module.language = self.lang.language().as_str().to_string();
                        }
                        let package = module.package_mut(&identity.pkg_path);
                        for function in functions {
                            package.functions.insert(function.identity.name.clone(), function);
                        }
                    }
                    Err(e) => {
                        warn!("external package load failed for {}: {e}", identity.full());
                        self.stats.rpc_failures += 1;
                    }
                }
                continue;
            }

            match external::load_external_function(&self.client, self.lang, identity.clone(), &target, budget).await {
                Ok(Some(function)) => {
                    let module = repo.module_mut(&identity.mod_path);
                    if module.dir.is_empty() && module.language.is_empty() {
                        module.language = self.lang.language().as_str().to_string();
                    }
                    let package = module.package_mut(&identity.pkg_path);
                    package.functions.insert(function.identity.name.clone(), function);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("external symbol load failed for {}: {e}", identity.full());
                    self.stats.rpc_failures += 1;
                }
            }
        }
    }

    #[instrument(skip(self, repo), fields(module = %name))]
    async fn scan_module(&mut self, repo: &mut Repository, name: &str, dir: &Path) -> Result<()> {
        repo.module_mut(name).dir = dir.to_string_lossy().to_string();
        repo.module_mut(name).language = self.lang.language().as_str().to_string();

        let files: Vec<std::path::PathBuf> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| !self.lang.should_skip(p))
            .filter(|p| !(self.options.not_need_test && self.lang.is_test_file(p)))
            .filter(|p| {
                let rel = p.strip_prefix(dir).unwrap_or(p).to_string_lossy();
                !self.options.should_skip_path(&rel)
            })
            .collect();

        // Bounded fan-out: `num_cpus` concurrent file scans (spec §5).
        let permits = Arc::new(Semaphore::new(num_cpus::get().max(1)));
        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            let permit = permits.clone();
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.ok();
                scan_file_entities(client, path).await
            }));
        }

        for handle in handles {
            if self.cancel.is_cancelled() {
                return Err(crate::error::CollectError::Cancelled("scan_module".into()));
            }
            match handle.await {
                Ok(Ok(Some(scanned))) => {
                    self.stats.files_scanned += 1;
                    self.ingest_scanned_file(repo, name, scanned).await;
                }
                Ok(Ok(None)) => self.stats.files_skipped += 1,
                Ok(Err(e)) => {
                    warn!("file scan failed: {e}");
                    self.stats.rpc_failures += 1;
                }
                Err(join_err) => warn!("file scan task panicked: {join_err}"),
            }
        }
        Ok(())
    }

    async fn ingest_scanned_file(&mut self, repo: &mut Repository, module_name: &str, scanned: ScannedFile) {
        self.stats.symbols_collected += scanned.symbols.len() as u64;
        let (mod_path, pkg_path) = self.lang.name_space(&scanned.path);

        let mut visited = VisitedSet::new();
        let module = repo.module_mut(module_name);
        let package = module.package_mut(&pkg_path);
        package.is_main = scanned.symbols.iter().any(|s| self.lang.is_main_function(s));

        let internal_roots = self.internal_roots.clone();
        let is_internal = move |uri: &FileUri| {
            let path = uri.to_path();
            internal_roots.iter().any(|root| path.starts_with(root))
        };
        let is_internal: &dyn Fn(&FileUri) -> bool = &is_internal;

        // impl blocks aren't entities themselves (spec §4.4 step 4): their
        // methods are re-entered as independent function symbols with
        // `Receiver` set to the impl's target type. The same re-entry queue
        // also carries class/struct-nested methods (Python/Java/C++-style),
        // which `hierarchicalDocumentSymbolSupport: true` nests under the
        // owning type's `children` rather than reporting as impl blocks.
        let mut method_symbols: Vec<(DocumentSymbol, Identity)> = Vec::new();
        let supertypes_by_name = self.lang.supertypes(&scanned.text);

        // Java's jdtls response tends to flatten field declarations and skip
        // anonymous classes; `merge_cst_symbols` splices the tree-sitter CST
        // walk's view of the same file in wherever jdtls's tree is missing a
        // child node. A no-op for every other language.
        let symbols = self.lang.merge_cst_symbols(&scanned.text, scanned.symbols.clone());

        for sym in &symbols {
            if self.lang.has_impl_symbol() {
                let tokens = match self
                    .client
                    .semantic_tokens(&scanned.uri, sym.range.into(), &scanned.text, &scanned.line_table)
                    .await
                {
                    Ok(t) => t,
                    Err(_) => Arc::new(Vec::new()),
                };
                if let Some(decomposition) = self.lang.impl_symbol(sym, &tokens) {
                    let receiver_name = tokens
                        .get(decomposition.receiver_type_token_idx)
                        .map(|t| t.text.clone())
                        .unwrap_or_else(|| sym.name.clone());
                    let receiver_identity = Identity::new(&mod_path, &pkg_path, receiver_name);
                    if let Some(iface_idx) = decomposition.iface_token_idx {
                        if let Some(iface_name) = tokens.get(iface_idx).map(|t| t.text.clone()) {
                            let iface_identity = Identity::new(&mod_path, &pkg_path, iface_name);
                            self.pending_implements.push((receiver_identity.clone(), iface_identity));
                        }
                    }
                    if let Some(children) = &sym.children {
                        for child in children {
                            method_symbols.push((child.clone(), receiver_identity.clone()));
                        }
                    }
                    continue;
                }
            }
            if !self.lang.is_entity_symbol(sym) {
                continue;
            }
            let tokens = match self
                .client
                .semantic_tokens(&scanned.uri, sym.range.into(), &scanned.text, &scanned.line_table)
                .await
            {
                Ok(t) => t,
                Err(e) => {
                    warn!("semanticTokens failed for {}: {e}", sym.name);
                    self.stats.rpc_failures += 1;
                    continue;
                }
            };

            match sym.kind {
                SymbolKind::FUNCTION | SymbolKind::METHOD => {
                    if let Some(f) = self
                        .collect_function(sym, &tokens, &scanned, &mod_path, &pkg_path, is_internal, &mut visited)
                        .await
                    {
                        package.functions.insert(f.identity.name.clone(), f);
                    }
                }
                SymbolKind::STRUCT | SymbolKind::CLASS | SymbolKind::INTERFACE | SymbolKind::ENUM => {
                    let nested_methods: Vec<&DocumentSymbol> = sym
                        .children
                        .iter()
                        .flatten()
                        .filter(|c| matches!(c.kind, SymbolKind::FUNCTION | SymbolKind::METHOD))
                        .collect();
                    let exclude_ranges: Vec<crate::pos::Range> = nested_methods.iter().map(|c| c.range.into()).collect();
                    if let Some(t) = self
                        .collect_type(
                            sym,
                            &tokens,
                            &scanned,
                            &mod_path,
                            &pkg_path,
                            is_internal,
                            &mut visited,
                            &exclude_ranges,
                            supertypes_by_name.get(&sym.name),
                        )
                        .await
                    {
                        package.types.insert(t.identity.name.clone(), t);
                    }
                    if !nested_methods.is_empty() {
                        let receiver_identity = Identity::new(&mod_path, &pkg_path, sym.name.clone());
                        for child in nested_methods {
                            method_symbols.push((child.clone(), receiver_identity.clone()));
                        }
                    }
                }
                SymbolKind::VARIABLE | SymbolKind::CONSTANT | SymbolKind::FIELD => {
                    if let Some(v) = self
                        .collect_var(sym, &tokens, &scanned, &mod_path, &pkg_path, is_internal, &mut visited)
                        .await
                    {
                        package.vars.insert(v.identity.name.clone(), v);
                    }
                }
                _ => {}
            }
        }

        link_var_groups(&scanned.symbols, &mod_path, &pkg_path, package);

        for (method_sym, receiver_identity) in method_symbols {
            let tokens = match self
                .client
                .semantic_tokens(&scanned.uri, method_sym.range.into(), &scanned.text, &scanned.line_table)
                .await
            {
                Ok(t) => t,
                Err(e) => {
                    warn!("semanticTokens failed for {}: {e}", method_sym.name);
                    self.stats.rpc_failures += 1;
                    continue;
                }
            };
            if let Some(mut f) = self
                .collect_function(&method_sym, &tokens, &scanned, &mod_path, &pkg_path, is_internal, &mut visited)
                .await
            {
                f.identity = Identity::method(&mod_path, &pkg_path, &receiver_identity.name, &f.identity.name);
                f.is_method = true;
                f.receiver = Some(Receiver {
                    is_pointer: false,
                    r#type: receiver_identity.clone(),
                });
                package.functions.insert(f.identity.name.clone(), f);
            }
        }

        module.files.insert(
            scanned.path.to_string_lossy().to_string(),
            crate::model::File {
                path: scanned.path.to_string_lossy().to_string(),
                package: pkg_path,
                imports: self.lang.file_imports(scanned.text.as_bytes()),
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect_function(
        &mut self,
        sym: &DocumentSymbol,
        tokens: &[crate::lsp::Token],
        scanned: &ScannedFile,
        mod_path: &str,
        pkg_path: &str,
        is_internal: &dyn Fn(&FileUri) -> bool,
        visited: &mut VisitedSet,
    ) -> Option<Function> {
        let sym_range: Range = sym.range.into();
        let start_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.start);
        let end_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.end);
        let content_start = if self.options.no_need_comment {
            doc_adjusted_start(self.lang, tokens, scanned, start_offset, end_offset)
        } else {
            start_offset
        };
        let content = scanned.text.get(content_start..end_offset)?.to_string();

        let ranges = self.lang.function_symbol(sym, tokens);
        let sig_end_idx = ranges
            .output_token_idxs
            .last()
            .or(ranges.input_param_token_idxs.last())
            .copied();
        let signature = sig_end_idx
            .and_then(|idx| tokens.get(idx))
            .map(|t| {
                let end = scanned.line_table.byte_offset(&scanned.text, t.range.end);
                scanned.text.get(content_start..end.max(content_start)).unwrap_or("").to_string()
            })
            .unwrap_or_default();

        let mut function_calls = Vec::new();
        let mut method_calls = Vec::new();
        let mut types = Vec::new();
        let mut global_vars = Vec::new();
        let mut params = Vec::new();
        let mut results = Vec::new();
        let mut type_parameters = Vec::new();

        for (i, tok) in tokens.iter().enumerate() {
            if !self.lang.is_entity_token(tok) || self.lang.is_std_token(tok) || self.lang.is_doc_token(tok) {
                continue;
            }
            let Some(dep) = self
                .resolve_token_dependency(tok, scanned, mod_path, pkg_path, is_internal, visited)
                .await
            else {
                continue;
            };

            if ranges.type_param_token_idxs.contains(&i) {
                insert_ordered(&mut type_parameters, dep);
            } else if ranges.input_param_token_idxs.contains(&i) {
                insert_ordered(&mut params, dep);
            } else if ranges.output_token_idxs.contains(&i) {
                insert_ordered(&mut results, dep);
            } else {
                match self.lang.token_kind(tok) {
                    SymbolKind::METHOD => insert_ordered(&mut method_calls, dep),
                    SymbolKind::FUNCTION => insert_ordered(&mut function_calls, dep),
                    SymbolKind::STRUCT | SymbolKind::CLASS | SymbolKind::INTERFACE | SymbolKind::ENUM => {
                        insert_ordered(&mut types, dep)
                    }
                    SymbolKind::VARIABLE | SymbolKind::CONSTANT => insert_ordered(&mut global_vars, dep),
                    _ => {}
                }
            }
        }

        Some(Function {
            identity: Identity::new(mod_path, pkg_path, sym.name.clone()),
            file: scanned.path.to_string_lossy().to_string(),
            line: sym_range.start.line + 1,
            start_offset: content_start,
            end_offset,
            exported: self.lang.is_public_symbol(sym),
            // A real `Receiver` (type name, pointer-ness) can only be known
            // once this symbol is re-entered from its owning type's
            // `children` (see `ingest_scanned_file`'s `method_symbols`
            // queue) — that pass overwrites `receiver`/`is_method` below.
            // Top-level functions never reach here with a receiver token.
            is_method: ranges.receiver_token_idx.is_some(),
            is_interface_method: false,
            receiver: None,
            signature,
            content,
            type_parameters,
            params,
            results,
            function_calls,
            method_calls,
            types,
            global_vars,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn collect_type(
        &mut self,
        sym: &DocumentSymbol,
        tokens: &[crate::lsp::Token],
        scanned: &ScannedFile,
        mod_path: &str,
        pkg_path: &str,
        is_internal: &dyn Fn(&FileUri) -> bool,
        visited: &mut VisitedSet,
        exclude_ranges: &[crate::pos::Range],
        supertypes: Option<&Vec<String>>,
    ) -> Option<Type> {
        let sym_range: Range = sym.range.into();
        let start_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.start);
        let end_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.end);
        let content_start = if self.options.no_need_comment {
            doc_adjusted_start(self.lang, tokens, scanned, start_offset, end_offset)
        } else {
            start_offset
        };
        let content = scanned.text.get(content_start..end_offset)?.to_string();

        // Tokens inside a nested method's own range belong to that method's
        // body, not to the type's field list — without this exclusion a
        // method body referencing another type gets mis-attributed into
        // `sub_struct`.
        let mut sub_struct = Vec::new();
        for tok in tokens
            .iter()
            .filter(|t| self.lang.is_entity_token(t) && !self.lang.is_std_token(t))
            .filter(|t| !exclude_ranges.iter().any(|r| r.includes(&t.range)))
        {
            if let Some(dep) = self
                .resolve_token_dependency(tok, scanned, mod_path, pkg_path, is_internal, visited)
                .await
            {
                insert_ordered(&mut sub_struct, dep);
            }
        }

        let mut implements = Vec::new();
        if let Some(supertype_names) = supertypes {
            for name in supertype_names {
                let resolved = tokens
                    .iter()
                    .find(|t| &t.text == name && self.lang.is_entity_token(t));
                let identity = match resolved {
                    Some(tok) => self
                        .resolve_token_dependency(tok, scanned, mod_path, pkg_path, is_internal, visited)
                        .await
                        .map(|dep| dep.identity)
                        .unwrap_or_else(|| Identity::new(mod_path, pkg_path, name.clone())),
                    None => Identity::new(mod_path, pkg_path, name.clone()),
                };
                if !implements.contains(&identity) {
                    implements.push(identity);
                }
            }
        }

        Some(Type {
            identity: Identity::new(mod_path, pkg_path, sym.name.clone()),
            file: scanned.path.to_string_lossy().to_string(),
            line: sym_range.start.line + 1,
            start_offset: content_start,
            end_offset,
            exported: self.lang.is_public_symbol(sym),
            type_kind: symbol_kind_name(sym.kind).to_string(),
            content,
            methods: Default::default(),
            sub_struct,
            inline_struct: vec![],
            implements,
        })
    }

    async fn collect_var(
        &mut self,
        sym: &DocumentSymbol,
        tokens: &[crate::lsp::Token],
        scanned: &ScannedFile,
        mod_path: &str,
        pkg_path: &str,
        is_internal: &dyn Fn(&FileUri) -> bool,
        visited: &mut VisitedSet,
    ) -> Option<Var> {
        let sym_range: Range = sym.range.into();
        let start_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.start);
        let end_offset = scanned.line_table.byte_offset(&scanned.text, sym_range.end);
        let content_start = if self.options.no_need_comment {
            doc_adjusted_start(self.lang, tokens, scanned, start_offset, end_offset)
        } else {
            start_offset
        };
        let content = scanned.text.get(content_start..end_offset)?.to_string();

        let mut dependencies = Vec::new();
        for tok in tokens.iter().filter(|t| self.lang.is_entity_token(t) && !self.lang.is_std_token(t)) {
            if let Some(dep) = self
                .resolve_token_dependency(tok, scanned, mod_path, pkg_path, is_internal, visited)
                .await
            {
                insert_ordered(&mut dependencies, dep);
            }
        }

        let declare_idx = self.lang.declare_token_of_symbol(sym, tokens);
        let r#type = match declare_idx.and_then(|idx| tokens.get(idx)) {
            Some(tok) => self.resolve_var_type(tok, scanned, is_internal, visited).await,
            None => None,
        };

        Some(Var {
            identity: Identity::new(mod_path, pkg_path, sym.name.clone()),
            file: scanned.path.to_string_lossy().to_string(),
            line: sym_range.start.line + 1,
            start_offset: content_start,
            end_offset,
            is_exported: self.lang.is_public_symbol(sym),
            is_const: sym.kind == SymbolKind::CONSTANT,
            is_pointer: false,
            r#type,
            content,
            dependencies,
            groups: vec![],
        })
    }

    async fn resolve_token_dependency(
        &mut self,
        tok: &crate::lsp::Token,
        scanned: &ScannedFile,
        mod_path: &str,
        pkg_path: &str,
        is_internal: &dyn Fn(&FileUri) -> bool,
        visited: &mut VisitedSet,
    ) -> Option<Dependency> {
        if let Some(name) = self.lang.get_unloaded_symbol(tok, &crate::pos::Location::new(scanned.uri.clone(), tok.range)) {
            let identity = Identity::new(mod_path, pkg_path, name);
            let line = scanned.line_to_one_based(tok.range.start);
            let start = scanned.line_table.byte_offset(&scanned.text, tok.range.start);
            let end = scanned.line_table.byte_offset(&scanned.text, tok.range.end);
            return Some(Dependency::new(identity, FileLine::new(scanned.path_str(), line, start, end)));
        }

        self.stats.definition_follows += 1;
        let result = definitions::follow(&self.client, self.lang, &scanned.uri, tok.range.start, is_internal, visited)
            .await
            .ok()
            .flatten()?;

        if self.options.load_external_symbol && !is_internal(&result.target.uri) {
            self.pending_external.push((result.identity.clone(), result.target.clone()));
        }

        let line = scanned.line_to_one_based(tok.range.start);
        let start = scanned.line_table.byte_offset(&scanned.text, tok.range.start);
        let end = scanned.line_table.byte_offset(&scanned.text, tok.range.end);
        Some(Dependency::new(
            result.identity,
            FileLine::new(scanned.path_str(), line, start, end),
        ))
    }

    /// Resolves `Var.r#type` via `textDocument/typeDefinition` at the var's
    /// own declarator token (spec §4.2's required RPC surface, §8 scenario
    /// 1's `Var A{Type=Identity{Name:"int"}}`). `None` for primitives and
    /// anything the server can't resolve — untyped is a valid answer here,
    /// not a failure.
    async fn resolve_var_type(
        &mut self,
        declare_tok: &crate::lsp::Token,
        scanned: &ScannedFile,
        is_internal: &dyn Fn(&FileUri) -> bool,
        visited: &mut VisitedSet,
    ) -> Option<Identity> {
        let result = definitions::follow_type(
            &self.client,
            self.lang,
            &scanned.uri,
            declare_tok.range.start,
            is_internal,
            visited,
        )
        .await
        .ok()
        .flatten()?;
        Some(result.identity)
    }

    /// Second pass (spec §4.4 step 7: "Populate Methods from same-package
    /// impl blocks collected in pass 2 after all symbols are known"): links
    /// every method whose `Receiver` names a type in the same package back
    /// onto that type's `methods` map.
    fn link_impl_methods(&self, repo: &mut Repository) {
        for module in repo.modules.values_mut() {
            for package in module.packages.values_mut() {
                crate::linking::link_methods_in_package(package);
            }
        }
    }
}

/// Spec §4.4's "no-comment" mode (`--no-comment` / `ParseOptions::no_need_comment`):
/// finds the byte offset just past the symbol's leading doc-comment run, so
/// `Content`/`Signature` can be sliced to exclude it. A doc run is zero or
/// more `is_doc_token` tokens separated from each other and from the first
/// real token only by whitespace; the search stops at the first non-doc,
/// non-whitespace token.
fn doc_adjusted_start(
    lang: &dyn LanguageSpec,
    tokens: &[crate::lsp::Token],
    scanned: &ScannedFile,
    start_offset: usize,
    end_offset: usize,
) -> usize {
    let mut adjusted = start_offset;
    for tok in tokens {
        if !lang.is_doc_token(tok) {
            continue;
        }
        let tok_start = scanned.line_table.byte_offset(&scanned.text, tok.range.start);
        let tok_end = scanned.line_table.byte_offset(&scanned.text, tok.range.end);
        if tok_start < adjusted || tok_start >= end_offset {
            continue;
        }
        let between = scanned.text.get(adjusted..tok_start).unwrap_or("");
        if !between.trim().is_empty() {
            break;
        }
        adjusted = tok_end;
    }
    let tail = scanned.text.get(adjusted..end_offset).unwrap_or("");
    adjusted + (tail.len() - tail.trim_start().len())
}

/// Spec §9 "Var groups": a syntactic declaration group like Go's `const (A=1;
/// B=2; C=3)` has no dedicated LSP concept — the server just emits sibling
/// `DocumentSymbol`s. We treat a contiguous run of top-level CONSTANT/VARIABLE
/// siblings as one group and cross-link every member's `Var.groups` to its
/// peers, skipping singleton runs (an ungrouped top-level `const A = 1` is
/// not a group of one).
fn link_var_groups(symbols: &[DocumentSymbol], mod_path: &str, pkg_path: &str, package: &mut Package) {
    let mut run: Vec<&str> = Vec::new();

    let mut flush = |run: &mut Vec<&str>, package: &mut Package| {
        if run.len() > 1 {
            let identities: Vec<Identity> = run
                .iter()
                .map(|name| Identity::new(mod_path, pkg_path, (*name).to_string()))
                .collect();
            for name in run.iter() {
                if let Some(var) = package.vars.get_mut(*name) {
                    var.groups = identities.iter().filter(|id| id.name != *name).cloned().collect();
                }
            }
        }
        run.clear();
    };

    for sym in symbols {
        if matches!(sym.kind, SymbolKind::VARIABLE | SymbolKind::CONSTANT) {
            run.push(sym.name.as_str());
        } else {
            flush(&mut run, package);
        }
    }
    flush(&mut run, package);
}

fn symbol_kind_name(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::STRUCT => "struct",
        SymbolKind::CLASS => "class",
        SymbolKind::INTERFACE => "interface",
        SymbolKind::ENUM => "enum",
        _ => "type",
    }
}

/// One file's worth of open-and-query results, produced concurrently by the
/// bounded worker pool before any entity construction happens.
struct ScannedFile {
    path: std::path::PathBuf,
    uri: FileUri,
    text: Arc<String>,
    line_table: Arc<crate::pos::LineTable>,
    symbols: Arc<Vec<DocumentSymbol>>,
}

impl ScannedFile {
    fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn line_to_one_based(&self, pos: crate::pos::Position) -> u32 {
        pos.line + 1
    }
}

#[instrument(skip(client), fields(path = %path.display()))]
async fn scan_file_entities(client: Arc<LspClient>, path: std::path::PathBuf) -> Result<Option<ScannedFile>> {
    let (uri, text, line_table) = client.open_file(&path).await?;
    let symbols = client.document_symbol(&uri).await?;
    if symbols.is_empty() {
        debug!("no symbols");
        return Ok(None);
    }
    info!(symbols = symbols.len(), "scanned");
    Ok(Some(ScannedFile {
        path,
        uri,
        text,
        line_table,
        symbols,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_kind_name_maps_known_kinds() {
        assert_eq!(symbol_kind_name(SymbolKind::STRUCT), "struct");
        assert_eq!(symbol_kind_name(SymbolKind::FUNCTION), "type");
    }

    fn const_symbol(name: &str) -> DocumentSymbol {
        #[allow(deprecated)]
        DocumentSymbol {
            name: name.to_string(),
            detail: None,
            kind: SymbolKind::CONSTANT,
            tags: None,
            deprecated: None,
            range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            selection_range: lsp_types::Range::new(lsp_types::Position::new(0, 0), lsp_types::Position::new(0, 1)),
            children: None,
        }
    }

    fn var_stub(name: &str) -> Var {
        Var {
            identity: Identity::new("p", "p", name),
            file: "a.go".into(),
            line: 1,
            start_offset: 0,
            end_offset: 1,
            is_exported: true,
            is_const: true,
            is_pointer: false,
            r#type: None,
            content: format!("{name} = 1"),
            dependencies: vec![],
            groups: vec![],
        }
    }

    #[test]
    fn link_var_groups_cross_links_contiguous_const_run() {
        // const (A=1; B=2; C=3) — spec §8 scenario 5.
        let symbols = vec![const_symbol("A"), const_symbol("B"), const_symbol("C")];
        let mut package = Package::new("p");
        for name in ["A", "B", "C"] {
            package.vars.insert(name.to_string(), var_stub(name));
        }

        link_var_groups(&symbols, "p", "p", &mut package);

        for name in ["A", "B", "C"] {
            let peers: Vec<&str> = package.vars[name].groups.iter().map(|id| id.name.as_str()).collect();
            assert_eq!(peers.len(), 2);
            assert!(!peers.contains(&name));
        }
    }

    #[test]
    fn link_var_groups_leaves_singleton_ungrouped() {
        let symbols = vec![const_symbol("A")];
        let mut package = Package::new("p");
        package.vars.insert("A".to_string(), var_stub("A"));

        link_var_groups(&symbols, "p", "p", &mut package);

        assert!(package.vars["A"].groups.is_empty());
    }
}
