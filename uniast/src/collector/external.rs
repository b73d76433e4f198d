//! External symbol loading (spec §4.4 "External symbol handling", §9
//! "ReferCodeDepth-bounded external symbol expansion").
//!
//! When a dependency target lives in a module whose `Dir == ""` (external),
//! the collector lazily opens the external file to build a minimal entity
//! record instead of skipping it outright — but only up to `refer_code_depth`
//! hops from a repository-internal entity, so a single external reference
//! doesn't pull in that dependency's entire transitive graph.

use crate::langspec::LanguageSpec;
use crate::lsp::LspClient;
use crate::model::{Function, Identity};
use crate::pos::Location;

/// Tracks how many external hops have been taken so far along one
/// definition-follow chain. `0` means "at a repository-internal entity";
/// each external hop increments it until it exceeds `max_depth`.
#[derive(Clone, Copy)]
pub struct RecursionBudget {
    depth: u32,
    max_depth: u32,
}

impl RecursionBudget {
    pub fn new(max_depth: u32) -> Self {
        Self { depth: 0, max_depth }
    }

    pub fn exhausted(&self) -> bool {
        self.depth > self.max_depth
    }

    pub fn descend(&self) -> Self {
        Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }
}

/// `ParseOptions::load_by_packages`: instead of materializing only the one
/// symbol a dependency edge pointed at, eagerly pulls in every public
/// top-level symbol of `target`'s file as a minimal external `Function`
/// record. Trades a larger external surface for fewer follow-up round-trips
/// when a caller is about to reference several symbols from the same
/// external file (spec §6 names this flag; no upstream behavior to mirror —
/// this crate's own choice, recorded in DESIGN.md).
pub async fn load_external_package(
    client: &LspClient,
    lang: &dyn LanguageSpec,
    mod_path: &str,
    pkg_path: &str,
    target: &Location,
    budget: RecursionBudget,
) -> crate::error::Result<Vec<Function>> {
    if budget.exhausted() {
        return Ok(Vec::new());
    }

    let path = target.uri.to_path();
    let (_, text, _) = match client.open_file(&path).await {
        Ok(opened) => opened,
        Err(_) => return Ok(Vec::new()),
    };

    let symbols = client.document_symbol(&target.uri).await?;
    let table = crate::pos::LineTable::new(&text);

    let mut functions = Vec::new();
    for sym in symbols.iter().filter(|s| lang.is_public_symbol(s)) {
        let sym_range: crate::pos::Range = sym.range.into();
        let s = table.byte_offset(&text, sym_range.start);
        let e = table.byte_offset(&text, sym_range.end);
        let Some(content) = text.get(s..e) else { continue };
        let signature = content.lines().next().unwrap_or_default().to_string();

        functions.push(Function {
            identity: Identity::new(mod_path, pkg_path, sym.name.clone()),
            file: path.to_string_lossy().to_string(),
            line: sym_range.start.line + 1,
            start_offset: s,
            end_offset: e,
            exported: true,
            is_method: false,
            is_interface_method: false,
            receiver: None,
            signature,
            content: content.to_string(),
            type_parameters: vec![],
            params: vec![],
            results: vec![],
            function_calls: vec![],
            method_calls: vec![],
            types: vec![],
            global_vars: vec![],
        });
    }
    Ok(functions)
}

/// Builds a minimal external `Function` record for `target`: name, a
/// best-effort signature (first line of the symbol's text), and partial
/// content. Returns `None` if the budget is exhausted or the symbol can't be
/// read back out of the file (binary, deleted, permissions).
pub async fn load_external_function(
    client: &LspClient,
    lang: &dyn LanguageSpec,
    identity: Identity,
    target: &Location,
    budget: RecursionBudget,
) -> crate::error::Result<Option<Function>> {
    if budget.exhausted() {
        return Ok(None);
    }

    let path = target.uri.to_path();
    let (text, _table) = match client.open_file(&path).await {
        Ok((_, text, table)) => (text, table),
        Err(_) => return Ok(None),
    };

    let symbols = client.document_symbol(&target.uri).await?;
    let Some(sym) = symbols
        .iter()
        .find(|s| crate::pos::Range::from(s.selection_range).includes(&target.range))
    else {
        return Ok(None);
    };

    let sym_range: crate::pos::Range = sym.range.into();

    let full_range_text = {
        let table = crate::pos::LineTable::new(&text);
        let s = table.byte_offset(&text, sym_range.start);
        let e = table.byte_offset(&text, sym_range.end);
        text.get(s..e).unwrap_or_default().to_string()
    };
    let signature = full_range_text.lines().next().unwrap_or_default().to_string();

    let _ = lang; // namespace already folded into `identity` by the caller

    Ok(Some(Function {
        identity,
        file: path.to_string_lossy().to_string(),
        line: sym_range.start.line + 1,
        start_offset: 0,
        end_offset: full_range_text.len(),
        exported: true,
        is_method: false,
        is_interface_method: false,
        receiver: None,
        signature,
        content: full_range_text,
        type_parameters: vec![],
        params: vec![],
        results: vec![],
        function_calls: vec![],
        method_calls: vec![],
        types: vec![],
        global_vars: vec![],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_exhausted_past_max_depth() {
        let budget = RecursionBudget::new(1);
        assert!(!budget.exhausted());
        let one_hop = budget.descend();
        assert!(!one_hop.exhausted());
        let two_hops = one_hop.descend();
        assert!(two_hops.exhausted());
    }
}
