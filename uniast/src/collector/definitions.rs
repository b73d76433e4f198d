//! Definition-follow (spec §4.4 "Definition-follow"): resolves an entity
//! token at some position to the `Identity` of the thing it names, with a
//! visited-set guarding against cyclic follows (e.g. recursive type
//! aliases, `impl` blocks referencing their own trait).

use std::collections::HashSet;

use crate::lsp::LspClient;
use crate::model::Identity;
use crate::pos::{FileUri, Location, Position};

/// `(URI, Position)` pairs already followed in the current symbol's
/// resolution pass — prevents infinite recursion on cyclic definitions
/// (spec §4.4 "Cyclic definition-follow is prevented by visited-set keyed
/// by (URI, Position)").
#[derive(Default)]
pub struct VisitedSet(HashSet<(FileUri, Position)>);

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, uri: &FileUri, pos: Position) -> bool {
        self.0.insert((uri.clone(), pos))
    }
}

/// Outcome of following a token to its definition and resolving that
/// definition to a concrete entity identity.
pub struct FollowResult {
    pub identity: Identity,
    pub target: Location,
}

/// Calls `textDocument/definition`, picks the best candidate, and resolves
/// it to an `Identity` via `name_space` + the target file's own document
/// symbols (spec §4.4: "translate the target location to an Identity by
/// NameSpace(target.URI) + resolving the symbol name at that location").
///
/// Returns `None` for: no definition found, a self-referential result (the
/// definition *is* the token's own declaration), or a definition whose
/// symbol name can't be resolved in its own file (synthetic/generated code).
pub async fn follow(
    client: &LspClient,
    lang: &dyn crate::langspec::LanguageSpec,
    source_uri: &FileUri,
    source_pos: Position,
    is_internal: impl Fn(&FileUri) -> bool,
    visited: &mut VisitedSet,
) -> crate::error::Result<Option<FollowResult>> {
    let candidates = client.definition(source_uri, source_pos).await?;
    let Some(target) = pick_best(&candidates, is_internal).cloned() else {
        return Ok(None);
    };

    if target.uri == *source_uri && target.range.start == source_pos {
        return Ok(None);
    }

    if !visited.mark(&target.uri, target.range.start) {
        return Ok(None);
    }

    let target_path = target.uri.to_path();
    let (mod_path, pkg_path) = lang.name_space(&target_path);

    let target_symbols = client.document_symbol(&target.uri).await?;
    let name = target_symbols
        .iter()
        .find(|sym| crate::pos::Range::from(sym.selection_range).includes(&target.range))
        .map(|sym| sym.name.clone());

    let Some(name) = name else {
        return Ok(None);
    };

    Ok(Some(FollowResult {
        identity: Identity::new(mod_path, pkg_path, name),
        target,
    }))
}

/// Calls `textDocument/typeDefinition` instead of `definition` — otherwise
/// the same resolution as [`follow`]. Used to populate `Var.r#type` (spec
/// §3/§8 scenario 1), which names the declared type rather than wherever the
/// variable itself was declared.
pub async fn follow_type(
    client: &LspClient,
    lang: &dyn crate::langspec::LanguageSpec,
    source_uri: &FileUri,
    source_pos: Position,
    is_internal: impl Fn(&FileUri) -> bool,
    visited: &mut VisitedSet,
) -> crate::error::Result<Option<FollowResult>> {
    let candidates = client.type_definition(source_uri, source_pos).await?;
    let Some(target) = pick_best(&candidates, is_internal).cloned() else {
        return Ok(None);
    };

    if target.uri == *source_uri && target.range.start == source_pos {
        return Ok(None);
    }

    if !visited.mark(&target.uri, target.range.start) {
        return Ok(None);
    }

    let target_path = target.uri.to_path();
    let (mod_path, pkg_path) = lang.name_space(&target_path);

    let target_symbols = client.document_symbol(&target.uri).await?;
    let name = target_symbols
        .iter()
        .find(|sym| crate::pos::Range::from(sym.selection_range).includes(&target.range))
        .map(|sym| sym.name.clone());

    let Some(name) = name else {
        return Ok(None);
    };

    Ok(Some(FollowResult {
        identity: Identity::new(mod_path, pkg_path, name),
        target,
    }))
}

/// Picks the best of several candidate definitions: prefer one inside a
/// repository-internal module (spec §4.4: "Definition returns multiple
/// targets: prefer the one inside a repository-internal module; else the
/// first").
pub fn pick_best<'a>(
    candidates: &'a [Location],
    is_internal: impl Fn(&FileUri) -> bool,
) -> Option<&'a Location> {
    candidates
        .iter()
        .find(|loc| is_internal(&loc.uri))
        .or_else(|| candidates.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visited_set_marks_each_pair_only_once() {
        let mut visited = VisitedSet::new();
        let uri = FileUri::from_path(std::path::Path::new("/a.rs"));
        assert!(visited.mark(&uri, Position::new(1, 0)));
        assert!(!visited.mark(&uri, Position::new(1, 0)));
        assert!(visited.mark(&uri, Position::new(2, 0)));
    }

    #[test]
    fn pick_best_prefers_internal_module() {
        let internal_uri = FileUri::from_path(std::path::Path::new("/repo/src/a.rs"));
        let external_uri = FileUri::from_path(std::path::Path::new("/registry/serde/lib.rs"));
        let candidates = vec![
            Location::new(external_uri.clone(), crate::pos::Range::default()),
            Location::new(internal_uri.clone(), crate::pos::Range::default()),
        ];
        let best = pick_best(&candidates, |uri| uri == &internal_uri).unwrap();
        assert_eq!(best.uri, internal_uri);
    }

    #[test]
    fn pick_best_falls_back_to_first_when_none_internal() {
        let a = FileUri::from_path(std::path::Path::new("/a"));
        let b = FileUri::from_path(std::path::Path::new("/b"));
        let candidates = vec![
            Location::new(a.clone(), crate::pos::Range::default()),
            Location::new(b, crate::pos::Range::default()),
        ];
        let best = pick_best(&candidates, |_| false).unwrap();
        assert_eq!(best.uri, a);
    }
}
