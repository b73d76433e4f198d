//! Document-symbol flattening (spec §4.2 "documentSymbol").
//!
//! `textDocument/documentSymbol` returns a tree; the collector mostly wants
//! to walk symbols flatly (attributing tokens, looking up the enclosing
//! symbol of a reference) while still being able to ask "what's nested
//! inside this one" when decomposing impl blocks. [`FileStructure`] gives
//! both views over the same data.

use lsp_types::DocumentSymbol;

use crate::pos::Range;

/// A symbol plus the chain of ancestor symbol names it's nested under,
/// outermost first.
#[derive(Clone, Debug)]
pub struct FlatSymbol<'a> {
    pub symbol: &'a DocumentSymbol,
    pub path: Vec<&'a str>,
}

/// Depth-first flattening of a `documentSymbol` response. Order matches
/// source order within each nesting level.
pub fn flatten(roots: &[DocumentSymbol]) -> Vec<FlatSymbol<'_>> {
    let mut out = Vec::new();
    for root in roots {
        walk(root, &mut Vec::new(), &mut out);
    }
    out
}

fn walk<'a>(sym: &'a DocumentSymbol, path: &mut Vec<&'a str>, out: &mut Vec<FlatSymbol<'a>>) {
    out.push(FlatSymbol {
        symbol: sym,
        path: path.clone(),
    });
    if let Some(children) = &sym.children {
        path.push(sym.name.as_str());
        for child in children {
            walk(child, path, out);
        }
        path.pop();
    }
}

/// A range-keyed rebuild of the symbol tree, used to answer "which symbol
/// encloses this token/reference" without re-walking the hierarchical
/// response on every lookup.
pub struct FileStructure<'a> {
    flat: Vec<FlatSymbol<'a>>,
}

impl<'a> FileStructure<'a> {
    pub fn new(roots: &'a [DocumentSymbol]) -> Self {
        Self {
            flat: flatten(roots),
        }
    }

    /// Innermost symbol whose range contains `range`, or `None` if `range`
    /// falls outside every top-level symbol (e.g. a file-level comment).
    ///
    /// Relies on `flatten`'s depth-first order: descendants are always
    /// visited after their ancestor, so the last matching entry is the
    /// innermost one.
    pub fn enclosing(&self, range: Range) -> Option<&'a DocumentSymbol> {
        self.flat
            .iter()
            .filter(|flat| Range::from(flat.symbol.range).includes(&range))
            .last()
            .map(|flat| flat.symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatSymbol<'a>> {
        self.flat.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Position as LspPosition, Range as LspRange, SymbolKind};

    fn sym(name: &str, start: u32, end: u32, children: Vec<DocumentSymbol>) -> DocumentSymbol {
        #[allow(deprecated)]
        DocumentSymbol {
            name: name.to_string(),
            detail: None,
            kind: SymbolKind::FUNCTION,
            tags: None,
            deprecated: None,
            range: LspRange::new(LspPosition::new(start, 0), LspPosition::new(end, 0)),
            selection_range: LspRange::new(LspPosition::new(start, 0), LspPosition::new(start, 1)),
            children: if children.is_empty() {
                None
            } else {
                Some(children)
            },
        }
    }

    #[test]
    fn flatten_visits_depth_first_with_ancestor_path() {
        let tree = vec![sym(
            "impl Foo",
            0,
            10,
            vec![sym("method", 1, 2, vec![])],
        )];
        let flat = flatten(&tree);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].symbol.name, "impl Foo");
        assert!(flat[0].path.is_empty());
        assert_eq!(flat[1].symbol.name, "method");
        assert_eq!(flat[1].path, vec!["impl Foo"]);
    }

    #[test]
    fn enclosing_picks_the_innermost_containing_symbol() {
        let tree = vec![sym("outer", 0, 10, vec![sym("inner", 2, 4, vec![])])];
        let structure = FileStructure::new(&tree);
        let point = Range::new(
            crate::pos::Position::new(3, 0),
            crate::pos::Position::new(3, 1),
        );
        let found = structure.enclosing(point).unwrap();
        assert_eq!(found.name, "inner");
    }
}
