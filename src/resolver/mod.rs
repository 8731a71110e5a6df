//! Symbol resolution against the module cache.
//!
//! Resolution starts from "where the caret is": the innermost block containing the offset. From there the scope
//! chain is walked outward to the module root, collecting every declaration with the requested name, and then the
//! imported modules are searched. The search never stops at the first hit; all matches come back ranked by scope
//! proximity (0 = innermost) and declaration order.
//!
//! "Nothing found" is [`Resolution::Empty`], a normal outcome. A module that is imported but not cached simply
//! contributes no matches.
//!
//! ## Modules
//!
//! - `scope` - caret blocks, local declarations, import visibility
//! - `members` - member access through modules, packages, class-likes, enums and declared types
//! - `completion` - visible-name listing and call signatures at the caret

mod completion;
mod members;
mod scope;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dscope_core::lang::keywords::KeywordId;
use dscope_syntax::ast::{CodeLocation, ExprId, Node, NodeId, Span};
use dscope_syntax::expressions::Expr;
use dscope_syntax::types::TypeDecl;

pub use completion::{CompletionItem, completion_candidates, method_insight};
pub use scope::{search_block_at, search_statement_at};

use crate::cache::{ModuleCache, ModuleEntry};

/// Bound on nested type/expression lookups (`auto a = b; auto b = a;` must not loop).
const MAX_LOOKUP_DEPTH: usize = 32;

// ============================================================================
// Results
// ============================================================================

/// A declaration found by a lookup.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub module: Arc<ModuleEntry>,
    pub node: NodeId,
    /// Scope distance from the lookup site; 0 is the innermost block
    pub proximity: usize,
    /// Name the declaration is visible under, when a selective import renamed it
    pub alias: Option<String>,
}

impl Candidate {
    pub fn new(module: &Arc<ModuleEntry>, node: NodeId, proximity: usize) -> Self {
        Self {
            module: Arc::clone(module),
            node,
            proximity,
            alias: None,
        }
    }

    /// The module itself, as a declaration.
    pub fn module_root(module: &Arc<ModuleEntry>, proximity: usize) -> Self {
        Self::new(module, module.tree.root, proximity)
    }

    pub fn node(&self) -> &Node {
        self.module.tree.node(self.node)
    }

    /// Visible name.
    pub fn name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None if self.node == self.module.tree.root => &self.module.name,
            None => &self.node().name,
        }
    }

    pub fn location(&self) -> DefinitionLocation {
        let node = self.node();
        DefinitionLocation {
            module: self.module.name.clone(),
            file: self.module.path.clone(),
            span: node.name_span,
            location: self.module.tree.location(node.name_span.start),
        }
    }

    fn key(&self) -> (&str, NodeId) {
        (self.module.name.as_str(), self.node)
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

/// Where a declaration is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLocation {
    pub module: String,
    pub file: Option<PathBuf>,
    pub span: Span,
    pub location: CodeLocation,
}

impl fmt::Display for DefinitionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}", file.display())?,
            None => write!(f, "{}", self.module)?,
        }
        write!(f, ":{}:{}", self.location.line, self.location.column)
    }
}

/// Ranked outcome of a lookup. Ambiguous results are never narrowed down automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Empty,
    Unique(Candidate),
    Ambiguous(Vec<Candidate>),
}

impl Resolution {
    /// Deduplicate and rank: by proximity, then by the order the lookup found them.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| seen.insert((c.module.name.clone(), c.node)))
            .collect();
        unique.sort_by_key(|c| c.proximity);
        match unique.len() {
            0 => Resolution::Empty,
            1 => Resolution::Unique(unique.remove(0)),
            _ => Resolution::Ambiguous(unique),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolution::Empty)
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Resolution::Empty => &[],
            Resolution::Unique(candidate) => std::slice::from_ref(candidate),
            Resolution::Ambiguous(candidates) => candidates,
        }
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        match self {
            Resolution::Empty => Vec::new(),
            Resolution::Unique(candidate) => vec![candidate],
            Resolution::Ambiguous(candidates) => candidates,
        }
    }
}

/// Intermediate lookup result: a declaration, or a package prefix such as `std` in `std.stdio.writeln`.
#[derive(Debug, Clone)]
enum Target {
    Symbol(Candidate),
    Package { name: String, proximity: usize },
}

fn symbols(targets: Vec<Target>) -> Resolution {
    Resolution::from_candidates(
        targets
            .into_iter()
            .filter_map(|t| match t {
                Target::Symbol(c) => Some(c),
                Target::Package { .. } => None,
            })
            .collect(),
    )
}

// ============================================================================
// Lookup state
// ============================================================================

/// One resolution run. Holds the cache and the recursion budget.
struct Lookup<'c> {
    cache: &'c ModuleCache,
    /// Module the lookup started in; its private declarations stay visible
    origin: String,
    depth: usize,
}

impl<'c> Lookup<'c> {
    fn new(cache: &'c ModuleCache, origin: &ModuleEntry) -> Self {
        Self {
            cache,
            origin: origin.name.clone(),
            depth: 0,
        }
    }

    /// Run `f` one level deeper, or return the default once the budget is spent.
    fn nested<T: Default>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        if self.depth >= MAX_LOOKUP_DEPTH {
            tracing::trace!(depth = self.depth, "lookup depth exhausted");
            return T::default();
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Every declaration named `name` visible at `offset` in `module`.
pub fn resolve_identifier(cache: &ModuleCache, module: &Arc<ModuleEntry>, name: &str, offset: usize) -> Resolution {
    let mut lookup = Lookup::new(cache, module);
    let block = search_block_at(&module.tree, offset);
    Resolution::from_candidates(lookup.scope_chain(module, block, offset, Some(name)))
}

/// Declarations a type declaration written at `offset` refers to.
pub fn resolve_type(cache: &ModuleCache, module: &Arc<ModuleEntry>, ty: &TypeDecl, offset: usize) -> Resolution {
    let mut lookup = Lookup::new(cache, module);
    let block = search_block_at(&module.tree, offset);
    symbols(lookup.type_targets(module, ty, block, offset))
}

/// Declarations expression `expr` of `module` refers to.
pub fn resolve_expression(cache: &ModuleCache, module: &Arc<ModuleEntry>, expr: ExprId) -> Resolution {
    let mut lookup = Lookup::new(cache, module);
    let offset = module.tree.expr(expr).span.start;
    symbols(lookup.expr_targets(module, expr, offset))
}

/// Resolve a dotted name (`std.stdio.File`, `w.draw`) as written at `offset`.
pub fn resolve_path(cache: &ModuleCache, module: &Arc<ModuleEntry>, path: &[&str], offset: usize) -> Resolution {
    let mut lookup = Lookup::new(cache, module);
    symbols(lookup.path_targets(module, path, offset))
}

/// Resolve the symbol under the caret.
///
/// The innermost name-like expression around the caret is resolved first; declarations that are not expressions
/// (type names, declared names) fall back to the dotted identifier under the caret.
pub fn resolve_at(cache: &ModuleCache, module: &Arc<ModuleEntry>, offset: usize) -> Resolution {
    if let Some(expr) = expression_at(module, offset) {
        let resolution = resolve_expression(cache, module, expr);
        if !resolution.is_empty() {
            return resolution;
        }
    }
    let path = dotted_name_at(&module.source, offset);
    if path.is_empty() {
        return Resolution::Empty;
    }
    let parts: Vec<&str> = path.iter().map(String::as_str).collect();
    resolve_path(cache, module, &parts, offset)
}

/// Definition sites of the symbol under the caret, best candidates first.
#[tracing::instrument(skip_all, fields(module = %module.name, offset = offset))]
pub fn goto_definition(cache: &ModuleCache, module: &Arc<ModuleEntry>, offset: usize) -> Vec<DefinitionLocation> {
    let resolution = resolve_at(cache, module, offset);
    tracing::debug!(candidates = resolution.candidates().len(), "goto definition");
    resolution.candidates().iter().map(Candidate::location).collect()
}

/// Smallest name-like expression whose span contains `offset`.
fn expression_at(module: &ModuleEntry, offset: usize) -> Option<ExprId> {
    module
        .tree
        .exprs
        .iter()
        .filter(|(_, e)| e.span.contains(offset))
        .filter(|(_, e)| {
            matches!(
                e.node,
                Expr::Identifier(_)
                    | Expr::Access { .. }
                    | Expr::TypeDeclaration(_)
                    | Expr::New { .. }
                    | Expr::Token(KeywordId::This)
                    | Expr::Token(KeywordId::Super)
            )
        })
        .min_by_key(|(_, e)| e.span.len())
        .map(|(id, _)| id)
}

/// The dotted identifier chain ending at the word under `offset` (`a.b.c|d` -> `["a", "b", "cd"]`).
fn dotted_name_at(source: &str, offset: usize) -> Vec<String> {
    let bytes = source.as_bytes();
    let is_word = |c: u8| c.is_ascii_alphanumeric() || c == b'_';
    let offset = offset.min(bytes.len());

    let mut end = offset;
    while end < bytes.len() && is_word(bytes[end]) {
        end += 1;
    }
    let mut start = offset;
    while start > 0 && (is_word(bytes[start - 1]) || bytes[start - 1] == b'.') {
        start -= 1;
    }
    let Some(text) = source.get(start..end) else {
        return Vec::new();
    };
    let parts: Vec<String> = text.split('.').map(str::to_string).collect();
    // A leading dot is module scope; an empty segment elsewhere is not a name.
    let parts: Vec<String> = match parts.split_first() {
        Some((first, rest)) if first.is_empty() => rest.to_vec(),
        _ => parts,
    };
    if parts.iter().any(|p| p.is_empty() || p.as_bytes()[0].is_ascii_digit()) {
        return Vec::new();
    }
    parts
}

#[cfg(test)]
mod tests;
