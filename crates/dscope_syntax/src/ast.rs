//! Arena-backed syntax tree for D modules.
//!
//! A [`SyntaxTree`] owns two arenas: one for declaration/scope nodes ([`Node`]) and one for expressions
//! ([`Expr`]). Parent links are stored handles, never owning references, so a finished tree is immutable plain data
//! that can be shared behind an `Arc` and read from many threads while a newer tree is being built elsewhere.
//!
//! ## Notes
//! - Handles are only meaningful for the tree that produced them.
//! - Children are ordered by source position and are unique only by identity; overloads and shadowing are kept.
//! - Every child handle is allocated after its parent, so walking parent links always terminates at the root.

use std::fmt;

use dscope_core::lang::keywords::{self, KeywordId};
use la_arena::{Arena, Idx};

use crate::expressions::Expr;
use crate::lexer::Comment;
use crate::types::TypeDecl;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Return `true` if `offset` lies inside the span (both ends inclusive, so a caret at the end still counts).
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Identifier spelling.
pub type Ident = String;

/// Handle of a declaration/scope node inside a [`SyntaxTree`].
pub type NodeId = Idx<Node>;

/// Handle of an expression inside a [`SyntaxTree`].
pub type ExprId = Idx<Spanned<Expr>>;

// ============================================================================
// Locations
// ============================================================================

/// 1-based line/column position, the unit consumers (error lists, go-to-definition) display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CodeLocation {
    pub line: usize,
    pub column: usize,
}

impl CodeLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets to line/column positions.
///
/// Columns count `char`s, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text: String,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            text: source.to_string(),
        }
    }

    /// Convert a byte offset into a [`CodeLocation`]; offsets past the end clamp to the last position.
    pub fn location(&self, offset: usize) -> CodeLocation {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        CodeLocation::new(line + 1, column + 1)
    }

    /// Convert a 1-based location back into a byte offset, if it exists.
    pub fn offset(&self, location: CodeLocation) -> Option<usize> {
        let line_start = *self.line_starts.get(location.line.checked_sub(1)?)?;
        let line_end = self
            .line_starts
            .get(location.line)
            .copied()
            .unwrap_or(self.text.len());
        let line_text = self.text.get(line_start..line_end)?;
        let column = location.column.checked_sub(1)?;
        if column == 0 {
            return Some(line_start);
        }
        line_text
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .or_else(|| (line_text.chars().count() == column).then_some(line_end))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The source text this index was built from.
    pub fn text(&self) -> &str {
        &self.text
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// A declaration or scope in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Empty for anonymous nodes (function literals, plain statement blocks, anonymous enums).
    pub name: Ident,
    /// Declared type: variable type, method return type, enum base type, template value parameter type.
    pub ty: Option<TypeDecl>,
    pub span: Span,
    pub name_span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: Vec<Attribute>,
    pub template_parameters: Vec<NodeId>,
    /// Attached documentation comment text.
    pub description: Option<String>,
    /// Extent of the `{ ... }` body of block-like nodes.
    pub body: Option<Span>,
    /// Extents of the top-level statements inside a method or statement block body.
    pub statements: Vec<Span>,
}

impl Node {
    pub fn new(kind: NodeKind, name: impl Into<Ident>, span: Span) -> Self {
        Self {
            kind,
            name: name.into(),
            ty: None,
            span,
            name_span: span,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            template_parameters: Vec::new(),
            description: None,
            body: None,
            statements: Vec::new(),
        }
    }

    /// Effective protection from the node's own attributes; D defaults to `public`.
    pub fn protection(&self) -> KeywordId {
        self.attributes
            .iter()
            .rev()
            .find_map(|attr| match attr {
                Attribute::Keyword(id) if keywords::is_protection(*id) => Some(*id),
                _ => None,
            })
            .unwrap_or(KeywordId::Public)
    }

    pub fn has_attribute(&self, id: KeywordId) -> bool {
        self.attributes.iter().any(|attr| matches!(attr, Attribute::Keyword(k) if *k == id))
    }

    pub fn is_static(&self) -> bool {
        self.has_attribute(KeywordId::Static)
    }

    /// Return `true` for nodes whose children form their own lookup scope.
    pub fn is_block(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Module | NodeKind::Method(_) | NodeKind::ClassLike(_) | NodeKind::Enum | NodeKind::Block(_)
        )
    }

    pub fn method(&self) -> Option<&MethodData> {
        match &self.kind {
            NodeKind::Method(data) => Some(data),
            _ => None,
        }
    }

    pub fn class_like(&self) -> Option<&ClassLikeData> {
        match &self.kind {
            NodeKind::ClassLike(data) => Some(data),
            _ => None,
        }
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module,
    Variable(VariableData),
    Method(MethodData),
    ClassLike(ClassLikeData),
    /// Enum declaration; the base type (if any) is the node's `ty`.
    Enum,
    EnumValue { initializer: Option<ExprId> },
    /// A statement scope (`if`, `foreach`, plain `{}`, ...); `token` is the introducing keyword.
    Block(BlockData),
    TemplateParameter(TemplateParameterKind),
}

impl NodeKind {
    /// Short lowercase label used by outlines and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Variable(v) if v.is_alias => "alias",
            NodeKind::Variable(_) => "variable",
            NodeKind::Method(_) => "method",
            NodeKind::ClassLike(c) => c.kind.as_str(),
            NodeKind::Enum => "enum",
            NodeKind::EnumValue { .. } => "enum value",
            NodeKind::Block(_) => "block",
            NodeKind::TemplateParameter(_) => "template parameter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableData {
    pub initializer: Option<ExprId>,
    pub is_alias: bool,
    pub is_parameter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodKind {
    #[default]
    Normal,
    Constructor,
    Destructor,
    Unittest,
    Invariant,
    /// Function or delegate literal.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodData {
    pub kind: MethodKind,
    /// Parameter nodes (variables whose parent is the method); not part of `children`.
    pub parameters: Vec<NodeId>,
    pub is_variadic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Struct,
    Interface,
    Union,
    Template,
}

impl ClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassKind::Class => "class",
            ClassKind::Struct => "struct",
            ClassKind::Interface => "interface",
            ClassKind::Union => "union",
            ClassKind::Template => "template",
        }
    }

    pub fn keyword(self) -> KeywordId {
        match self {
            ClassKind::Class => KeywordId::Class,
            ClassKind::Struct => KeywordId::Struct,
            ClassKind::Interface => KeywordId::Interface,
            ClassKind::Union => KeywordId::Union,
            ClassKind::Template => KeywordId::Template,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassLikeData {
    pub kind: ClassKind,
    pub base_classes: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockData {
    pub token: Option<KeywordId>,
    pub expression: Option<ExprId>,
}

/// Template parameter flavours: `T`, `T : Spec = Default`, `int N`, `alias A`, `T...`, `this T`.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateParameterKind {
    Type {
        specialization: Option<TypeDecl>,
        default: Option<TypeDecl>,
    },
    /// Value parameter; its type is the node's `ty`.
    Value {
        specialization: Option<ExprId>,
        default: Option<ExprId>,
    },
    Alias {
        specialization: Option<TypeDecl>,
        default: Option<TypeDecl>,
    },
    Tuple,
    This {
        specialization: Option<TypeDecl>,
        default: Option<TypeDecl>,
    },
}

/// Declaration attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Storage class, type constructor, protection, or `deprecated`.
    Keyword(KeywordId),
    /// `@safe`, `@property`, `@nogc` or a user-defined `@attr`.
    Property(Ident),
    /// `extern(C)` and friends.
    Linkage(Ident),
    /// `align` or `align(n)`.
    Align(Option<u64>),
    /// `@(...)` attribute list; the arguments are not kept.
    UserDefined,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Keyword(id) => f.write_str(keywords::as_str(*id)),
            Attribute::Property(name) => write!(f, "@{name}"),
            Attribute::Linkage(linkage) => write!(f, "extern({linkage})"),
            Attribute::Align(None) => f.write_str("align"),
            Attribute::Align(Some(n)) => write!(f, "align({n})"),
            Attribute::UserDefined => f.write_str("@(...)"),
        }
    }
}

// ============================================================================
// Imports
// ============================================================================

/// `import [alias =] a.b.c [: x, y = z];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub module: String,
    pub alias: Option<Ident>,
    pub bindings: Vec<ImportBinding>,
    pub is_public: bool,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub name: Ident,
    pub alias: Option<Ident>,
}

// ============================================================================
// Tree
// ============================================================================

/// One parsed module.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub nodes: Arena<Node>,
    pub exprs: Arena<Spanned<Expr>>,
    pub root: NodeId,
    /// Name from the `module a.b;` declaration, if present.
    pub module_name: Option<String>,
    imports: Vec<ImportDirective>,
    pub comments: Vec<Comment>,
    pub line_index: LineIndex,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    /// Create an empty tree containing only the module root.
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new(NodeKind::Module, "", Span::default()));
        Self {
            nodes,
            exprs: Arena::new(),
            root,
            module_name: None,
            imports: Vec::new(),
            comments: Vec::new(),
            line_index: LineIndex::default(),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn expr(&self, id: ExprId) -> &Spanned<Expr> {
        &self.exprs[id]
    }

    pub fn alloc_node(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn alloc_expr(&mut self, expr: Expr, span: Span) -> ExprId {
        self.exprs.alloc(Spanned::new(expr, span))
    }

    /// Allocate `node` and append it to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = self.nodes.alloc(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Allocate `node` with a parent link but without listing it as a child (parameters, template parameters).
    pub fn add_detached(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        self.nodes.alloc(node)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Iterate `id` and then each enclosing node up to (and including) the module root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| self.nodes[current].parent)
    }

    /// Depth-first, pre-order iteration over `id` and everything below it (children only).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        out
    }

    /// Direct children of `block` named `name`.
    pub fn children_named<'t>(&'t self, block: NodeId, name: &'t str) -> impl Iterator<Item = NodeId> + 't {
        self.nodes[block]
            .children
            .iter()
            .copied()
            .filter(move |&child| self.nodes[child].name == name)
    }

    // ------------------------------------------------------------------------
    // Imports
    // ------------------------------------------------------------------------

    pub fn imports(&self) -> &[ImportDirective] {
        &self.imports
    }

    /// Record an import; a module imported twice keeps one entry and becomes public if either import is.
    pub fn add_import(&mut self, directive: ImportDirective) {
        if let Some(existing) = self.imports.iter_mut().find(|i| i.module == directive.module) {
            existing.is_public |= directive.is_public;
            existing.bindings.extend(directive.bindings);
            if existing.alias.is_none() {
                existing.alias = directive.alias;
            }
            existing.span = existing.span.merge(directive.span);
            return;
        }
        self.imports.push(directive);
    }

    /// `Some(is_public)` if `module` is imported.
    pub fn import_visibility(&self, module: &str) -> Option<bool> {
        self.imports.iter().find(|i| i.module == module).map(|i| i.is_public)
    }

    /// End offset of the last import declaration, the insertion point for new imports.
    pub fn last_import_end(&self) -> Option<usize> {
        self.imports.iter().map(|i| i.span.end).max()
    }

    // ------------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------------

    pub fn location(&self, offset: usize) -> CodeLocation {
        self.line_index.location(offset)
    }

    /// Visible name of the module: the declared name, or `fallback` when the source has no module declaration.
    pub fn effective_module_name<'s>(&'s self, fallback: &'s str) -> &'s str {
        self.module_name.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_round_trip() {
        let index = LineIndex::new("ab\ncd\n\nxyz");
        assert_eq!(index.location(0), CodeLocation::new(1, 1));
        assert_eq!(index.location(3), CodeLocation::new(2, 1));
        assert_eq!(index.location(4), CodeLocation::new(2, 2));
        assert_eq!(index.location(6), CodeLocation::new(3, 1));
        assert_eq!(index.location(9), CodeLocation::new(4, 3));
        assert_eq!(index.offset(CodeLocation::new(4, 3)), Some(9));
        assert_eq!(index.offset(CodeLocation::new(2, 1)), Some(3));
        assert_eq!(index.offset(CodeLocation::new(9, 1)), None);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn test_line_index_counts_chars() {
        let index = LineIndex::new("ü = 1;");
        assert_eq!(index.location("ü".len()), CodeLocation::new(1, 2));
    }

    #[test]
    fn test_ancestors_end_at_root() {
        let mut tree = SyntaxTree::new();
        let class = tree.add_child(tree.root, Node::new(NodeKind::Enum, "E", Span::new(0, 10)));
        let value = tree.add_child(class, Node::new(NodeKind::EnumValue { initializer: None }, "A", Span::new(2, 3)));
        let chain: Vec<_> = tree.ancestors(value).collect();
        assert_eq!(chain, vec![value, class, tree.root]);
        assert_eq!(tree.descendants(tree.root), vec![tree.root, class, value]);
    }

    #[test]
    fn test_duplicate_import_merges_visibility() {
        let mut tree = SyntaxTree::new();
        let import = |is_public, span| ImportDirective {
            module: "std.stdio".into(),
            alias: None,
            bindings: Vec::new(),
            is_public,
            is_static: false,
            span,
        };
        tree.add_import(import(false, Span::new(0, 17)));
        tree.add_import(import(true, Span::new(18, 42)));
        assert_eq!(tree.imports().len(), 1);
        assert_eq!(tree.import_visibility("std.stdio"), Some(true));
        assert_eq!(tree.last_import_end(), Some(42));
    }

    #[test]
    fn test_protection_defaults_to_public() {
        let mut node = Node::new(NodeKind::Enum, "E", Span::default());
        assert_eq!(node.protection(), KeywordId::Public);
        node.attributes.push(Attribute::Keyword(KeywordId::Static));
        node.attributes.push(Attribute::Keyword(KeywordId::Private));
        assert_eq!(node.protection(), KeywordId::Private);
        assert!(node.is_static());
    }
}
