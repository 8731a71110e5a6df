/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type, its [`Parsed`] output and the top-level
/// module walk.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser` to keep all parser methods in a
///   single module while avoiding a single “god file”.

/// Maximum nesting of declarations/statements/expressions before the parser bails out of a construct.
///
/// One parenthesized expression level costs two units and a few dozen stack frames.
const MAX_NESTING_DEPTH: usize = 64;

/// Longest `base()`/`inner()` chain a parsed [`TypeDecl`] may have.
const MAX_TYPE_DEPTH: usize = 64;

/// Tallest expression tree the parser builds; left-associative chains are flat loops here but recursive walks
/// everywhere else.
const MAX_EXPR_HEIGHT: usize = 256;

/// Output of a parse: the tree plus every error recorded on the way.
///
/// The tree is always present; with errors it covers whatever could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub tree: SyntaxTree,
    pub errors: Vec<CompileError>,
}

impl Parsed {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Return `true` if some construct was skipped as unsupported; the tree is only partially complete.
    pub fn is_partial(&self) -> bool {
        self.errors.iter().any(CompileError::is_unimplemented)
    }
}

/// Parser state.
///
/// ## Notes
/// - The parser is single-pass with bounded speculative lookahead (see [`Lookahead`]); it recovers from errors by
///   synchronizing at statement/declaration boundaries.
/// - Nodes are added to the tree as soon as they are recognized; `scope` is the block new nodes are attached to.
pub struct Parser<'a> {
    stream: TokenStream<'a>,
    errors: Vec<CompileError>,
    tree: SyntaxTree,
    /// Innermost block node being filled.
    scope: NodeId,
    depth: usize,
    /// Height of every expression allocated so far.
    heights: ArenaMap<ExprId, usize>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream.
    ///
    /// ## Parameters
    /// - `tokens`: Token stream produced by `dscope_syntax::lexer`.
    pub fn new(tokens: &'a [Token]) -> Self {
        let tree = SyntaxTree::new();
        let scope = tree.root;
        Self {
            stream: TokenStream::new(tokens),
            errors: Vec::new(),
            tree,
            scope,
            depth: 0,
            heights: ArenaMap::default(),
        }
    }

    /// Parse the entire token stream into a [`SyntaxTree`].
    ///
    /// Errors are collected, never returned early: the parser attempts to recover and
    /// continue after an error to report multiple issues in one pass.
    pub fn parse(mut self) -> Parsed {
        let root = self.tree.root;

        if self.check_keyword(KeywordId::Module) {
            if let Err(e) = self.module_declaration() {
                self.errors.push(e);
                self.synchronize();
            }
        }

        self.decl_defs(Vec::new(), false);

        let end = self.peek().span.end;
        self.tree.node_mut(root).span = Span::new(0, end);
        self.tree.node_mut(root).body = Some(Span::new(0, end));

        Parsed {
            tree: self.tree,
            errors: self.errors,
        }
    }

    /// `module a.b.c;`
    fn module_declaration(&mut self) -> Result<(), CompileError> {
        let start = self.expect_keyword(KeywordId::Module, "'module'")?.start;
        let (name, name_span) = self.dotted_name()?;
        self.expect_punct(PunctuationId::Semicolon, "';' after module declaration")?;

        let root = self.tree.root;
        let node = self.tree.node_mut(root);
        node.name = name.clone();
        node.name_span = name_span;
        self.tree.module_name = Some(name);
        tracing::trace!(start, "module declaration");
        Ok(())
    }

    /// Run `f` with `scope` as the block new nodes are attached to.
    fn in_scope<T>(&mut self, scope: NodeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }
}
