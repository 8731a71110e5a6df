/// Declaration parsing.
///
/// This chunk covers everything that can appear at module or aggregate level:
/// attributes (`attr:`, `attr { }`, prefix form), imports, aggregates, templates,
/// enums, aliases, constructors/destructors, unittests, conditional compilation,
/// and variable/function declarations.
///
/// ## Notes
/// - Conditional compilation (`version`, `debug`, `static if`) is not evaluated: the
///   declarations of every branch are added to the enclosing scope.
/// - Unsupported productions are consumed and reported as `ErrorKind::Unimplemented`.

/// Parsed `( ... )` parameter list of a function or function type.
struct ParameterList {
    parameters: Vec<(ParameterDecl, Span)>,
    /// Trailing `...`, C-style or typesafe.
    variadic: bool,
}

fn new_node(kind: NodeKind, name: Ident, name_span: Span, start: usize, attributes: Vec<Attribute>) -> Node {
    let mut node = Node::new(kind, name, Span::new(start, name_span.end.max(start)));
    node.name_span = name_span;
    node.attributes = attributes;
    node
}

fn method_kind(kind: MethodKind) -> NodeKind {
    NodeKind::Method(MethodData {
        kind,
        ..MethodData::default()
    })
}

impl<'a> Parser<'a> {
    // ========================================================================
    // Declaration lists
    // ========================================================================

    /// Parse declarations into the current scope until EOF or, with `until_brace`, an unmatched `}`.
    fn decl_defs(&mut self, inherited: Vec<Attribute>, until_brace: bool) {
        let mut sticky = inherited;
        loop {
            if self.is_at_end() {
                return;
            }
            if self.check_punct(PunctuationId::RBrace) {
                if until_brace {
                    return;
                }
                self.errors
                    .push(CompileError::syntax("Unexpected '}'", self.current_span()));
                self.advance();
                continue;
            }

            let before = self.stream.mark();
            if let Err(e) = self.decl_def(&mut sticky) {
                self.errors.push(e);
                self.synchronize();
            }
            if self.stream.mark() == before {
                self.advance();
            }
        }
    }

    /// Parse one declaration, including its attribute prefix.
    ///
    /// `sticky` holds attributes introduced by `attr:` earlier in the same block.
    fn decl_def(&mut self, sticky: &mut Vec<Attribute>) -> Result<(), CompileError> {
        let start = self.current_span().start;
        let mut prefix = Vec::new();
        while let Some(attribute) = self.attribute()? {
            prefix.push(attribute);
        }

        if !prefix.is_empty() {
            if self.match_punct(PunctuationId::Colon) {
                sticky.extend(prefix);
                return Ok(());
            }
            if self.check_punct(PunctuationId::LBrace) {
                self.advance();
                let mut inherited = sticky.clone();
                inherited.extend(prefix);
                self.nested(|p| {
                    p.decl_defs(inherited, true);
                    Ok(())
                })?;
                self.expect_punct(PunctuationId::RBrace, "'}' to close attribute block")?;
                return Ok(());
            }
        }

        let mut attributes = sticky.clone();
        attributes.extend(prefix);
        self.nested(|p| p.declaration(start, attributes))
    }

    /// Parse one declaration attribute, if the current token starts one.
    fn attribute(&mut self) -> Result<Option<Attribute>, CompileError> {
        let kind = &self.peek().kind;
        if kind.is_punctuation(PunctuationId::At) {
            self.advance();
            if self.check_punct(PunctuationId::LParen) {
                self.skip_group();
                return Ok(Some(Attribute::UserDefined));
            }
            let name = self.identifier()?;
            if self.check_punct(PunctuationId::LParen) {
                self.skip_group();
            }
            return Ok(Some(Attribute::Property(name)));
        }

        let Some(id) = kind.keyword_id() else {
            return Ok(None);
        };
        let next_is_paren = self.check_nth_punct(1, PunctuationId::LParen);
        match id {
            KeywordId::Extern => {
                self.advance();
                if !self.match_punct(PunctuationId::LParen) {
                    return Ok(Some(Attribute::Keyword(KeywordId::Extern)));
                }
                let mut linkage = String::new();
                while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
                    linkage.push_str(&token_text(self.advance()));
                }
                self.expect_punct(PunctuationId::RParen, "')' after linkage")?;
                Ok(Some(Attribute::Linkage(linkage)))
            }
            KeywordId::Align => {
                self.advance();
                let mut value = None;
                if self.match_punct(PunctuationId::LParen) {
                    if let TokenKind::Int(n) = self.peek().kind {
                        value = Some(n);
                    }
                    self.advance();
                    self.expect_punct(PunctuationId::RParen, "')' after alignment")?;
                }
                Ok(Some(Attribute::Align(value)))
            }
            KeywordId::Deprecated | KeywordId::Package => {
                self.advance();
                if self.check_punct(PunctuationId::LParen) {
                    self.skip_group();
                }
                Ok(Some(Attribute::Keyword(id)))
            }
            KeywordId::Static
                if self.check_nth_keyword(1, KeywordId::If) || self.check_nth_keyword(1, KeywordId::Assert) =>
            {
                Ok(None)
            }
            KeywordId::Scope | KeywordId::Synchronized if next_is_paren => Ok(None),
            KeywordId::Synchronized if self.check_nth_punct(1, PunctuationId::LBrace) => Ok(None),
            KeywordId::Final if self.check_nth_keyword(1, KeywordId::Switch) => Ok(None),
            _ if keywords::is_type_constructor(id) && next_is_paren => Ok(None),
            _ if keywords::is_storage_class(id) || keywords::is_protection(id) => {
                self.advance();
                Ok(Some(Attribute::Keyword(id)))
            }
            _ => Ok(None),
        }
    }

    /// Dispatch on the first token after the attribute prefix.
    fn declaration(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let Some(id) = self.peek().keyword_id() else {
            if self.match_punct(PunctuationId::Semicolon) {
                return Ok(());
            }
            if self.check_op(OperatorId::Tilde) && self.check_nth_keyword(1, KeywordId::This) {
                return self.destructor(start, attributes);
            }
            return self.variable_or_function(start, attributes);
        };

        match id {
            KeywordId::Import => self.import_declaration(start, &attributes),
            KeywordId::Class => self.aggregate(start, ClassKind::Class, attributes),
            KeywordId::Struct => self.aggregate(start, ClassKind::Struct, attributes),
            KeywordId::Union => self.aggregate(start, ClassKind::Union, attributes),
            KeywordId::Interface => self.aggregate(start, ClassKind::Interface, attributes),
            KeywordId::Template => self.template_declaration(start, attributes),
            KeywordId::Mixin => self.mixin_declaration(start, attributes),
            KeywordId::Enum => self.enum_declaration(start, attributes),
            KeywordId::Alias | KeywordId::Typedef => self.alias_declaration(start, attributes),
            KeywordId::This if self.check_nth_punct(1, PunctuationId::LParen) => self.constructor(start, attributes),
            KeywordId::Unittest => self.unittest(start, attributes),
            KeywordId::Invariant => self.invariant(start, attributes),
            KeywordId::Version | KeywordId::Debug => self.conditional_declaration(attributes),
            KeywordId::Static if self.check_nth_keyword(1, KeywordId::If) => self.conditional_declaration(attributes),
            KeywordId::Static if self.check_nth_keyword(1, KeywordId::Assert) => self.static_assert(),
            KeywordId::Pragma => {
                self.advance();
                if !self.check_punct(PunctuationId::LParen) {
                    return Err(self.expected("'(' after pragma"));
                }
                self.skip_group();
                if self.match_punct(PunctuationId::Semicolon) {
                    return Ok(());
                }
                let mut sticky = attributes;
                self.decl_def(&mut sticky)
            }
            KeywordId::Module => {
                let span = self.advance().span;
                self.skip_to_semicolon();
                Err(CompileError::syntax(
                    "Module declaration must be the first declaration",
                    self.span_from(span.start),
                ))
            }
            _ => self.variable_or_function(start, attributes),
        }
    }

    // ========================================================================
    // Imports
    // ========================================================================

    /// `import a.b, io = std.stdio, c : x, y = z;`
    fn import_declaration(&mut self, start: usize, attributes: &[Attribute]) -> Result<(), CompileError> {
        self.expect_keyword(KeywordId::Import, "'import'")?;
        let is_public = attributes.iter().rev().find_map(|attr| match attr {
            Attribute::Keyword(id) if keywords::is_protection(*id) => Some(*id),
            _ => None,
        }) == Some(KeywordId::Public);
        let is_static = attributes.contains(&Attribute::Keyword(KeywordId::Static));

        let mut modules = Vec::new();
        let mut bindings = Vec::new();
        loop {
            let mut alias = None;
            if self.check_ident() && self.check_nth_op(1, OperatorId::Eq) {
                alias = Some(self.identifier()?);
                self.advance();
            }
            let (module, _) = self.dotted_name()?;
            modules.push((module, alias));
            if self.match_punct(PunctuationId::Colon) {
                bindings = self.import_bindings()?;
                break;
            }
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::Semicolon, "';' after import")?;

        let span = self.span_from(start);
        let last = modules.len().saturating_sub(1);
        for (index, (module, alias)) in modules.into_iter().enumerate() {
            self.tree.add_import(ImportDirective {
                module,
                alias,
                bindings: if index == last { std::mem::take(&mut bindings) } else { Vec::new() },
                is_public,
                is_static,
                span,
            });
        }
        Ok(())
    }

    /// `x, y = z` after the `:` of a selective import; `y = z` imports `z` under the name `y`.
    fn import_bindings(&mut self) -> Result<Vec<ImportBinding>, CompileError> {
        let mut bindings = Vec::new();
        loop {
            let first = self.identifier()?;
            let binding = if self.match_op(OperatorId::Eq) {
                ImportBinding {
                    name: self.identifier()?,
                    alias: Some(first),
                }
            } else {
                ImportBinding {
                    name: first,
                    alias: None,
                }
            };
            bindings.push(binding);
            if !self.match_punct(PunctuationId::Comma) {
                return Ok(bindings);
            }
        }
    }

    // ========================================================================
    // Aggregates and templates
    // ========================================================================

    fn aggregate(&mut self, start: usize, kind: ClassKind, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        self.advance();
        let (name, name_span) = if self.check_ident() {
            self.identifier_spanned()?
        } else {
            (String::new(), self.current_span())
        };
        let node = new_node(
            NodeKind::ClassLike(ClassLikeData {
                kind,
                base_classes: Vec::new(),
            }),
            name,
            name_span,
            start,
            attributes,
        );
        let id = self.tree.add_child(self.scope, node);
        let result = self.aggregate_rest(id, kind);
        self.finish(id, start);
        result
    }

    fn aggregate_rest(&mut self, id: NodeId, kind: ClassKind) -> Result<(), CompileError> {
        if self.check_punct(PunctuationId::LParen) {
            self.template_parameters(id)?;
        }
        self.constraint()?;
        if matches!(kind, ClassKind::Class | ClassKind::Interface) && self.match_punct(PunctuationId::Colon) {
            let bases = self.base_class_list()?;
            if let NodeKind::ClassLike(data) = &mut self.tree.node_mut(id).kind {
                data.base_classes = bases;
            }
        }
        self.constraint()?;
        if self.match_punct(PunctuationId::Semicolon) {
            return Ok(());
        }
        self.declaration_block(id)
    }

    /// `: Base, Interface!T, public Other`
    fn base_class_list(&mut self) -> Result<Vec<TypeDecl>, CompileError> {
        let mut bases = Vec::new();
        loop {
            if self.peek().keyword_id().is_some_and(keywords::is_protection) {
                self.advance();
            }
            bases.push(self.parse_type()?);
            if !self.match_punct(PunctuationId::Comma) {
                return Ok(bases);
            }
        }
    }

    /// `{ decls }` body of an aggregate, template or enum-less block; fills `id`.
    fn declaration_block(&mut self, id: NodeId) -> Result<(), CompileError> {
        let open = self.expect_punct(PunctuationId::LBrace, "'{'")?;
        self.nested(|p| {
            p.in_scope(id, |p| p.decl_defs(Vec::new(), true));
            Ok(())
        })?;
        let close = self.expect_punct(PunctuationId::RBrace, "'}' to close declaration block");
        let end = close.as_ref().map_or(self.previous_end(), |span| span.end);
        self.tree.node_mut(id).body = Some(Span::new(open.start, end.max(open.start)));
        close.map(|_| ())
    }

    /// Optional template constraint `if (expr)`; the expression is parsed and dropped.
    fn constraint(&mut self) -> Result<(), CompileError> {
        if self.match_keyword(KeywordId::If) {
            self.expect_punct(PunctuationId::LParen, "'(' after 'if'")?;
            self.expression()?;
            self.expect_punct(PunctuationId::RParen, "')' after constraint")?;
        }
        Ok(())
    }

    /// `template Name(T) { decls }`
    fn template_declaration(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        self.expect_keyword(KeywordId::Template, "'template'")?;
        let (name, name_span) = self.identifier_spanned()?;
        let node = new_node(
            NodeKind::ClassLike(ClassLikeData {
                kind: ClassKind::Template,
                base_classes: Vec::new(),
            }),
            name,
            name_span,
            start,
            attributes,
        );
        let id = self.tree.add_child(self.scope, node);
        let result = self.template_rest(id);
        self.finish(id, start);
        result
    }

    fn template_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.template_parameters(id)?;
        self.constraint()?;
        self.declaration_block(id)
    }

    /// `mixin template ...`, `mixin("code");`, or a template mixin instantiation.
    fn mixin_declaration(&mut self, start: usize, mut attributes: Vec<Attribute>) -> Result<(), CompileError> {
        if self.check_nth_keyword(1, KeywordId::Template) {
            self.advance();
            attributes.push(Attribute::Keyword(KeywordId::Mixin));
            return self.template_declaration(start, attributes);
        }
        if self.check_nth_punct(1, PunctuationId::LParen) {
            // String mixins cannot be expanded without evaluation; the argument is still checked.
            self.advance();
            self.advance();
            self.expression()?;
            self.expect_punct(PunctuationId::RParen, "')' after mixin argument")?;
            self.expect_punct(PunctuationId::Semicolon, "';' after mixin")?;
            return Ok(());
        }
        self.skip_to_semicolon();
        let error = self
            .unimplemented("template mixin", self.span_from(start))
            .with_note("members introduced by the mixin are not visible");
        self.errors.push(error);
        Ok(())
    }

    /// `enum E : Base { A, B = 2 }`, anonymous `enum { A }`, or manifest constants `enum x = 1;`.
    fn enum_declaration(&mut self, start: usize, mut attributes: Vec<Attribute>) -> Result<(), CompileError> {
        self.expect_keyword(KeywordId::Enum, "'enum'")?;
        let named = self.check_ident()
            && (self.check_nth_punct(1, PunctuationId::LBrace)
                || self.check_nth_punct(1, PunctuationId::Colon)
                || self.check_nth_punct(1, PunctuationId::Semicolon));
        let anonymous = self.check_punct(PunctuationId::LBrace) || self.check_punct(PunctuationId::Colon);
        if !named && !anonymous {
            attributes.push(Attribute::Keyword(KeywordId::Enum));
            return self.variable_or_function(start, attributes);
        }

        let (name, name_span) = if named {
            self.identifier_spanned()?
        } else {
            (String::new(), self.current_span())
        };
        let node = new_node(NodeKind::Enum, name, name_span, start, attributes);
        let id = self.tree.add_child(self.scope, node);
        let result = self.enum_rest(id);
        self.finish(id, start);
        result
    }

    fn enum_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        if self.match_punct(PunctuationId::Colon) {
            let base = self.parse_type()?;
            self.tree.node_mut(id).ty = Some(base);
        }
        if self.match_punct(PunctuationId::Semicolon) {
            return Ok(());
        }
        let open = self.expect_punct(PunctuationId::LBrace, "'{' to start enum body")?;
        while !self.check_punct(PunctuationId::RBrace) && !self.is_at_end() {
            let start = self.current_span().start;
            while self.check_punct(PunctuationId::At) || self.check_keyword(KeywordId::Deprecated) {
                self.attribute()?;
            }
            let member_ty = if self.check_ident()
                && (self.check_nth_punct(1, PunctuationId::Comma)
                    || self.check_nth_op(1, OperatorId::Eq)
                    || self.check_nth_punct(1, PunctuationId::RBrace))
            {
                None
            } else {
                Some(self.parse_type()?)
            };
            let (name, name_span) = self.identifier_spanned()?;
            let initializer = if self.match_op(OperatorId::Eq) {
                Some(self.assign_expression()?)
            } else {
                None
            };
            let mut node = new_node(NodeKind::EnumValue { initializer }, name, name_span, start, Vec::new());
            node.ty = member_ty;
            node.span = self.span_from(start);
            self.tree.add_child(id, node);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        let close = self.expect_punct(PunctuationId::RBrace, "'}' to close enum body");
        let end = close.as_ref().map_or(self.previous_end(), |span| span.end);
        self.tree.node_mut(id).body = Some(Span::new(open.start, end));
        close.map(|_| ())
    }

    // ========================================================================
    // Aliases
    // ========================================================================

    /// `alias A = B;`, `alias B A;`, `alias member this;`
    fn alias_declaration(&mut self, start: usize, mut attributes: Vec<Attribute>) -> Result<(), CompileError> {
        self.advance();
        let alias = |initializer| {
            NodeKind::Variable(VariableData {
                initializer,
                is_alias: true,
                is_parameter: false,
            })
        };

        if self.check_ident() && self.check_nth_keyword(1, KeywordId::This) {
            let (target, target_span) = self.identifier_spanned()?;
            let this_span = self.advance().span;
            self.expect_punct(PunctuationId::Semicolon, "';' after alias this")?;
            let mut node = new_node(alias(None), "this".to_string(), this_span, start, attributes);
            node.ty = Some(TypeDecl::Identifier(target));
            node.span = self.span_from(start);
            node.name_span = target_span.merge(this_span);
            self.tree.add_child(self.scope, node);
            return Ok(());
        }

        let new_style = self.check_ident()
            && (self.check_nth_op(1, OperatorId::Eq) || self.check_nth_punct(1, PunctuationId::LParen));
        if new_style {
            loop {
                let item_start = self.current_span().start;
                let (name, name_span) = self.identifier_spanned()?;
                let node = new_node(alias(None), name, name_span, item_start, attributes.clone());
                let id = self.tree.add_child(self.scope, node);
                if self.check_punct(PunctuationId::LParen) {
                    self.template_parameters(id)?;
                }
                self.expect_op(OperatorId::Eq, "'=' in alias declaration")?;
                let target = self.alias_target()?;
                self.tree.node_mut(id).ty = Some(target);
                self.finish(id, item_start);
                if !self.match_punct(PunctuationId::Comma) {
                    break;
                }
            }
            self.expect_punct(PunctuationId::Semicolon, "';' after alias")?;
            return Ok(());
        }

        while let Some(attribute) = self.attribute()? {
            attributes.push(attribute);
        }
        let base = self.parse_type()?;
        loop {
            let (name, name_span) = self.identifier_spanned()?;
            let ty = self.declarator_suffixes(base.clone())?;
            let mut node = new_node(alias(None), name, name_span, start, attributes.clone());
            node.ty = Some(ty);
            node.span = self.span_from(start);
            self.tree.add_child(self.scope, node);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::Semicolon, "';' after alias")?;
        Ok(())
    }

    /// Right-hand side of `alias A = ...`: a type, or an expression (such as a lambda) wrapped as a declaration.
    fn alias_target(&mut self) -> Result<TypeDecl, CompileError> {
        let mut cursor = self.stream.lookahead();
        let is_type = cursor.skip_type()
            && (cursor.is_punct(PunctuationId::Semicolon) || cursor.is_punct(PunctuationId::Comma));
        if is_type {
            return self.parse_type();
        }
        let expr = self.assign_expression()?;
        Ok(TypeDecl::Expression { expr, inner: None })
    }

    // ========================================================================
    // Special functions
    // ========================================================================

    /// `this(...)`, including the postblit `this(this)`.
    fn constructor(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let name_span = self.advance().span;
        let node = new_node(method_kind(MethodKind::Constructor), "this".to_string(), name_span, start, attributes);
        let id = self.tree.add_child(self.scope, node);
        let result = if self.check_nth_keyword(1, KeywordId::This) && self.check_nth_punct(2, PunctuationId::RParen) {
            self.advance();
            self.advance();
            self.advance();
            self.function_attributes(id);
            self.function_body(id)
        } else {
            self.function_rest(id)
        };
        self.finish(id, start);
        result
    }

    /// `~this()`
    fn destructor(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let tilde = self.advance().span;
        let this = self.advance().span;
        let node = new_node(
            method_kind(MethodKind::Destructor),
            "~this".to_string(),
            tilde.merge(this),
            start,
            attributes,
        );
        let id = self.tree.add_child(self.scope, node);
        let result = self.function_rest(id);
        self.finish(id, start);
        result
    }

    fn unittest(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let name_span = self.advance().span;
        let node = new_node(method_kind(MethodKind::Unittest), String::new(), name_span, start, attributes);
        let id = self.tree.add_child(self.scope, node);
        let result = self.method_body(id);
        self.finish(id, start);
        result
    }

    /// `invariant() { ... }`, `invariant { ... }` or the expression form `invariant(cond);`.
    fn invariant(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let name_span = self.advance().span;
        if self.check_punct(PunctuationId::LParen) && !self.check_nth_punct(1, PunctuationId::RParen) {
            self.skip_group();
            self.expect_punct(PunctuationId::Semicolon, "';' after invariant")?;
            return Ok(());
        }
        if self.match_punct(PunctuationId::LParen) {
            self.advance();
        }
        let node = new_node(method_kind(MethodKind::Invariant), String::new(), name_span, start, attributes);
        let id = self.tree.add_child(self.scope, node);
        let result = self.method_body(id);
        self.finish(id, start);
        result
    }

    // ========================================================================
    // Conditional compilation
    // ========================================================================

    /// `version(X) ... else ...`, `debug ...`, `static if (cond) ...`, `version = X;`
    fn conditional_declaration(&mut self, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let is_static_if = self.match_keyword(KeywordId::Static);
        self.advance();

        if !is_static_if && self.match_op(OperatorId::Eq) {
            self.advance();
            self.expect_punct(PunctuationId::Semicolon, "';' after version assignment")?;
            return Ok(());
        }
        if is_static_if {
            self.expect_punct(PunctuationId::LParen, "'(' after 'static if'")?;
            self.expression()?;
            self.expect_punct(PunctuationId::RParen, "')' after condition")?;
        } else if self.check_punct(PunctuationId::LParen) {
            self.skip_group();
        }
        if self.match_punct(PunctuationId::Colon) {
            return Ok(());
        }

        self.conditional_body(attributes.clone())?;
        if self.match_keyword(KeywordId::Else) {
            self.conditional_body(attributes)?;
        }
        Ok(())
    }

    fn conditional_body(&mut self, inherited: Vec<Attribute>) -> Result<(), CompileError> {
        if self.match_punct(PunctuationId::LBrace) {
            self.nested(|p| {
                p.decl_defs(inherited, true);
                Ok(())
            })?;
            self.expect_punct(PunctuationId::RBrace, "'}' to close conditional block")?;
            return Ok(());
        }
        let mut sticky = inherited;
        self.decl_def(&mut sticky)
    }

    /// `static assert(cond, msg);`
    fn static_assert(&mut self) -> Result<(), CompileError> {
        self.advance();
        self.advance();
        if !self.check_punct(PunctuationId::LParen) {
            return Err(self.expected("'(' after 'static assert'"));
        }
        self.skip_group();
        self.expect_punct(PunctuationId::Semicolon, "';' after static assert")?;
        Ok(())
    }

    // ========================================================================
    // Variables and functions
    // ========================================================================

    /// `Type name [= init], name2 ...;`, `Type name(params) body`, `auto name = init;`, `int (*fp)(int);`
    fn variable_or_function(&mut self, start: usize, attributes: Vec<Attribute>) -> Result<(), CompileError> {
        let auto_declaration = !attributes.is_empty()
            && self.check_ident()
            && (self.check_nth_op(1, OperatorId::Eq) || self.check_nth_punct(1, PunctuationId::LParen));
        let ty = if auto_declaration { None } else { Some(self.parse_type()?) };

        if let Some(base) = &ty {
            if self.check_punct(PunctuationId::LParen) && self.check_nth_op(1, OperatorId::Star) {
                return self.c_style_function_pointer(start, base.clone(), attributes);
            }
        }

        let (name, name_span) = self.identifier_spanned()?;
        if self.check_punct(PunctuationId::LParen) {
            let mut node = new_node(method_kind(MethodKind::Normal), name, name_span, start, attributes);
            node.ty = ty;
            let id = self.tree.add_child(self.scope, node);
            let result = self.function_rest(id);
            self.finish(id, start);
            return result;
        }

        self.variable_declarators(start, ty, attributes, name, name_span)
    }

    /// The `name [= init], ...;` tail of a variable declaration whose first name was already consumed.
    fn variable_declarators(
        &mut self,
        start: usize,
        base: Option<TypeDecl>,
        attributes: Vec<Attribute>,
        mut name: Ident,
        mut name_span: Span,
    ) -> Result<(), CompileError> {
        let mut item_start = start;
        loop {
            let ty = match &base {
                Some(base) => Some(self.declarator_suffixes(base.clone())?),
                None => None,
            };
            if self.check_punct(PunctuationId::LParen) && attributes.contains(&Attribute::Keyword(KeywordId::Enum)) {
                // Eponymous enum template `enum isFoo(T) = ...;`
                self.skip_group();
            }
            let initializer = if self.match_op(OperatorId::Eq) {
                Some(self.initializer()?)
            } else {
                None
            };
            let mut node = new_node(
                NodeKind::Variable(VariableData {
                    initializer,
                    ..VariableData::default()
                }),
                name,
                name_span,
                item_start,
                attributes.clone(),
            );
            node.ty = ty;
            node.span = self.span_from(item_start);
            self.tree.add_child(self.scope, node);

            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
            item_start = self.current_span().start;
            (name, name_span) = self.identifier_spanned()?;
        }
        self.expect_punct(PunctuationId::Semicolon, "';' after declaration")?;
        Ok(())
    }

    /// `int (*fp)(int);` declares `fp` as `int function(int)`.
    fn c_style_function_pointer(
        &mut self,
        start: usize,
        base: TypeDecl,
        attributes: Vec<Attribute>,
    ) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'('")?;
        self.expect_op(OperatorId::Star, "'*'")?;
        let (name, name_span) = self.identifier_spanned()?;
        self.expect_punct(PunctuationId::RParen, "')' after declarator name")?;
        let ty = if self.check_punct(PunctuationId::LParen) {
            let list = self.parameter_list(false)?;
            TypeDecl::Delegate {
                return_type: Box::new(base),
                parameters: parameter_decls(list),
                is_function: true,
            }
        } else {
            TypeDecl::pointer(base)
        };
        self.variable_declarators(start, Some(ty), attributes, name, name_span)
    }

    /// Everything after a function name: template parameters, parameters, attributes, constraint, body.
    fn function_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        if self.is_template_parameter_list() {
            self.template_parameters(id)?;
        }
        let list = self.parameter_list(false)?;
        self.attach_parameters(id, list);
        self.function_attributes(id);
        self.constraint()?;
        self.function_body(id)
    }

    /// Heuristic: a `(...)` group directly followed by another `(` is a template parameter list.
    ///
    /// This is the only type-vs-expression disambiguation done for parenthesized groups after a declarator name.
    /// It does not consult the grammar, so `foo(a)(b)` style declarations are always read as templates.
    fn is_template_parameter_list(&self) -> bool {
        if !self.check_punct(PunctuationId::LParen) {
            return false;
        }
        let mut cursor = self.stream.lookahead();
        cursor.skip_balanced() && cursor.is_punct(PunctuationId::LParen)
    }

    /// Turn parsed parameters into detached variable nodes owned by method `id`.
    fn attach_parameters(&mut self, id: NodeId, list: ParameterList) {
        let mut parameter_ids = Vec::new();
        for (parameter, span) in list.parameters {
            let mut node = Node::new(
                NodeKind::Variable(VariableData {
                    initializer: parameter.default,
                    is_alias: false,
                    is_parameter: true,
                }),
                parameter.name.unwrap_or_default(),
                span,
            );
            node.ty = parameter.ty;
            node.attributes = parameter.storage.into_iter().map(Attribute::Keyword).collect();
            parameter_ids.push(self.tree.add_detached(id, node));
        }
        if let NodeKind::Method(data) = &mut self.tree.node_mut(id).kind {
            data.parameters = parameter_ids;
            data.is_variadic = list.variadic;
        }
    }

    /// Trailing function attributes: `const pure nothrow @safe return scope ...`
    fn function_attributes(&mut self, id: NodeId) {
        loop {
            let attribute = match &self.peek().kind {
                TokenKind::Keyword(kw)
                    if (keywords::is_type_constructor(*kw)
                        && !self.check_nth_punct(1, PunctuationId::LParen))
                        || matches!(
                            kw,
                            KeywordId::Pure
                                | KeywordId::Nothrow
                                | KeywordId::Ref
                                | KeywordId::Return
                                | KeywordId::Scope
                                | KeywordId::Override
                                | KeywordId::Final
                        ) =>
                {
                    let kw = *kw;
                    self.advance();
                    Attribute::Keyword(kw)
                }
                TokenKind::Punctuation(PunctuationId::At) if matches!(self.peek_nth(1).kind, TokenKind::Ident(_)) => {
                    self.advance();
                    let name = self.advance().ident().unwrap_or_default().to_string();
                    if self.check_punct(PunctuationId::LParen) {
                        self.skip_group();
                    }
                    Attribute::Property(name)
                }
                _ => return,
            };
            self.tree.node_mut(id).attributes.push(attribute);
        }
    }

    /// `;`, `{ ... }`, `=> expr;`, optionally preceded by `in`/`out` contracts and `do`/`body`.
    fn function_body(&mut self, id: NodeId) -> Result<(), CompileError> {
        let mut saw_contract = false;
        loop {
            if self.match_keyword(KeywordId::In) {
                saw_contract = true;
                if self.check_punct(PunctuationId::LParen) || self.check_punct(PunctuationId::LBrace) {
                    self.skip_group();
                }
                continue;
            }
            if self.match_keyword(KeywordId::Out) {
                saw_contract = true;
                if self.check_punct(PunctuationId::LParen) {
                    self.skip_group();
                }
                if self.check_punct(PunctuationId::LBrace) && self.brace_group_is_contract() {
                    self.skip_group();
                }
                continue;
            }
            break;
        }
        let explicit_body = self.match_keyword(KeywordId::Do) || self.match_keyword(KeywordId::Body);

        if self.check_punct(PunctuationId::LBrace) {
            return self.method_body(id);
        }
        if !explicit_body && self.match_punct(PunctuationId::FatArrow) {
            let expr_start = self.current_span().start;
            self.in_scope(id, |p| p.expression())?;
            let span = self.span_from(expr_start);
            let node = self.tree.node_mut(id);
            node.body = Some(span);
            node.statements.push(span);
            self.expect_punct(PunctuationId::Semicolon, "';' after function body")?;
            return Ok(());
        }
        if !explicit_body && self.match_punct(PunctuationId::Semicolon) {
            return Ok(());
        }
        if saw_contract {
            return Err(self.expected("function body after contracts"));
        }
        Err(self.expected("function body or ';'"))
    }

    /// With the cursor on `{`: is this group an `out` contract (followed by another body part)?
    fn brace_group_is_contract(&self) -> bool {
        let mut cursor = self.stream.lookahead();
        if !cursor.skip_balanced() {
            return false;
        }
        matches!(
            cursor.peek().keyword_id(),
            Some(KeywordId::Do | KeywordId::Body | KeywordId::In | KeywordId::Out)
        ) || cursor.is_punct(PunctuationId::LBrace)
    }

    /// `{ statements }` body of method `id`.
    fn method_body(&mut self, id: NodeId) -> Result<(), CompileError> {
        let open = self.expect_punct(PunctuationId::LBrace, "'{' to start function body")?;
        self.nested(|p| {
            p.in_scope(id, |p| p.statements_until_brace());
            Ok(())
        })?;
        let close = self.expect_punct(PunctuationId::RBrace, "'}' to close function body");
        let end = close.as_ref().map_or(self.previous_end(), |span| span.end);
        self.tree.node_mut(id).body = Some(Span::new(open.start, end.max(open.start)));
        close.map(|_| ())
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// `( [storage] Type [name] [= default], ... [...] )`
    ///
    /// With `untyped_names`, a lone identifier is a parameter name rather than a type (lambda parameters).
    fn parameter_list(&mut self, untyped_names: bool) -> Result<ParameterList, CompileError> {
        self.expect_punct(PunctuationId::LParen, "'(' to start parameter list")?;
        let mut list = ParameterList {
            parameters: Vec::new(),
            variadic: false,
        };
        while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
            if self.match_punct(PunctuationId::Ellipsis) {
                list.variadic = true;
                break;
            }
            let (parameter, span) = self.parameter(untyped_names)?;
            list.variadic |= parameter.variadic;
            list.parameters.push((parameter, span));
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen, "')' to close parameter list")?;
        Ok(list)
    }

    fn parameter(&mut self, untyped_names: bool) -> Result<(ParameterDecl, Span), CompileError> {
        let start = self.current_span().start;
        let mut parameter = ParameterDecl::default();
        loop {
            match self.peek().keyword_id() {
                Some(id)
                    if keywords::is_parameter_storage_class(id)
                        && !(keywords::is_type_constructor(id) && self.check_nth_punct(1, PunctuationId::LParen)) =>
                {
                    parameter.storage.push(id);
                    self.advance();
                }
                Some(KeywordId::Return) => {
                    parameter.storage.push(KeywordId::Return);
                    self.advance();
                }
                _ => break,
            }
            if self.check_punct(PunctuationId::At) {
                self.attribute()?;
            }
        }
        while self.check_punct(PunctuationId::At) {
            self.attribute()?;
        }

        let lone_name = self.check_ident()
            && (self.check_nth_punct(1, PunctuationId::Comma)
                || self.check_nth_punct(1, PunctuationId::RParen)
                || self.check_nth_op(1, OperatorId::Eq));
        if untyped_names && lone_name {
            parameter.name = Some(self.identifier()?);
        } else {
            let ty = self.parse_type()?;
            if self.check_ident() {
                parameter.name = Some(self.identifier()?);
                parameter.ty = Some(self.declarator_suffixes(ty)?);
            } else {
                parameter.ty = Some(ty);
            }
        }
        if self.match_op(OperatorId::Eq) {
            parameter.default = Some(self.assign_expression()?);
        }
        if self.match_punct(PunctuationId::Ellipsis) {
            parameter.variadic = true;
        }
        Ok((parameter, self.span_from(start)))
    }

    // ========================================================================
    // Template parameters
    // ========================================================================

    /// `(T, U : Spec = Default, int N = 3, alias A, Ts..., this This)`; nodes are attached to `owner`.
    fn template_parameters(&mut self, owner: NodeId) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'(' to start template parameters")?;
        while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
            let start = self.current_span().start;
            let (kind, name, name_span, ty) = self.template_parameter()?;
            let mut node = new_node(NodeKind::TemplateParameter(kind), name, name_span, start, Vec::new());
            node.ty = ty;
            node.span = self.span_from(start);
            let id = self.tree.add_detached(owner, node);
            self.tree.node_mut(owner).template_parameters.push(id);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen, "')' to close template parameters")?;
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn template_parameter(
        &mut self,
    ) -> Result<(TemplateParameterKind, Ident, Span, Option<TypeDecl>), CompileError> {
        if self.match_keyword(KeywordId::Alias) {
            let (name, span) = self.identifier_spanned()?;
            let (specialization, default) = self.type_specialization_and_default()?;
            return Ok((TemplateParameterKind::Alias { specialization, default }, name, span, None));
        }
        if self.check_keyword(KeywordId::This) && self.check_nth_ident(1) {
            self.advance();
            let (name, span) = self.identifier_spanned()?;
            let (specialization, default) = self.type_specialization_and_default()?;
            return Ok((TemplateParameterKind::This { specialization, default }, name, span, None));
        }
        if self.check_ident() && self.check_nth_punct(1, PunctuationId::Ellipsis) {
            let (name, span) = self.identifier_spanned()?;
            self.advance();
            return Ok((TemplateParameterKind::Tuple, name, span, None));
        }
        let is_type_parameter = self.check_ident()
            && (self.check_nth_punct(1, PunctuationId::Comma)
                || self.check_nth_punct(1, PunctuationId::RParen)
                || self.check_nth_punct(1, PunctuationId::Colon)
                || self.check_nth_op(1, OperatorId::Eq));
        if is_type_parameter {
            let (name, span) = self.identifier_spanned()?;
            let (specialization, default) = self.type_specialization_and_default()?;
            return Ok((TemplateParameterKind::Type { specialization, default }, name, span, None));
        }

        let ty = self.parse_type()?;
        let (name, span) = self.identifier_spanned()?;
        let specialization = if self.match_punct(PunctuationId::Colon) {
            Some(self.conditional_expression()?)
        } else {
            None
        };
        let default = if self.match_op(OperatorId::Eq) {
            Some(self.assign_expression()?)
        } else {
            None
        };
        Ok((TemplateParameterKind::Value { specialization, default }, name, span, Some(ty)))
    }

    fn type_specialization_and_default(&mut self) -> Result<(Option<TypeDecl>, Option<TypeDecl>), CompileError> {
        let specialization = if self.match_punct(PunctuationId::Colon) {
            Some(self.type_or_expression_decl()?)
        } else {
            None
        };
        let default = if self.match_op(OperatorId::Eq) {
            Some(self.type_or_expression_decl()?)
        } else {
            None
        };
        Ok((specialization, default))
    }

    /// Set the node's span to end at the last consumed token.
    fn finish(&mut self, id: NodeId, start: usize) {
        let span = self.span_from(start);
        self.tree.node_mut(id).span = span;
    }
}

/// Drop the spans of a parsed parameter list, for function types.
fn parameter_decls(list: ParameterList) -> Vec<ParameterDecl> {
    let mut parameters: Vec<ParameterDecl> = list.parameters.into_iter().map(|(p, _)| p).collect();
    if list.variadic && !parameters.last().is_some_and(|p| p.variadic) {
        parameters.push(ParameterDecl {
            variadic: true,
            ..ParameterDecl::default()
        });
    }
    parameters
}
