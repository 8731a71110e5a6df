/// Type parsing.
///
/// Types are built bottom-up: a basic part (builtin keyword, identifier chain,
/// `typeof(...)`, type constructor) followed by any number of suffixes. Each suffix
/// wraps the type parsed so far, so the last suffix ends up outermost:
/// `int[3][]` is a dynamic array of `int[3]`.
///
/// ## Notes
/// - `T[ident]` is read as an associative array keyed by `ident`; whether `ident` is really a constant cannot be
///   decided without semantic analysis.
impl<'a> Parser<'a> {
    // ========================================================================
    // Types
    // ========================================================================

    /// Parse a full type: basic part plus `*`, `[...]`, `function(...)`, `delegate(...)` suffixes.
    fn parse_type(&mut self) -> Result<TypeDecl, CompileError> {
        self.nested(|p| {
            let base = p.basic_type()?;
            p.type_suffixes(base)
        })
    }

    fn basic_type(&mut self) -> Result<TypeDecl, CompileError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Keyword(id) if keywords::is_type_constructor(*id) => {
                let modifier = *id;
                self.advance();
                let base = if self.match_punct(PunctuationId::LParen) {
                    let inner = self.parse_type()?;
                    self.expect_punct(PunctuationId::RParen, "')' after type constructor argument")?;
                    inner
                } else {
                    self.parse_type()?
                };
                self.check_type_depth(TypeDecl::Modified {
                    modifier,
                    base: Box::new(base),
                })
            }
            TokenKind::Keyword(id) if keywords::is_basic_type(*id) => {
                let id = *id;
                self.advance();
                Ok(TypeDecl::Basic(id))
            }
            TokenKind::Keyword(KeywordId::Typeof) => {
                self.advance();
                self.expect_punct(PunctuationId::LParen, "'(' after 'typeof'")?;
                let arg = if self.match_keyword(KeywordId::Return) {
                    TypeofArg::Return
                } else {
                    TypeofArg::Expr(self.expression()?)
                };
                self.expect_punct(PunctuationId::RParen, "')' after typeof argument")?;
                self.qualified_rest(TypeDecl::Typeof(arg))
            }
            TokenKind::Keyword(KeywordId::Vector) => {
                let start = self.advance().span.start;
                if self.check_punct(PunctuationId::LParen) {
                    self.skip_group();
                }
                Err(self.unimplemented("__vector type", self.span_from(start)))
            }
            TokenKind::Punctuation(PunctuationId::Dot) => {
                self.advance();
                let inner = self.identifier_chain()?;
                Ok(TypeDecl::ModuleScope(Box::new(inner)))
            }
            TokenKind::Ident(_) => self.identifier_chain(),
            _ => Err(self.expected("type")),
        }
    }

    /// `a.b!(T).c`
    fn identifier_chain(&mut self) -> Result<TypeDecl, CompileError> {
        let first = self.identifier_or_template_instance()?;
        self.qualified_rest(first)
    }

    /// Continue a qualified chain `.member...` after `ty`, if one follows.
    fn qualified_rest(&mut self, mut ty: TypeDecl) -> Result<TypeDecl, CompileError> {
        while self.check_punct(PunctuationId::Dot) && self.check_nth_ident(1) {
            self.advance();
            let member = self.identifier_or_template_instance()?;
            ty = self.check_type_depth(TypeDecl::qualified(ty, member))?;
        }
        Ok(ty)
    }

    fn identifier_or_template_instance(&mut self) -> Result<TypeDecl, CompileError> {
        let name = self.identifier()?;
        if self.is_template_instance_bang() {
            self.advance();
            let args = self.template_arguments()?;
            return Ok(TypeDecl::TemplateInstance { name, args });
        }
        Ok(TypeDecl::Identifier(name))
    }

    /// With the current token on `!` after an identifier: does it start template arguments?
    ///
    /// `a!b`, `a!(b)`, `a!'c'`, `a!int` instantiate; `a !is b` and `a !in b` compare.
    fn is_template_instance_bang(&self) -> bool {
        if !self.check_op(OperatorId::Bang) {
            return false;
        }
        let next = &self.peek_nth(1).kind;
        match next {
            TokenKind::Keyword(KeywordId::Is | KeywordId::In) => false,
            TokenKind::Ident(_) | TokenKind::Punctuation(PunctuationId::LParen) => true,
            kind if kind.is_literal() => true,
            TokenKind::Keyword(id) => {
                keywords::is_basic_type(*id) || keywords::category(*id) == KeywordCategory::Literal
            }
            _ => false,
        }
    }

    /// `!(args)` or `!arg`; the `!` has been consumed.
    fn template_arguments(&mut self) -> Result<Vec<TypeOrExpr>, CompileError> {
        if self.match_punct(PunctuationId::LParen) {
            let mut args = Vec::new();
            while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
                args.push(self.type_or_expression()?);
                if !self.match_punct(PunctuationId::Comma) {
                    break;
                }
            }
            self.expect_punct(PunctuationId::RParen, "')' to close template arguments")?;
            return Ok(args);
        }

        // Single-token argument: `a!b.c` is `(a!b).c`.
        let token = self.peek();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(vec![TypeOrExpr::Type(TypeDecl::Identifier(name.clone()))])
            }
            TokenKind::Keyword(id) if keywords::is_basic_type(*id) => {
                self.advance();
                Ok(vec![TypeOrExpr::Type(TypeDecl::Basic(*id))])
            }
            _ => Ok(vec![TypeOrExpr::Expr(self.primary_expression()?)]),
        }
    }

    /// A template/trait argument: a type if the tokens read as one up to `,`, `)` or `=`, else an expression.
    fn type_or_expression(&mut self) -> Result<TypeOrExpr, CompileError> {
        let mut cursor = self.stream.lookahead();
        let is_type = cursor.skip_type()
            && (cursor.is_punct(PunctuationId::Comma)
                || cursor.is_punct(PunctuationId::RParen)
                || cursor.peek().kind.is_operator(OperatorId::Eq));
        if is_type {
            return Ok(TypeOrExpr::Type(self.parse_type()?));
        }
        Ok(TypeOrExpr::Expr(self.assign_expression()?))
    }

    /// [`Parser::type_or_expression`], with expressions wrapped as expression-derived declarations.
    fn type_or_expression_decl(&mut self) -> Result<TypeDecl, CompileError> {
        Ok(match self.type_or_expression()? {
            TypeOrExpr::Type(ty) => ty,
            TypeOrExpr::Expr(expr) => TypeDecl::Expression { expr, inner: None },
        })
    }

    fn type_suffixes(&mut self, mut ty: TypeDecl) -> Result<TypeDecl, CompileError> {
        loop {
            if self.match_op(OperatorId::Star) {
                ty = self.check_type_depth(TypeDecl::pointer(ty))?;
                continue;
            }
            if self.check_punct(PunctuationId::LBracket) {
                let array = self.array_suffix(ty)?;
                ty = self.check_type_depth(array)?;
                continue;
            }
            if self.check_keyword(KeywordId::Function) || self.check_keyword(KeywordId::Delegate) {
                let is_function = self.check_keyword(KeywordId::Function);
                self.advance();
                let list = self.parameter_list(false)?;
                self.skip_function_type_attributes();
                ty = self.check_type_depth(TypeDecl::Delegate {
                    return_type: Box::new(ty),
                    parameters: parameter_decls(list),
                    is_function,
                })?;
                continue;
            }
            return Ok(ty);
        }
    }

    /// `[]`, `[N]`, `[Key]`, `[a..b]` wrapping `base`.
    fn array_suffix(&mut self, base: TypeDecl) -> Result<TypeDecl, CompileError> {
        self.expect_punct(PunctuationId::LBracket, "'['")?;
        let base = Some(Box::new(base));
        if self.match_punct(PunctuationId::RBracket) {
            return Ok(TypeDecl::Array {
                base,
                key: ArrayKey::Dynamic,
            });
        }

        let mut cursor = self.stream.lookahead();
        let holds_type = cursor.skip_type() && cursor.is_punct(PunctuationId::RBracket);
        let key = if holds_type {
            ArrayKey::Assoc(Box::new(self.parse_type()?))
        } else {
            let first = self.assign_expression()?;
            if self.match_punct(PunctuationId::DotDot) {
                ArrayKey::Slice(first, self.assign_expression()?)
            } else {
                ArrayKey::Static(first)
            }
        };
        self.expect_punct(PunctuationId::RBracket, "']' to close array suffix")?;
        Ok(TypeDecl::Array { base, key })
    }

    /// C-style array suffixes after a declarator name: `int x[3][4];`
    fn declarator_suffixes(&mut self, mut ty: TypeDecl) -> Result<TypeDecl, CompileError> {
        while self.check_punct(PunctuationId::LBracket) {
            let array = self.array_suffix(ty)?;
            ty = self.check_type_depth(array)?;
        }
        Ok(ty)
    }

    /// Reject `ty` once its wrapper chain is longer than [`MAX_TYPE_DEPTH`].
    fn check_type_depth(&self, ty: TypeDecl) -> Result<TypeDecl, CompileError> {
        if ty.depth() > MAX_TYPE_DEPTH {
            return Err(CompileError::syntax("Type is nested too deeply", self.current_span()));
        }
        Ok(ty)
    }

    /// `nothrow @safe pure` and friends after a function type's parameter list.
    fn skip_function_type_attributes(&mut self) {
        loop {
            match self.peek().keyword_id() {
                Some(KeywordId::Pure | KeywordId::Nothrow | KeywordId::Ref | KeywordId::Scope | KeywordId::Return) => {
                    self.advance();
                }
                Some(id) if keywords::is_type_constructor(id) && !self.check_nth_punct(1, PunctuationId::LParen) => {
                    self.advance();
                }
                _ if self.check_punct(PunctuationId::At) && self.check_nth_ident(1) => {
                    self.advance();
                    self.advance();
                }
                _ => return,
            }
        }
    }
}

impl<'a> Lookahead<'a> {
    /// Speculatively skip a type; `false` if the tokens cannot start one.
    fn skip_type(&mut self) -> bool {
        // Prefix qualifiers: `const shared int`.
        while self.peek().keyword_id().is_some_and(keywords::is_type_constructor)
            && !self.peek_nth(1).kind.is_punctuation(PunctuationId::LParen)
        {
            self.bump();
        }
        match &self.peek().kind {
            TokenKind::Keyword(id) if keywords::is_type_constructor(*id) => {
                self.bump();
                if !self.skip_balanced() {
                    return false;
                }
            }
            TokenKind::Keyword(id) if keywords::is_basic_type(*id) => {
                self.bump();
            }
            TokenKind::Keyword(KeywordId::Typeof) => {
                self.bump();
                if !self.is_punct(PunctuationId::LParen) || !self.skip_balanced() {
                    return false;
                }
                if self.is_punct(PunctuationId::Dot) && !self.eat_identifier_chain_after_dot() {
                    return false;
                }
            }
            TokenKind::Punctuation(PunctuationId::Dot) => {
                self.bump();
                if !self.skip_identifier_chain() {
                    return false;
                }
            }
            TokenKind::Ident(_) => {
                if !self.skip_identifier_chain() {
                    return false;
                }
            }
            _ => return false,
        }

        loop {
            let kind = &self.peek().kind;
            if kind.is_operator(OperatorId::Star) {
                self.bump();
            } else if kind.is_punctuation(PunctuationId::LBracket) {
                if !self.skip_balanced() {
                    return false;
                }
            } else if kind.is_keyword(KeywordId::Function) || kind.is_keyword(KeywordId::Delegate) {
                self.bump();
                if !self.is_punct(PunctuationId::LParen) || !self.skip_balanced() {
                    return false;
                }
                while matches!(
                    self.peek().keyword_id(),
                    Some(KeywordId::Pure | KeywordId::Nothrow | KeywordId::Const | KeywordId::Immutable)
                ) {
                    self.bump();
                }
            } else {
                return true;
            }
        }
    }

    /// `a!(b).c!d.e`
    fn skip_identifier_chain(&mut self) -> bool {
        loop {
            if !matches!(self.peek().kind, TokenKind::Ident(_)) {
                return false;
            }
            self.bump();
            if self.peek().kind.is_operator(OperatorId::Bang)
                && !matches!(
                    self.peek_nth(1).kind,
                    TokenKind::Keyword(KeywordId::Is | KeywordId::In)
                )
            {
                self.bump();
                if self.is_punct(PunctuationId::LParen) {
                    if !self.skip_balanced() {
                        return false;
                    }
                } else {
                    self.bump();
                }
            }
            if !(self.is_punct(PunctuationId::Dot) && matches!(self.peek_nth(1).kind, TokenKind::Ident(_))) {
                return true;
            }
            self.bump();
        }
    }

    fn eat_identifier_chain_after_dot(&mut self) -> bool {
        self.eat_punct(PunctuationId::Dot) && self.skip_identifier_chain()
    }
}
