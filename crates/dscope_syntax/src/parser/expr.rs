/// Expression parsing methods.
///
/// This chunk implements the expression grammar using a precedence ladder:
/// comma → assign → conditional → `||` → `&&` → `|` → `^` → `&` → comparison → shift → additive →
/// multiplicative → unary → power → postfix → primary.
///
/// ## Notes
/// - Every parsed expression is allocated in the tree's expression arena; operands are allocated first.
/// - Function literals and lambdas add a `Method` node (kind `Literal`) to the current scope.
/// - `^^` binds tighter than prefix operators: `-2^^2` is `-(2^^2)`.
impl<'a> Parser<'a> {
    // ========================================================================
    // Expressions
    // ========================================================================

    fn make_expr(&mut self, expr: Expr, start: usize) -> ExprId {
        let height = expr
            .operands()
            .into_iter()
            .filter_map(|operand| self.heights.get(operand).copied())
            .max()
            .map_or(1, |tallest| tallest + 1);
        let span = self.span_from(start);
        let id = self.tree.alloc_expr(expr, span);
        self.heights.insert(id, height);
        id
    }

    /// Reject `expr` once it is taller than [`MAX_EXPR_HEIGHT`].
    fn check_height(&self, expr: ExprId) -> Result<ExprId, CompileError> {
        match self.heights.get(expr) {
            Some(&height) if height > MAX_EXPR_HEIGHT => Err(CompileError::syntax(
                "Expression is nested too deeply",
                self.current_span(),
            )),
            _ => Ok(expr),
        }
    }

    /// `a, b, c`
    fn expression(&mut self) -> Result<ExprId, CompileError> {
        self.nested(|p| {
            let start = p.current_span().start;
            let first = p.assign_expression()?;
            if !p.check_punct(PunctuationId::Comma) {
                return Ok(first);
            }
            let mut items = vec![first];
            while p.match_punct(PunctuationId::Comma) {
                items.push(p.assign_expression()?);
            }
            Ok(p.make_expr(Expr::Comma(items), start))
        })
    }

    /// `a = b`, `a ~= b`, ... (right associative)
    fn assign_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let left = self.conditional_expression()?;
        match self.peek().operator_id() {
            Some(op) if operators::is_assignment(op) => {
                self.advance();
                let right = self.nested(|p| p.assign_expression())?;
                Ok(self.make_expr(Expr::Assign { op, left, right }, start))
            }
            _ => Ok(left),
        }
    }

    /// `cond ? a : b`
    fn conditional_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let condition = self.oror_expression()?;
        if !self.match_punct(PunctuationId::Question) {
            return Ok(condition);
        }
        let if_true = self.expression()?;
        self.expect_punct(PunctuationId::Colon, "':' in conditional expression")?;
        let if_false = self.nested(|p| p.conditional_expression())?;
        Ok(self.make_expr(
            Expr::Conditional {
                condition,
                if_true,
                if_false,
            },
            start,
        ))
    }

    /// Left-associative level over the given operators.
    fn binary_level(
        &mut self,
        ops: &[OperatorId],
        operand: fn(&mut Self) -> Result<ExprId, CompileError>,
    ) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let mut left = operand(self)?;
        while let Some(op) = self
            .peek()
            .operator_id()
            .filter(|id| ops.contains(id))
            .and_then(BinaryOp::from_operator)
        {
            self.advance();
            let right = operand(self)?;
            let expr = self.make_expr(Expr::Binary { op, left, right }, start);
            left = self.check_height(expr)?;
        }
        Ok(left)
    }

    fn oror_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(&[OperatorId::PipePipe], Self::andand_expression)
    }

    fn andand_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(&[OperatorId::AmpAmp], Self::or_expression)
    }

    fn or_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(&[OperatorId::Pipe], Self::xor_expression)
    }

    fn xor_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(&[OperatorId::Caret], Self::and_expression)
    }

    fn and_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(&[OperatorId::Amp], Self::comparison)
    }

    /// `==`, `!=`, `<`, `<=`, `>`, `>=`, `is`, `!is`, `in`, `!in`
    fn comparison(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let mut left = self.shift_expression()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Operator(id) => match id {
                    OperatorId::EqEq => BinaryOp::Eq,
                    OperatorId::NotEq => BinaryOp::NotEq,
                    OperatorId::Lt => BinaryOp::Lt,
                    OperatorId::LtEq => BinaryOp::LtEq,
                    OperatorId::Gt => BinaryOp::Gt,
                    OperatorId::GtEq => BinaryOp::GtEq,
                    OperatorId::Bang if self.check_nth_keyword(1, KeywordId::Is) => {
                        self.advance();
                        BinaryOp::NotIs
                    }
                    OperatorId::Bang if self.check_nth_keyword(1, KeywordId::In) => {
                        self.advance();
                        BinaryOp::NotIn
                    }
                    _ => break,
                },
                TokenKind::Keyword(KeywordId::Is) => BinaryOp::Is,
                TokenKind::Keyword(KeywordId::In) => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.shift_expression()?;
            let expr = self.make_expr(Expr::Binary { op, left, right }, start);
            left = self.check_height(expr)?;
        }
        Ok(left)
    }

    fn shift_expression(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(
            &[OperatorId::Shl, OperatorId::Shr, OperatorId::UShr],
            Self::additive,
        )
    }

    /// `+`, `-`, `~`
    fn additive(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(
            &[OperatorId::Plus, OperatorId::Minus, OperatorId::Tilde],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<ExprId, CompileError> {
        self.binary_level(
            &[OperatorId::Star, OperatorId::Slash, OperatorId::Percent],
            Self::unary_expression,
        )
    }

    // ========================================================================
    // Unary
    // ========================================================================

    fn unary_expression(&mut self) -> Result<ExprId, CompileError> {
        self.nested(|p| p.unary_inner())
    }

    fn unary_inner(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let prefix = match &self.peek().kind {
            TokenKind::Operator(id) => match id {
                OperatorId::Amp => Some(UnaryOp::AddressOf),
                OperatorId::Star => Some(UnaryOp::Deref),
                OperatorId::PlusPlus => Some(UnaryOp::PreIncrement),
                OperatorId::MinusMinus => Some(UnaryOp::PreDecrement),
                OperatorId::Minus => Some(UnaryOp::Negate),
                OperatorId::Plus => Some(UnaryOp::Plus),
                OperatorId::Bang => Some(UnaryOp::Not),
                OperatorId::Tilde => Some(UnaryOp::Complement),
                _ => None,
            },
            TokenKind::Keyword(KeywordId::Delete) => Some(UnaryOp::Delete),
            TokenKind::Keyword(KeywordId::Cast) => return self.cast_expression(),
            TokenKind::Keyword(KeywordId::New) => return self.new_expression(),
            _ => None,
        };
        if let Some(op) = prefix {
            self.advance();
            let operand = self.unary_expression()?;
            return Ok(self.make_expr(Expr::Unary { op, operand }, start));
        }
        self.power_expression()
    }

    /// `postfix ^^ unary`
    fn power_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let left = self.postfix_expression()?;
        if !self.match_op(OperatorId::CaretCaret) {
            return Ok(left);
        }
        let right = self.unary_expression()?;
        Ok(self.make_expr(
            Expr::Binary {
                op: BinaryOp::Pow,
                left,
                right,
            },
            start,
        ))
    }

    /// `cast(Type) e`, `cast() e`, `cast(const shared) e`
    fn cast_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.advance().span.start;
        self.expect_punct(PunctuationId::LParen, "'(' after 'cast'")?;

        let mut cursor = self.stream.lookahead();
        while cursor.peek().keyword_id().is_some_and(keywords::is_type_constructor) {
            cursor.bump();
        }
        let qualifiers_only = cursor.is_punct(PunctuationId::RParen);

        let mut qualifiers = Vec::new();
        let mut target = None;
        if qualifiers_only {
            while let Some(id) = self.peek().keyword_id() {
                if !keywords::is_type_constructor(id) {
                    break;
                }
                qualifiers.push(id);
                self.advance();
            }
        } else {
            target = Some(self.parse_type()?);
        }
        self.expect_punct(PunctuationId::RParen, "')' after cast type")?;
        let operand = self.unary_expression()?;
        Ok(self.make_expr(
            Expr::Cast {
                target,
                qualifiers,
                operand,
            },
            start,
        ))
    }

    /// `new (alloc args) Type (args)` or `new class (args) Base { body }`
    fn new_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.expect_keyword(KeywordId::New, "'new'")?.start;
        let new_args = if self.check_punct(PunctuationId::LParen) {
            self.arguments()?
        } else {
            Vec::new()
        };

        if self.check_keyword(KeywordId::Class) {
            return self.anonymous_class(start, new_args);
        }

        let ty = self.parse_type()?;
        let args = if self.check_punct(PunctuationId::LParen) {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(self.make_expr(Expr::New { new_args, ty, args }, start))
    }

    fn anonymous_class(&mut self, start: usize, new_args: Vec<ExprId>) -> Result<ExprId, CompileError> {
        let class_start = self.advance().span.start;
        let args = if self.check_punct(PunctuationId::LParen) {
            self.arguments()?
        } else {
            Vec::new()
        };
        let base_classes = if self.check_punct(PunctuationId::LBrace) {
            Vec::new()
        } else {
            self.base_class_list()?
        };
        let node = Node::new(
            NodeKind::ClassLike(ClassLikeData {
                kind: ClassKind::Class,
                base_classes,
            }),
            String::new(),
            Span::new(class_start, class_start),
        );
        let class = self.tree.add_child(self.scope, node);
        let result = self.declaration_block(class);
        self.finish(class, class_start);
        result?;
        Ok(self.make_expr(Expr::AnonymousClass { new_args, args, class }, start))
    }

    // ========================================================================
    // Postfix
    // ========================================================================

    fn postfix_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let mut expr = self.primary_expression()?;
        loop {
            expr = if self.check_punct(PunctuationId::Dot) {
                self.advance();
                let member = if self.check_keyword(KeywordId::New) {
                    Member::New(self.new_expression()?)
                } else {
                    Member::Name(self.identifier_or_template_instance()?)
                };
                self.make_expr(Expr::Access { base: expr, member }, start)
            } else if self.match_op(OperatorId::PlusPlus) {
                self.make_expr(Expr::PostIncrement(expr), start)
            } else if self.match_op(OperatorId::MinusMinus) {
                self.make_expr(Expr::PostDecrement(expr), start)
            } else if self.check_punct(PunctuationId::LParen) {
                let args = self.arguments()?;
                self.make_expr(Expr::Call { callee: expr, args }, start)
            } else if self.check_punct(PunctuationId::LBracket) {
                self.index_or_slice(expr, start)?
            } else {
                return Ok(expr);
            };
            self.check_height(expr)?;
        }
    }

    /// `(a, b, c)`
    fn arguments(&mut self) -> Result<Vec<ExprId>, CompileError> {
        self.expect_punct(PunctuationId::LParen, "'('")?;
        let mut args = Vec::new();
        while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
            args.push(self.assign_expression()?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RParen, "')' to close argument list")?;
        Ok(args)
    }

    /// `base[]`, `base[a .. b]`, `base[i, j]`
    fn index_or_slice(&mut self, base: ExprId, start: usize) -> Result<ExprId, CompileError> {
        self.expect_punct(PunctuationId::LBracket, "'['")?;
        if self.match_punct(PunctuationId::RBracket) {
            return Ok(self.make_expr(Expr::Slice { base, range: None }, start));
        }
        let first = self.assign_expression()?;
        if self.match_punct(PunctuationId::DotDot) {
            let to = self.assign_expression()?;
            self.expect_punct(PunctuationId::RBracket, "']' to close slice")?;
            return Ok(self.make_expr(
                Expr::Slice {
                    base,
                    range: Some((first, to)),
                },
                start,
            ));
        }
        let mut args = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBracket) {
                break;
            }
            args.push(self.assign_expression()?);
        }
        self.expect_punct(PunctuationId::RBracket, "']' to close index")?;
        Ok(self.make_expr(Expr::Index { base, args }, start))
    }

    // ========================================================================
    // Primary
    // ========================================================================

    fn primary_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let token = self.peek();
        match &token.kind {
            TokenKind::Ident(_) if self.check_nth_punct(1, PunctuationId::FatArrow) => self.single_parameter_lambda(),
            TokenKind::Ident(_) => {
                let expr = match self.identifier_or_template_instance()? {
                    TypeDecl::Identifier(name) => Expr::Identifier(name),
                    instance => Expr::TypeDeclaration(instance),
                };
                Ok(self.make_expr(expr, start))
            }
            TokenKind::Punctuation(PunctuationId::Dot) if self.check_nth_ident(1) => {
                self.advance();
                let inner = self.identifier_or_template_instance()?;
                Ok(self.make_expr(Expr::TypeDeclaration(TypeDecl::ModuleScope(Box::new(inner))), start))
            }
            TokenKind::Int(value) => {
                self.advance();
                Ok(self.make_expr(Expr::Literal(Literal::Int(*value)), start))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(self.make_expr(Expr::Literal(Literal::Float(*value)), start))
            }
            TokenKind::Char(value) => {
                self.advance();
                Ok(self.make_expr(Expr::Literal(Literal::Char(*value)), start))
            }
            TokenKind::String(_) => {
                // Adjacent string literals concatenate: "a" "b"
                let mut text = String::new();
                while let TokenKind::String(part) = &self.peek().kind {
                    text.push_str(part);
                    self.advance();
                }
                Ok(self.make_expr(Expr::Literal(Literal::String(text)), start))
            }
            TokenKind::Punctuation(PunctuationId::Dollar) => {
                self.advance();
                Ok(self.make_expr(Expr::Dollar, start))
            }
            TokenKind::Punctuation(PunctuationId::LParen) => self.paren_expression(),
            TokenKind::Punctuation(PunctuationId::LBracket) => self.array_literal(),
            TokenKind::Punctuation(PunctuationId::LBrace) => self.function_literal(None),
            TokenKind::Keyword(id) => self.keyword_primary(*id, start),
            _ => Err(self.expected("expression")),
        }
    }

    fn keyword_primary(&mut self, id: KeywordId, start: usize) -> Result<ExprId, CompileError> {
        match id {
            KeywordId::This | KeywordId::Super => {
                self.advance();
                Ok(self.make_expr(Expr::Token(id), start))
            }
            _ if keywords::category(id) == KeywordCategory::Literal => {
                self.advance();
                Ok(self.make_expr(Expr::Token(id), start))
            }
            _ if keywords::is_basic_type(id) => {
                self.advance();
                Ok(self.make_expr(Expr::TypeDeclaration(TypeDecl::Basic(id)), start))
            }
            KeywordId::Typeof | KeywordId::Vector => {
                let ty = self.basic_type()?;
                Ok(self.make_expr(Expr::TypeDeclaration(ty), start))
            }
            _ if keywords::is_type_constructor(id) && self.check_nth_punct(1, PunctuationId::LParen) => {
                let ty = self.basic_type()?;
                Ok(self.make_expr(Expr::TypeDeclaration(ty), start))
            }
            KeywordId::Function | KeywordId::Delegate => {
                self.advance();
                self.function_literal(Some(id))
            }
            KeywordId::Assert => {
                self.advance();
                let args = self.arguments()?;
                Ok(self.make_expr(Expr::Assert(args), start))
            }
            KeywordId::Mixin | KeywordId::Import => {
                self.advance();
                self.expect_punct(PunctuationId::LParen, "'('")?;
                let inner = self.assign_expression()?;
                self.match_punct(PunctuationId::Comma);
                self.expect_punct(PunctuationId::RParen, "')'")?;
                let expr = if id == KeywordId::Mixin {
                    Expr::Mixin(inner)
                } else {
                    Expr::Import(inner)
                };
                Ok(self.make_expr(expr, start))
            }
            KeywordId::Typeid => {
                self.advance();
                self.expect_punct(PunctuationId::LParen, "'(' after 'typeid'")?;
                let arg = self.type_or_expression()?;
                self.expect_punct(PunctuationId::RParen, "')' after typeid argument")?;
                Ok(self.make_expr(Expr::Typeid(arg), start))
            }
            KeywordId::Is => self.is_expression(),
            KeywordId::Traits => self.traits_expression(),
            KeywordId::New => self.new_expression(),
            KeywordId::Cast => self.cast_expression(),
            _ => Err(self.expected("expression")),
        }
    }

    /// `(expr)`, `(Type).member`, or a parenthesized lambda/delegate literal.
    fn paren_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;

        let mut cursor = self.stream.lookahead();
        if cursor.skip_balanced() && (cursor.is_punct(PunctuationId::FatArrow) || cursor.is_punct(PunctuationId::LBrace)) {
            return self.function_literal(None);
        }

        if self.is_type_access() {
            self.advance();
            let ty = self.parse_type()?;
            self.expect_punct(PunctuationId::RParen, "')'")?;
            self.expect_punct(PunctuationId::Dot, "'.' after parenthesized type")?;
            let member = self.identifier()?;
            return Ok(self.make_expr(Expr::TypeAccess { ty, member }, start));
        }

        self.advance();
        let inner = self.expression()?;
        self.expect_punct(PunctuationId::RParen, "')' to close parenthesized expression")?;
        Ok(self.make_expr(Expr::Paren(inner), start))
    }

    /// `(int).max`, `(const(char)[]).init`: a type that is not a plain identifier chain, then `.name`.
    fn is_type_access(&self) -> bool {
        let first = self.peek_nth(1);
        let starts_with_type_keyword = first
            .keyword_id()
            .is_some_and(|id| keywords::is_basic_type(id) || keywords::is_type_constructor(id));
        if !starts_with_type_keyword {
            return false;
        }
        let mut cursor = self.stream.lookahead();
        cursor.bump();
        cursor.skip_type()
            && cursor.eat_punct(PunctuationId::RParen)
            && cursor.eat_punct(PunctuationId::Dot)
            && matches!(cursor.peek().kind, TokenKind::Ident(_))
    }

    /// `[a, b]` or `[k: v, ...]`
    fn array_literal(&mut self) -> Result<ExprId, CompileError> {
        let start = self.expect_punct(PunctuationId::LBracket, "'['")?.start;
        if self.match_punct(PunctuationId::RBracket) {
            return Ok(self.make_expr(Expr::ArrayLiteral(Vec::new()), start));
        }

        let first = self.assign_expression()?;
        if self.match_punct(PunctuationId::Colon) {
            let value = self.assign_expression()?;
            let mut pairs = vec![(first, value)];
            while self.match_punct(PunctuationId::Comma) {
                if self.check_punct(PunctuationId::RBracket) {
                    break;
                }
                let key = self.assign_expression()?;
                self.expect_punct(PunctuationId::Colon, "':' in associative array literal")?;
                let value = self.assign_expression()?;
                pairs.push((key, value));
            }
            self.expect_punct(PunctuationId::RBracket, "']' to close array literal")?;
            return Ok(self.make_expr(Expr::AssocArrayLiteral(pairs), start));
        }

        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RBracket) {
                break;
            }
            items.push(self.assign_expression()?);
        }
        self.expect_punct(PunctuationId::RBracket, "']' to close array literal")?;
        Ok(self.make_expr(Expr::ArrayLiteral(items), start))
    }

    // ========================================================================
    // Function literals
    // ========================================================================

    /// Add an anonymous literal method to the current scope.
    fn literal_method(&mut self, start: usize) -> NodeId {
        let node = Node::new(method_kind(MethodKind::Literal), String::new(), Span::new(start, start));
        self.tree.add_child(self.scope, node)
    }

    /// `x => expr`
    fn single_parameter_lambda(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        let (name, span) = self.identifier_spanned()?;
        let id = self.literal_method(start);
        let list = ParameterList {
            parameters: vec![(
                ParameterDecl {
                    name: Some(name),
                    ..ParameterDecl::default()
                },
                span,
            )],
            variadic: false,
        };
        self.attach_parameters(id, list);
        let result = self.literal_body(id);
        self.finish(id, start);
        let body = result?;
        Ok(self.make_expr(
            Expr::FunctionLiteral {
                token: None,
                method: id,
                body,
            },
            start,
        ))
    }

    /// `function [Type] [(params)] body`, `delegate ...`, `(params) => e`, `(params) { }`, `{ }`
    ///
    /// With a `token`, the keyword has been consumed.
    fn function_literal(&mut self, token: Option<KeywordId>) -> Result<ExprId, CompileError> {
        let start = if token.is_some() {
            self.stream.previous().span.start
        } else {
            self.current_span().start
        };
        let id = self.literal_method(start);
        let result = self.function_literal_rest(id, token.is_some());
        self.finish(id, start);
        let body = result?;
        Ok(self.make_expr(Expr::FunctionLiteral { token, method: id, body }, start))
    }

    fn function_literal_rest(&mut self, id: NodeId, has_keyword: bool) -> Result<Option<ExprId>, CompileError> {
        if has_keyword && !self.check_punct(PunctuationId::LParen) && !self.check_punct(PunctuationId::LBrace) {
            let ty = self.parse_type()?;
            self.tree.node_mut(id).ty = Some(ty);
        }
        if self.check_punct(PunctuationId::LParen) {
            let list = self.parameter_list(true)?;
            self.attach_parameters(id, list);
        }
        self.function_attributes(id);
        self.literal_body(id)
    }

    /// `=> assign_expression` or `{ statements }`; returns the expression of the first form.
    fn literal_body(&mut self, id: NodeId) -> Result<Option<ExprId>, CompileError> {
        if self.match_punct(PunctuationId::FatArrow) {
            let body_start = self.current_span().start;
            let expr = self.in_scope(id, |p| p.assign_expression())?;
            let span = self.span_from(body_start);
            let node = self.tree.node_mut(id);
            node.body = Some(span);
            node.statements.push(span);
            return Ok(Some(expr));
        }
        self.method_body(id)?;
        Ok(None)
    }

    // ========================================================================
    // Meta expressions
    // ========================================================================

    /// `is(Type [Ident] [(:|==) Spec] [, TemplateParams])`
    fn is_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.expect_keyword(KeywordId::Is, "'is'")?.start;
        self.expect_punct(PunctuationId::LParen, "'(' after 'is'")?;
        let ty = self.parse_type()?;
        let alias = if self.check_ident() { Some(self.identifier()?) } else { None };

        let exact = if self.match_punct(PunctuationId::Colon) {
            Some(false)
        } else if self.match_op(OperatorId::EqEq) {
            Some(true)
        } else {
            None
        };
        let relation = match exact {
            Some(exact) => Some(IsRelation {
                exact,
                specialization: self.is_specialization()?,
            }),
            None => None,
        };

        if self.match_punct(PunctuationId::Comma) {
            // Template parameter list of the pattern; not kept.
            while !self.check_punct(PunctuationId::RParen) && !self.is_at_end() {
                if self.check_punct(PunctuationId::LParen) || self.check_punct(PunctuationId::LBracket) {
                    self.skip_group();
                } else {
                    self.advance();
                }
            }
        }
        self.expect_punct(PunctuationId::RParen, "')' to close is expression")?;
        Ok(self.make_expr(Expr::Is(IsExpr { ty, alias, relation }), start))
    }

    fn is_specialization(&mut self) -> Result<IsSpecialization, CompileError> {
        let keyword = self.peek().keyword_id().filter(|id| {
            matches!(
                id,
                KeywordId::Class
                    | KeywordId::Struct
                    | KeywordId::Union
                    | KeywordId::Interface
                    | KeywordId::Enum
                    | KeywordId::Function
                    | KeywordId::Delegate
                    | KeywordId::Super
                    | KeywordId::Return
            ) || keywords::is_type_constructor(*id)
        });
        if let Some(id) = keyword {
            if self.check_nth_punct(1, PunctuationId::RParen) || self.check_nth_punct(1, PunctuationId::Comma) {
                self.advance();
                return Ok(IsSpecialization::Keyword(id));
            }
        }
        Ok(IsSpecialization::Type(self.parse_type()?))
    }

    /// `__traits(keyword, args...)`
    fn traits_expression(&mut self) -> Result<ExprId, CompileError> {
        let start = self.expect_keyword(KeywordId::Traits, "'__traits'")?.start;
        self.expect_punct(PunctuationId::LParen, "'(' after '__traits'")?;
        let keyword = self.identifier()?;
        let mut args = Vec::new();
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RParen) {
                break;
            }
            args.push(self.type_or_expression()?);
        }
        self.expect_punct(PunctuationId::RParen, "')' to close __traits")?;
        Ok(self.make_expr(Expr::Traits { keyword, args }, start))
    }

    // ========================================================================
    // Initializers
    // ========================================================================

    /// Variable initializer: `void`, `{ field: value, ... }`, or an assign expression.
    fn initializer(&mut self) -> Result<ExprId, CompileError> {
        let start = self.current_span().start;
        if self.check_keyword(KeywordId::Void)
            && (self.check_nth_punct(1, PunctuationId::Semicolon) || self.check_nth_punct(1, PunctuationId::Comma))
        {
            self.advance();
            return Ok(self.make_expr(Expr::VoidInitializer, start));
        }
        if self.check_punct(PunctuationId::LBrace) && self.brace_is_struct_initializer() {
            return self.nested(|p| p.struct_initializer());
        }
        self.assign_expression()
    }

    /// With the cursor on `{`: `{}`, `{ name: ...`, or a group without statements is a struct initializer.
    fn brace_is_struct_initializer(&self) -> bool {
        if self.check_nth_punct(1, PunctuationId::RBrace)
            || (self.check_nth_ident(1) && self.check_nth_punct(2, PunctuationId::Colon))
        {
            return true;
        }
        let mut cursor = self.stream.lookahead();
        cursor.bump();
        let mut depth = 0usize;
        loop {
            let token = cursor.peek();
            match &token.kind {
                TokenKind::Eof => return false,
                TokenKind::Punctuation(PunctuationId::Semicolon) if depth == 0 => return false,
                TokenKind::Punctuation(PunctuationId::LBrace | PunctuationId::LParen | PunctuationId::LBracket) => {
                    depth += 1;
                }
                TokenKind::Punctuation(PunctuationId::RParen | PunctuationId::RBracket) => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Punctuation(PunctuationId::RBrace) => {
                    if depth == 0 {
                        return true;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            cursor.bump();
        }
    }

    fn struct_initializer(&mut self) -> Result<ExprId, CompileError> {
        let start = self.expect_punct(PunctuationId::LBrace, "'{'")?.start;
        let mut fields = Vec::new();
        while !self.check_punct(PunctuationId::RBrace) && !self.is_at_end() {
            let name = if self.check_ident() && self.check_nth_punct(1, PunctuationId::Colon) {
                let name = self.identifier()?;
                self.advance();
                Some(name)
            } else {
                None
            };
            fields.push((name, self.initializer()?));
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RBrace, "'}' to close struct initializer")?;
        Ok(self.make_expr(Expr::StructInitializer(fields), start))
    }
}
