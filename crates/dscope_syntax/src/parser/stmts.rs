/// Statement parsing.
///
/// Statements are not kept as nodes of their own. What the tree records is:
/// - one `Block` node per scope-introducing statement (`if`, `else`, `while`, `for`, `foreach`, `switch`,
///   `with`, `try`, `catch`, `finally`, `scope(...)`, plain `{ }` ...), with the controlling expression;
/// - local declarations, as ordinary children of the innermost block;
/// - the span of every statement, in the enclosing block's `statements` list.
///
/// ## Notes
/// - `version`, `debug` and `static if` do not open a scope; their statements land in the enclosing block.
impl<'a> Parser<'a> {
    // ========================================================================
    // Statement lists
    // ========================================================================

    /// Parse statements into the current scope until an unmatched `}` or EOF.
    fn statements_until_brace(&mut self) {
        loop {
            if self.is_at_end() || self.check_punct(PunctuationId::RBrace) {
                return;
            }
            let before = self.stream.mark();
            let start = self.current_span().start;
            if let Err(e) = self.statement() {
                self.errors.push(e);
                self.synchronize();
            }
            if self.stream.mark() == before {
                self.advance();
            }
            let span = self.span_from(start);
            let scope = self.scope;
            self.tree.node_mut(scope).statements.push(span);
        }
    }

    fn statement(&mut self) -> Result<(), CompileError> {
        self.nested(|p| p.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<(), CompileError> {
        let start = self.current_span().start;
        let token = self.peek();
        match &token.kind {
            TokenKind::Punctuation(PunctuationId::Semicolon) => {
                self.advance();
                return Ok(());
            }
            TokenKind::Punctuation(PunctuationId::LBrace) => {
                let id = self.open_block(start, None);
                let result = self.scoped_body(id);
                self.finish(id, start);
                return result;
            }
            TokenKind::Ident(_) if self.check_nth_punct(1, PunctuationId::Colon) => {
                // Label; it applies to the statement that follows, which is parsed on its own.
                self.advance();
                self.advance();
                return Ok(());
            }
            TokenKind::Keyword(id) => {
                if let Some(result) = self.keyword_statement(start, *id) {
                    return result;
                }
            }
            _ => {}
        }

        if self.is_declaration_start() {
            let mut sticky = Vec::new();
            return self.decl_def(&mut sticky);
        }
        self.expression_statement()
    }

    /// Statements introduced by a keyword; `None` if the keyword starts a declaration or expression instead.
    fn keyword_statement(&mut self, start: usize, id: KeywordId) -> Option<Result<(), CompileError>> {
        let next_is_paren = self.check_nth_punct(1, PunctuationId::LParen);
        let result = match id {
            KeywordId::If => self.if_statement(start),
            KeywordId::While => self.while_statement(start),
            KeywordId::Do => self.do_statement(start),
            KeywordId::For => self.for_statement(start),
            KeywordId::Foreach | KeywordId::ForeachReverse => self.foreach_statement(start, id),
            KeywordId::Switch => self.switch_statement(start),
            KeywordId::Final if self.check_nth_keyword(1, KeywordId::Switch) => {
                self.advance();
                self.switch_statement(start)
            }
            KeywordId::Case => self.case_label(),
            KeywordId::Default if self.check_nth_punct(1, PunctuationId::Colon) => {
                self.advance();
                self.advance();
                Ok(())
            }
            KeywordId::Break | KeywordId::Continue => {
                self.advance();
                if self.check_ident() {
                    self.advance();
                }
                self.expect_semicolon()
            }
            KeywordId::Goto => {
                self.advance();
                if self.match_keyword(KeywordId::Case) {
                    if !self.check_punct(PunctuationId::Semicolon) {
                        if let Err(e) = self.expression() {
                            return Some(Err(e));
                        }
                    }
                } else if !self.match_keyword(KeywordId::Default) {
                    if let Err(e) = self.identifier() {
                        return Some(Err(e));
                    }
                }
                self.expect_semicolon()
            }
            KeywordId::Return | KeywordId::Throw => {
                self.advance();
                if !self.check_punct(PunctuationId::Semicolon) {
                    if let Err(e) = self.expression() {
                        return Some(Err(e));
                    }
                }
                self.expect_semicolon()
            }
            KeywordId::With => self.parenthesized_block(start, KeywordId::With),
            KeywordId::Synchronized if next_is_paren || self.check_nth_punct(1, PunctuationId::LBrace) => {
                self.synchronized_statement(start)
            }
            KeywordId::Scope if next_is_paren => self.scope_guard(start),
            KeywordId::Try => self.try_statement(start),
            KeywordId::Asm => self.asm_statement(start),
            KeywordId::Version | KeywordId::Debug => self.conditional_statement(),
            KeywordId::Static if self.check_nth_keyword(1, KeywordId::If) => self.conditional_statement(),
            KeywordId::Static if self.check_nth_keyword(1, KeywordId::Assert) => self.static_assert(),
            _ => return None,
        };
        Some(result)
    }

    fn expect_semicolon(&mut self) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::Semicolon, "';' after statement")?;
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<(), CompileError> {
        if !self.is_at_expr_start() {
            return Err(self.expected("statement"));
        }
        self.expression()?;
        self.expect_semicolon()
    }

    /// Does the current statement start with a declaration rather than an expression?
    ///
    /// A type followed by an identifier is a declaration, so `a * b;` declares `b` as D requires.
    fn is_declaration_start(&self) -> bool {
        if let Some(id) = self.peek().keyword_id() {
            match id {
                KeywordId::Import
                | KeywordId::Class
                | KeywordId::Struct
                | KeywordId::Union
                | KeywordId::Interface
                | KeywordId::Enum
                | KeywordId::Alias
                | KeywordId::Typedef
                | KeywordId::Template
                | KeywordId::Unittest
                | KeywordId::Pragma => return true,
                KeywordId::Mixin => return !self.check_nth_punct(1, PunctuationId::LParen),
                _ if keywords::is_type_constructor(id) && self.check_nth_punct(1, PunctuationId::LParen) => {}
                _ if keywords::is_storage_class(id) => return true,
                _ => {}
            }
        }
        if self.check_punct(PunctuationId::At) {
            return true;
        }

        let mut cursor = self.stream.lookahead();
        if !cursor.skip_type() {
            return false;
        }
        match &cursor.peek().kind {
            TokenKind::Ident(_) => true,
            TokenKind::Punctuation(PunctuationId::LParen) => {
                cursor.peek_nth(1).kind.is_operator(OperatorId::Star)
                    && matches!(cursor.peek_nth(2).kind, TokenKind::Ident(_))
                    && cursor.peek_nth(3).kind.is_punctuation(PunctuationId::RParen)
                    && cursor.peek_nth(4).kind.is_punctuation(PunctuationId::LParen)
            }
            _ => false,
        }
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Add an empty statement block to the current scope.
    fn open_block(&mut self, start: usize, token: Option<KeywordId>) -> NodeId {
        let node = Node::new(
            NodeKind::Block(BlockData {
                token,
                expression: None,
            }),
            String::new(),
            Span::new(start, start),
        );
        self.tree.add_child(self.scope, node)
    }

    fn set_block_expression(&mut self, id: NodeId, expr: ExprId) {
        if let NodeKind::Block(data) = &mut self.tree.node_mut(id).kind {
            data.expression = Some(expr);
        }
    }

    /// Body of a scope statement: `{ ... }` or a single statement, parsed into `id`.
    fn scoped_body(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.in_scope(id, |p| {
            if p.check_punct(PunctuationId::LBrace) {
                let open = p.advance().span;
                p.statements_until_brace();
                let close = p.expect_punct(PunctuationId::RBrace, "'}' to close block");
                let end = close.as_ref().map_or(p.previous_end(), |span| span.end);
                p.tree.node_mut(id).body = Some(Span::new(open.start, end.max(open.start)));
                return close.map(|_| ());
            }
            let start = p.current_span().start;
            let result = p.statement();
            let span = p.span_from(start);
            let node = p.tree.node_mut(id);
            node.statements.push(span);
            node.body = Some(span);
            result
        })
    }

    /// `keyword (expr) body`
    fn parenthesized_block(&mut self, start: usize, keyword: KeywordId) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(keyword));
        let result = self.parenthesized_block_rest(id);
        self.finish(id, start);
        result
    }

    fn parenthesized_block_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'('")?;
        let expr = self.in_scope(id, |p| p.expression())?;
        self.set_block_expression(id, expr);
        self.expect_punct(PunctuationId::RParen, "')'")?;
        self.scoped_body(id)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    fn if_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(KeywordId::If));
        let result = self.if_rest(id);
        self.finish(id, start);
        result?;

        if self.check_keyword(KeywordId::Else) {
            let else_start = self.advance().span.start;
            let else_id = self.open_block(else_start, Some(KeywordId::Else));
            let result = self.scoped_body(else_id);
            self.finish(else_id, else_start);
            return result;
        }
        Ok(())
    }

    fn if_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'(' after 'if'")?;
        self.in_scope(id, |p| p.condition(id))?;
        self.expect_punct(PunctuationId::RParen, "')' after condition")?;
        self.scoped_body(id)
    }

    /// `cond`, `auto x = init` or `Type x = init`; a declared variable becomes a local of block `id`.
    fn condition(&mut self, id: NodeId) -> Result<(), CompileError> {
        let start = self.current_span().start;
        let storage = self
            .peek()
            .keyword_id()
            .filter(|kw| keywords::is_storage_class(*kw) && !self.check_nth_punct(1, PunctuationId::LParen));
        let declares = if storage.is_some() {
            true
        } else {
            let mut cursor = self.stream.lookahead();
            cursor.skip_type()
                && matches!(cursor.peek().kind, TokenKind::Ident(_))
                && cursor.peek_nth(1).kind.is_operator(OperatorId::Eq)
        };
        if !declares {
            let expr = self.expression()?;
            self.set_block_expression(id, expr);
            return Ok(());
        }

        let mut attributes = Vec::new();
        if let Some(kw) = storage {
            self.advance();
            attributes.push(Attribute::Keyword(kw));
        }
        let ty = if self.check_ident() && self.check_nth_op(1, OperatorId::Eq) {
            None
        } else {
            Some(self.parse_type()?)
        };
        let (name, name_span) = self.identifier_spanned()?;
        self.expect_op(OperatorId::Eq, "'=' in condition declaration")?;
        let initializer = self.expression()?;
        let mut node = new_node(
            NodeKind::Variable(VariableData {
                initializer: Some(initializer),
                ..VariableData::default()
            }),
            name,
            name_span,
            start,
            attributes,
        );
        node.ty = ty;
        node.span = self.span_from(start);
        self.tree.add_child(id, node);
        self.set_block_expression(id, initializer);
        Ok(())
    }

    fn while_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.parenthesized_block(start, KeywordId::While)
    }

    fn do_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(KeywordId::Do));
        let result = self.do_rest(id);
        self.finish(id, start);
        result
    }

    fn do_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.scoped_body(id)?;
        self.expect_keyword(KeywordId::While, "'while' after do body")?;
        self.expect_punct(PunctuationId::LParen, "'(' after 'while'")?;
        let expr = self.in_scope(id, |p| p.expression())?;
        self.set_block_expression(id, expr);
        self.expect_punct(PunctuationId::RParen, "')' after condition")?;
        self.match_punct(PunctuationId::Semicolon);
        Ok(())
    }

    fn for_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(KeywordId::For));
        let result = self.in_scope(id, |p| p.for_rest(id));
        self.finish(id, start);
        result
    }

    fn for_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'(' after 'for'")?;
        if !self.match_punct(PunctuationId::Semicolon) {
            if self.is_declaration_start() {
                let mut sticky = Vec::new();
                self.decl_def(&mut sticky)?;
            } else {
                self.expression()?;
                self.expect_punct(PunctuationId::Semicolon, "';' after for initializer")?;
            }
        }
        if !self.check_punct(PunctuationId::Semicolon) {
            let condition = self.expression()?;
            self.set_block_expression(id, condition);
        }
        self.expect_punct(PunctuationId::Semicolon, "';' after for condition")?;
        if !self.check_punct(PunctuationId::RParen) {
            self.expression()?;
        }
        self.expect_punct(PunctuationId::RParen, "')' to close for header")?;
        self.scoped_body(id)
    }

    fn foreach_statement(&mut self, start: usize, keyword: KeywordId) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(keyword));
        let result = self.foreach_rest(id);
        self.finish(id, start);
        result
    }

    /// `(ref k, T v; aggregate)` or `(i; 0 .. n)`
    fn foreach_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        self.expect_punct(PunctuationId::LParen, "'(' after 'foreach'")?;
        loop {
            let start = self.current_span().start;
            let mut attributes = Vec::new();
            while let Some(kw) = self
                .peek()
                .keyword_id()
                .filter(|kw| keywords::is_parameter_storage_class(*kw) && !self.check_nth_punct(1, PunctuationId::LParen))
            {
                self.advance();
                attributes.push(Attribute::Keyword(kw));
            }
            let untyped = self.check_ident()
                && (self.check_nth_punct(1, PunctuationId::Comma) || self.check_nth_punct(1, PunctuationId::Semicolon));
            let ty = if untyped { None } else { Some(self.parse_type()?) };
            let (name, name_span) = self.identifier_spanned()?;
            let mut node = new_node(
                NodeKind::Variable(VariableData::default()),
                name,
                name_span,
                start,
                attributes,
            );
            node.ty = ty;
            node.span = self.span_from(start);
            self.tree.add_child(id, node);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::Semicolon, "';' after foreach variables")?;
        let aggregate = self.in_scope(id, |p| p.expression())?;
        self.set_block_expression(id, aggregate);
        if self.match_punct(PunctuationId::DotDot) {
            self.in_scope(id, |p| p.expression())?;
        }
        self.expect_punct(PunctuationId::RParen, "')' to close foreach header")?;
        self.scoped_body(id)
    }

    fn switch_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.parenthesized_block(start, KeywordId::Switch)
    }

    /// `case a, b:`, `case a: .. case b:`
    fn case_label(&mut self) -> Result<(), CompileError> {
        self.advance();
        loop {
            self.assign_expression()?;
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::Colon, "':' after case")?;
        if self.check_punct(PunctuationId::DotDot) && self.check_nth_keyword(1, KeywordId::Case) {
            self.advance();
            self.advance();
            self.assign_expression()?;
            self.expect_punct(PunctuationId::Colon, "':' after case range")?;
        }
        Ok(())
    }

    fn synchronized_statement(&mut self, start: usize) -> Result<(), CompileError> {
        if self.check_nth_punct(1, PunctuationId::LParen) {
            return self.parenthesized_block(start, KeywordId::Synchronized);
        }
        self.advance();
        let id = self.open_block(start, Some(KeywordId::Synchronized));
        let result = self.scoped_body(id);
        self.finish(id, start);
        result
    }

    /// `scope(exit) stmt`
    fn scope_guard(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(KeywordId::Scope));
        self.skip_group();
        let result = self.scoped_body(id);
        self.finish(id, start);
        result
    }

    fn try_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        let id = self.open_block(start, Some(KeywordId::Try));
        let result = self.scoped_body(id);
        self.finish(id, start);
        result?;

        while self.check_keyword(KeywordId::Catch) {
            let catch_start = self.advance().span.start;
            let catch_id = self.open_block(catch_start, Some(KeywordId::Catch));
            let result = self.catch_rest(catch_id);
            self.finish(catch_id, catch_start);
            result?;
        }
        if self.check_keyword(KeywordId::Finally) {
            let finally_start = self.advance().span.start;
            let finally_id = self.open_block(finally_start, Some(KeywordId::Finally));
            let result = self.scoped_body(finally_id);
            self.finish(finally_id, finally_start);
            result?;
        }
        Ok(())
    }

    /// `(Type name) body` or a bare catch-all body.
    fn catch_rest(&mut self, id: NodeId) -> Result<(), CompileError> {
        if self.match_punct(PunctuationId::LParen) {
            let start = self.current_span().start;
            let ty = self.parse_type()?;
            if self.check_ident() {
                let (name, name_span) = self.identifier_spanned()?;
                let mut node = new_node(
                    NodeKind::Variable(VariableData::default()),
                    name,
                    name_span,
                    start,
                    Vec::new(),
                );
                node.ty = Some(ty);
                node.span = self.span_from(start);
                self.tree.add_child(id, node);
            }
            self.expect_punct(PunctuationId::RParen, "')' after catch parameter")?;
        }
        self.scoped_body(id)
    }

    /// Inline assembler blocks are skipped (balanced braces).
    fn asm_statement(&mut self, start: usize) -> Result<(), CompileError> {
        self.advance();
        while self.check_keyword(KeywordId::Pure)
            || self.check_keyword(KeywordId::Nothrow)
            || self.check_punct(PunctuationId::At)
        {
            self.advance();
            if self.check_ident() {
                self.advance();
            }
        }
        if self.check_punct(PunctuationId::LBrace) {
            self.skip_group();
        } else {
            self.skip_to_semicolon();
        }
        let error = self.unimplemented("inline assembler", self.span_from(start));
        self.errors.push(error);
        Ok(())
    }

    /// `version(X) stmt [else stmt]`, `debug stmt`, `static if (c) stmt [else stmt]`
    fn conditional_statement(&mut self) -> Result<(), CompileError> {
        let is_static_if = self.match_keyword(KeywordId::Static);
        self.advance();
        if is_static_if {
            self.expect_punct(PunctuationId::LParen, "'(' after 'static if'")?;
            self.expression()?;
            self.expect_punct(PunctuationId::RParen, "')' after condition")?;
        } else if self.check_punct(PunctuationId::LParen) {
            self.skip_group();
        }

        self.conditional_statement_body()?;
        if self.match_keyword(KeywordId::Else) {
            self.conditional_statement_body()?;
        }
        Ok(())
    }

    fn conditional_statement_body(&mut self) -> Result<(), CompileError> {
        if self.match_punct(PunctuationId::LBrace) {
            self.statements_until_brace();
            self.expect_punct(PunctuationId::RBrace, "'}' to close conditional block")?;
            return Ok(());
        }
        self.statement()
    }
}
