/// Token-stream helpers and error recovery.
///
/// This chunk contains the low-level primitives used throughout parsing:
/// - Peeking/consuming tokens (`peek`, `advance`)
/// - Matching / expecting keywords, operators, and punctuation
/// - Nesting guard (`enter`/`leave`)
/// - Error recovery (`synchronize`, `skip_group`)
///
/// Most functions in this file are internal (`fn`) and are documented primarily
/// to aid maintenance and onboarding.
impl<'a> Parser<'a> {
    // ========================================================================
    // Helpers
    // ========================================================================

    /// Return `true` if the current token is [`TokenKind::Eof`].
    fn is_at_end(&self) -> bool {
        self.stream.is_at_end()
    }

    /// Return the current token without consuming it.
    fn peek(&self) -> &'a Token {
        self.stream.current()
    }

    /// Return the token `n` positions after the current one without consuming it.
    fn peek_nth(&self, n: usize) -> &'a Token {
        self.stream.peek(n)
    }

    /// Advance to the next token and return the token we just consumed.
    fn advance(&mut self) -> &'a Token {
        self.stream.next()
    }

    /// End offset of the most recently consumed token.
    fn previous_end(&self) -> usize {
        self.stream.previous().span.end
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Span from `start` up to the end of the last consumed token.
    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.previous_end().max(start))
    }

    /// Return `true` if the current token is the given keyword.
    fn check_keyword(&self, id: KeywordId) -> bool {
        self.peek().kind.is_keyword(id)
    }

    /// Return `true` if the current token is the given punctuation.
    fn check_punct(&self, id: PunctuationId) -> bool {
        self.peek().kind.is_punctuation(id)
    }

    /// Return `true` if the current token is the given operator.
    fn check_op(&self, id: OperatorId) -> bool {
        self.peek().kind.is_operator(id)
    }

    fn check_nth_keyword(&self, n: usize, id: KeywordId) -> bool {
        self.peek_nth(n).kind.is_keyword(id)
    }

    fn check_nth_punct(&self, n: usize, id: PunctuationId) -> bool {
        self.peek_nth(n).kind.is_punctuation(id)
    }

    fn check_nth_op(&self, n: usize, id: OperatorId) -> bool {
        self.peek_nth(n).kind.is_operator(id)
    }

    fn check_nth_ident(&self, n: usize) -> bool {
        matches!(self.peek_nth(n).kind, TokenKind::Ident(_))
    }

    fn check_ident(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Ident(_))
    }

    fn match_keyword(&mut self, id: KeywordId) -> bool {
        if self.check_keyword(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_punct(&mut self, id: PunctuationId) -> bool {
        if self.check_punct(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, id: OperatorId) -> bool {
        if self.check_op(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expected(&self, what: &str) -> CompileError {
        CompileError::syntax(
            format!("Expected {}, found {}", what, self.peek().kind.describe()),
            self.current_span(),
        )
    }

    fn expect_keyword(&mut self, id: KeywordId, what: &str) -> Result<Span, CompileError> {
        if self.check_keyword(id) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(what))
        }
    }

    fn expect_punct(&mut self, id: PunctuationId, what: &str) -> Result<Span, CompileError> {
        if self.check_punct(id) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(what))
        }
    }

    fn expect_op(&mut self, id: OperatorId, what: &str) -> Result<Span, CompileError> {
        if self.check_op(id) {
            Ok(self.advance().span)
        } else {
            Err(self.expected(what))
        }
    }

    // ========================================================================
    // Nesting guard
    // ========================================================================

    fn enter(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::syntax("Nesting is too deep", self.current_span()));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CompileError>) -> Result<T, CompileError> {
        self.enter()?;
        let result = f(self);
        self.leave();
        result
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Skip to the next statement/declaration boundary.
    ///
    /// Stops after a `;` or a balanced `}` group, or before an unmatched `}` (left for the enclosing block) or a
    /// declaration keyword.
    fn synchronize(&mut self) {
        let start = self.stream.mark();
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match &token.kind {
                TokenKind::Eof => return,
                TokenKind::Punctuation(PunctuationId::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Punctuation(PunctuationId::LBrace) => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Punctuation(PunctuationId::RBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Keyword(id)
                    if depth == 0 && self.stream.mark() > start && is_declaration_keyword(*id) =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// With the current token on `(`, `[` or `{`, consume through the matching closer.
    fn skip_group(&mut self) -> bool {
        let mut cursor = self.stream.lookahead();
        let closed = cursor.skip_balanced();
        self.stream.reset(cursor.position());
        closed
    }

    /// Consume tokens through the next `;` at this nesting level (or a balanced `{}` group).
    fn skip_to_semicolon(&mut self) {
        loop {
            if self.is_at_end() || self.check_punct(PunctuationId::RBrace) {
                return;
            }
            if self.check_punct(PunctuationId::LBrace) {
                self.skip_group();
                return;
            }
            if self.check_punct(PunctuationId::LParen) || self.check_punct(PunctuationId::LBracket) {
                self.skip_group();
                continue;
            }
            if self.match_punct(PunctuationId::Semicolon) {
                return;
            }
            self.advance();
        }
    }

    /// Build (and log) the error for a knowingly unsupported production.
    fn unimplemented(&self, construct: &str, span: Span) -> CompileError {
        tracing::debug!(target: "dscope::unimplemented", construct, start = span.start, end = span.end);
        CompileError::unimplemented(construct, span)
    }

    /// Check if the current token can start an expression
    fn is_at_expr_start(&self) -> bool {
        let kind = &self.peek().kind;
        if kind.is_literal() || matches!(kind, TokenKind::Ident(_)) {
            return true;
        }
        match kind {
            TokenKind::Keyword(id) => matches!(
                keywords::category(*id),
                KeywordCategory::BasicType | KeywordCategory::Literal | KeywordCategory::TypeConstructor
            ) || matches!(
                id,
                KeywordId::This
                    | KeywordId::Super
                    | KeywordId::Cast
                    | KeywordId::New
                    | KeywordId::Delete
                    | KeywordId::Typeid
                    | KeywordId::Typeof
                    | KeywordId::Vector
                    | KeywordId::Is
                    | KeywordId::Traits
                    | KeywordId::Assert
                    | KeywordId::Mixin
                    | KeywordId::Import
                    | KeywordId::Function
                    | KeywordId::Delegate
            ),
            TokenKind::Operator(id) => matches!(
                id,
                OperatorId::Amp
                    | OperatorId::Star
                    | OperatorId::PlusPlus
                    | OperatorId::MinusMinus
                    | OperatorId::Minus
                    | OperatorId::Plus
                    | OperatorId::Bang
                    | OperatorId::Tilde
            ),
            TokenKind::Punctuation(id) => matches!(
                id,
                PunctuationId::LParen
                    | PunctuationId::LBracket
                    | PunctuationId::LBrace
                    | PunctuationId::Dot
                    | PunctuationId::Dollar
            ),
            _ => false,
        }
    }
}

/// Keywords that always begin a new declaration; recovery stops in front of them.
fn is_declaration_keyword(id: KeywordId) -> bool {
    matches!(
        id,
        KeywordId::Class
            | KeywordId::Struct
            | KeywordId::Interface
            | KeywordId::Union
            | KeywordId::Enum
            | KeywordId::Import
            | KeywordId::Template
            | KeywordId::Unittest
            | KeywordId::Alias
    )
}
