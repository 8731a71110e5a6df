/// Miscellaneous parser utilities.
///
/// This chunk contains small shared parsing helpers that don’t cleanly fit into
/// “decl”, “stmt”, “expr”, or “types” (identifiers and dotted names).
impl<'a> Parser<'a> {
    // ========================================================================
    // Utilities
    // ========================================================================

    fn identifier(&mut self) -> Result<Ident, CompileError> {
        self.identifier_spanned().map(|(name, _)| name)
    }

    fn identifier_spanned(&mut self) -> Result<(Ident, Span), CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name.clone(), span))
            }
            _ => Err(self.expected("identifier")),
        }
    }

    /// `a.b.c`, returned joined with the span covering all parts.
    fn dotted_name(&mut self) -> Result<(String, Span), CompileError> {
        let (mut name, first) = self.identifier_spanned()?;
        let mut span = first;
        while self.check_punct(PunctuationId::Dot) && self.check_nth_ident(1) {
            self.advance();
            let (part, part_span) = self.identifier_spanned()?;
            name.push('.');
            name.push_str(&part);
            span = span.merge(part_span);
        }
        Ok((name, span))
    }
}

/// Source spelling of a token, for places that keep raw text (`extern(C++)` linkage).
fn token_text(token: &Token) -> String {
    match &token.kind {
        TokenKind::Keyword(id) => keywords::as_str(*id).to_string(),
        TokenKind::Operator(id) => operators::as_str(*id).to_string(),
        TokenKind::Punctuation(id) => dscope_core::lang::punctuation::as_str(*id).to_string(),
        TokenKind::Ident(name) => name.clone(),
        TokenKind::Int(value) => value.to_string(),
        TokenKind::Float(value) => value.to_string(),
        TokenKind::String(text) => text.clone(),
        TokenKind::Char(c) => c.to_string(),
        TokenKind::Error(text) => text.clone(),
        TokenKind::Eof => String::new(),
    }
}
