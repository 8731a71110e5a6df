//! Token stream with speculative lookahead.
//!
//! The parser consumes tokens through [`TokenStream`]. Disambiguation that needs to look past an unknown number
//! of tokens uses a [`Lookahead`] cursor: it is a cheap copy of the position that can be advanced freely and is
//! simply dropped to roll back. Backtracking across a real parse uses [`TokenStream::mark`]/[`TokenStream::reset`].

use super::tokens::{Token, TokenKind};
use crate::ast::Span;
use dscope_core::lang::punctuation::PunctuationId;

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span { start: 0, end: 0 },
};

/// Cursor over a lexed token slice.
///
/// ## Notes
/// - Reading past the end keeps returning the final `Eof` token.
#[derive(Debug, Clone)]
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at(&self, index: usize) -> &'a Token {
        self.tokens
            .get(index)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    /// The token that would be consumed next.
    pub fn current(&self) -> &'a Token {
        self.at(self.pos)
    }

    /// The most recently consumed token (the current token before anything was consumed).
    pub fn previous(&self) -> &'a Token {
        self.at(self.pos.saturating_sub(1))
    }

    /// Consume and return the current token. At the end, stays on `Eof`.
    pub fn next(&mut self) -> &'a Token {
        let token = self.current();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    /// Return the token `n` positions ahead without consuming (`peek(0)` is the current token).
    pub fn peek(&self, n: usize) -> &'a Token {
        self.at(self.pos + n)
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    /// Position marker for [`TokenStream::reset`].
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Roll back to a position obtained from [`TokenStream::mark`].
    pub fn reset(&mut self, mark: usize) {
        self.pos = mark.min(self.tokens.len());
    }

    /// Start a speculative scan at the current token.
    pub fn lookahead(&self) -> Lookahead<'a> {
        Lookahead {
            stream: TokenStream {
                tokens: self.tokens,
                pos: self.pos,
            },
        }
    }
}

/// Speculative read cursor; dropping it leaves the owning stream untouched.
#[derive(Debug, Clone)]
pub struct Lookahead<'a> {
    stream: TokenStream<'a>,
}

impl<'a> Lookahead<'a> {
    pub fn peek(&self) -> &'a Token {
        self.stream.current()
    }

    pub fn peek_nth(&self, n: usize) -> &'a Token {
        self.stream.peek(n)
    }

    pub fn bump(&mut self) -> &'a Token {
        self.stream.next()
    }

    pub fn is_punct(&self, id: PunctuationId) -> bool {
        self.peek().kind.is_punctuation(id)
    }

    /// Consume the current token if it is `id`.
    pub fn eat_punct(&mut self, id: PunctuationId) -> bool {
        if self.is_punct(id) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// With the cursor on an opening delimiter, skip to just past its matching closer.
    ///
    /// Returns `false` (cursor at `Eof`) if the group is unterminated.
    pub fn skip_balanced(&mut self) -> bool {
        let Some(open) = self.peek().kind.punctuation_id() else {
            return false;
        };
        let close = match open {
            PunctuationId::LParen => PunctuationId::RParen,
            PunctuationId::LBracket => PunctuationId::RBracket,
            PunctuationId::LBrace => PunctuationId::RBrace,
            _ => return false,
        };
        let mut depth = 0usize;
        loop {
            let token = self.bump();
            match &token.kind {
                TokenKind::Eof => return false,
                kind if kind.is_punctuation(open) => depth += 1,
                kind if kind.is_punctuation(close) => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
    }

    pub fn position(&self) -> usize {
        self.stream.mark()
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::lex;
    use dscope_core::lang::punctuation::PunctuationId;

    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let lexed = lex("a b c");
        let mut stream = TokenStream::new(&lexed.tokens);
        assert!(matches!(&stream.peek(2).kind, TokenKind::Ident(s) if s == "c"));
        assert!(matches!(&stream.next().kind, TokenKind::Ident(s) if s == "a"));
        assert!(matches!(&stream.current().kind, TokenKind::Ident(s) if s == "b"));
        assert!(matches!(stream.peek(10).kind, TokenKind::Eof));
    }

    #[test]
    fn test_lookahead_rolls_back_on_drop() {
        let lexed = lex("(a (b) c) d");
        let stream = TokenStream::new(&lexed.tokens);
        {
            let mut cursor = stream.lookahead();
            assert!(cursor.skip_balanced());
            assert!(matches!(&cursor.peek().kind, TokenKind::Ident(s) if s == "d"));
        }
        assert!(stream.current().kind.is_punctuation(PunctuationId::LParen));
    }

    #[test]
    fn test_skip_balanced_unterminated() {
        let lexed = lex("(a (b)");
        let stream = TokenStream::new(&lexed.tokens);
        let mut cursor = stream.lookahead();
        assert!(!cursor.skip_balanced());
        assert!(matches!(cursor.peek().kind, TokenKind::Eof));
    }

    #[test]
    fn test_empty_slice_is_eof() {
        let mut stream = TokenStream::new(&[]);
        assert!(stream.is_at_end());
        assert!(matches!(stream.next().kind, TokenKind::Eof));
    }

    #[test]
    fn test_mark_and_reset() {
        let lexed = lex("x y z");
        let mut stream = TokenStream::new(&lexed.tokens);
        let mark = stream.mark();
        stream.next();
        stream.next();
        stream.reset(mark);
        assert!(matches!(&stream.current().kind, TokenKind::Ident(s) if s == "x"));
    }
}
