//! Small helper APIs for working with `Token` / `TokenKind`.
//!
//! These helpers exist to reduce repetitive `matches!(...)` at call sites and to make it easy
//! to work with ID-based tokens.

use crate::lexer::{Token, TokenKind};
use dscope_core::lang::keywords::{self, KeywordId};
use dscope_core::lang::operators::{self, OperatorId};
use dscope_core::lang::punctuation::{self, PunctuationId};

impl TokenKind {
    /// Return the keyword id, if this is a keyword token.
    pub fn keyword_id(&self) -> Option<KeywordId> {
        match self {
            TokenKind::Keyword(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` if this is the given keyword.
    pub fn is_keyword(&self, id: KeywordId) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == id)
    }

    /// Return the operator id, if this is an operator token.
    pub fn operator_id(&self) -> Option<OperatorId> {
        match self {
            TokenKind::Operator(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` if this is the given operator.
    pub fn is_operator(&self, id: OperatorId) -> bool {
        matches!(self, TokenKind::Operator(o) if *o == id)
    }

    /// Return the punctuation id, if this is a punctuation token.
    pub fn punctuation_id(&self) -> Option<PunctuationId> {
        match self {
            TokenKind::Punctuation(id) => Some(*id),
            _ => None,
        }
    }

    /// Return `true` if this is the given punctuation.
    pub fn is_punctuation(&self, id: PunctuationId) -> bool {
        matches!(self, TokenKind::Punctuation(p) if *p == id)
    }

    /// Identifier text, if this is an identifier token.
    pub fn ident(&self) -> Option<&str> {
        match self {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Return `true` for `int`, `float`, string, and char literal tokens.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::String(_) | TokenKind::Char(_)
        )
    }

    /// Return `true` for a basic type keyword (`int`, `void`, `string` is not one).
    pub fn is_basic_type(&self) -> bool {
        self.keyword_id().is_some_and(keywords::is_basic_type)
    }

    /// Human-readable spelling used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(id) => format!("'{}'", keywords::as_str(*id)),
            TokenKind::Operator(id) => format!("'{}'", operators::as_str(*id)),
            TokenKind::Punctuation(id) => format!("'{}'", punctuation::as_str(*id)),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Int(value) => format!("integer literal {value}"),
            TokenKind::Float(value) => format!("float literal {value}"),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Char(_) => "character literal".to_string(),
            TokenKind::Error(text) => format!("invalid token '{text}'"),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

impl Token {
    /// Convenience wrapper for `self.kind.keyword_id()`.
    pub fn keyword_id(&self) -> Option<KeywordId> {
        self.kind.keyword_id()
    }

    /// Convenience wrapper for `self.kind.operator_id()`.
    pub fn operator_id(&self) -> Option<OperatorId> {
        self.kind.operator_id()
    }

    /// Convenience wrapper for `self.kind.punctuation_id()`.
    pub fn punctuation_id(&self) -> Option<PunctuationId> {
        self.kind.punctuation_id()
    }

    pub fn ident(&self) -> Option<&str> {
        self.kind.ident()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    #[test]
    fn test_describe_uses_registry_spelling() {
        let lexed = lex("foreach_reverse >>>= .. foo");
        let described: Vec<_> = lexed.tokens.iter().map(|t| t.kind.describe()).collect();
        assert_eq!(
            described,
            vec!["'foreach_reverse'", "'>>>='", "'..'", "identifier 'foo'", "end of file"]
        );
    }

    #[test]
    fn test_basic_type_detection() {
        let lexed = lex("int string void");
        assert!(lexed.tokens[0].kind.is_basic_type());
        assert!(!lexed.tokens[1].kind.is_basic_type());
        assert!(lexed.tokens[2].kind.is_basic_type());
    }
}
