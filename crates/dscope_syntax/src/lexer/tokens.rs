//! Token types for the D lexer.
//!
//! The lexer uses **registry-backed IDs** for language vocabulary:
//! - `Keyword(KeywordId)` for reserved words
//! - `Operator(OperatorId)` for symbol operators
//! - `Punctuation(PunctuationId)` for punctuation tokens
//!
//! ## Notes
//! - Comments are not tokens; they are collected separately as [`Comment`]s so the parser never sees them.
//! - Malformed input becomes a [`TokenKind::Error`] token and lexing continues.

use crate::ast::Span;
use dscope_core::lang::keywords::{self, KeywordId};
use dscope_core::lang::operators::OperatorId;
use dscope_core::lang::punctuation::PunctuationId;

// ============================================================================
// TOKEN TYPES
// ============================================================================

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ========== Keyword / operator / punctuation (ID-based) ==========
    Keyword(KeywordId),
    Operator(OperatorId),
    Punctuation(PunctuationId),

    // ========== Identifiers and Literals ==========
    Ident(String),
    Int(u64),
    Float(f64),
    String(String),
    Char(char),

    // ========== Special ==========
    /// Text the lexer could not make sense of.
    Error(String),
    Eof, // end of file
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Construct a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Resolve an identifier spelling to a keyword id, if reserved.
pub fn keyword_id(name: &str) -> Option<KeywordId> {
    keywords::from_str(name)
}

// ============================================================================
// COMMENTS
// ============================================================================

/// The three comment syntaxes; they differ in how they are terminated and uncommented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/* ... */`
    Block,
    /// `/+ ... +/`, nests.
    Nested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    /// Full extent including delimiters.
    pub span: Span,
    /// Text between the delimiters.
    pub text: String,
    /// `///`, `/** */` or `/++ +/`.
    pub is_doc: bool,
}
