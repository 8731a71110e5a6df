//! Syntax diagnostics.
//!
//! Lexing and parsing report problems as [`CompileError`] values collected next to their output; nothing in this
//! crate aborts on bad input.

use std::fmt;

use crate::ast::Span;

/// A lex or parse error with location information
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn lex(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Lex, message, span)
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    /// A grammar production the parser knowingly does not support; the construct was skipped.
    pub fn unimplemented(construct: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::Unimplemented,
            format!("{construct} is not supported; skipped"),
            span,
        )
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_unimplemented(&self) -> bool {
        self.kind == ErrorKind::Unimplemented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token.
    Lex,
    /// Unexpected token or grammar violation; recovered.
    Syntax,
    /// Explicitly unsupported production; the file is only partially understood.
    Unimplemented,
}

impl ErrorKind {
    /// Stable code used by report renderers.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Lex => "dscope::lex",
            ErrorKind::Syntax => "dscope::syntax",
            ErrorKind::Unimplemented => "dscope::unimplemented",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Lex => write!(f, "lex error"),
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Unimplemented => write!(f, "not implemented"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = CompileError::syntax("Expected ';'", Span::new(3, 4)).with_hint("add a semicolon");
        assert_eq!(err.to_string(), "syntax error: Expected ';'");
        assert_eq!(err.hints, vec!["add a semicolon".to_string()]);
    }

    #[test]
    fn test_unimplemented_is_distinct() {
        let err = CompileError::unimplemented("inline assembler", Span::default());
        assert!(err.is_unimplemented());
        assert_eq!(err.kind.to_string(), "not implemented");
        assert!(!CompileError::lex("bad", Span::default()).is_unimplemented());
    }
}
