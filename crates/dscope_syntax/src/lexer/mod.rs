//! Lexer for the D programming language
//!
//! Handles tokenization including:
//! - Keywords and identifiers (Unicode letters allowed)
//! - Integer, floating-point, string and character literals
//! - Operators and punctuation (`>>>=`, `^^`, `..`, `=>`, ...)
//! - Line, block and nesting comments, collected on the side
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token, Comment)
//! - `stream` - Token stream with peek cursor used by the parser
//! - `strings` - String and character literal scanning
//! - `numbers` - Numeric literal scanning
//! - `comments` - Comment scanning
//!
//! ## Notes
//! - Lexing never stops early: malformed input becomes an error token plus a [`CompileError`], and scanning
//!   resumes with the next character.

mod comments;
mod numbers;
pub mod stream;
mod strings;
pub mod tokens;

pub use stream::{Lookahead, TokenStream};
pub use tokens::{Comment, CommentKind, Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::CompileError;
use dscope_core::lang::operators::OperatorId;
use dscope_core::lang::punctuation::PunctuationId;

/// Output of a lexing run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lexed {
    /// Always ends with an `Eof` token.
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<CompileError>,
}

/// Lexer for D source code.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    tokens: Vec<Token>,
    comments: Vec<Comment>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            tokens: Vec::new(),
            comments: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source code.
    ///
    /// The token stream always ends with an `Eof` token, even when errors were reported.
    pub fn tokenize(mut self) -> Lexed {
        self.skip_shebang();
        while !self.is_at_end() {
            self.scan_token();
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos),
        ));

        Lexed {
            tokens: self.tokens,
            comments: self.comments,
            errors: self.errors,
        }
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next(); // skip current
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    /// `#!` interpreter line at the very start of a file.
    fn skip_shebang(&mut self) {
        if self.source.starts_with("#!") {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        let start = self.current_pos;

        let Some(c) = self.advance() else {
            return;
        };

        match c {
            ' ' | '\t' | '\r' | '\n' | '\u{0B}' | '\u{0C}' => {}

            // Comments and slash operators
            '/' => {
                if !self.scan_comment(start) {
                    self.operator(start, OperatorId::Slash, &[('=', OperatorId::SlashEq)]);
                }
            }

            // Operators and punctuation
            '+' => self.operator(
                start,
                OperatorId::Plus,
                &[('+', OperatorId::PlusPlus), ('=', OperatorId::PlusEq)],
            ),
            '-' => self.operator(
                start,
                OperatorId::Minus,
                &[('-', OperatorId::MinusMinus), ('=', OperatorId::MinusEq)],
            ),
            '*' => self.operator(start, OperatorId::Star, &[('=', OperatorId::StarEq)]),
            '%' => self.operator(start, OperatorId::Percent, &[('=', OperatorId::PercentEq)]),
            '~' => self.operator(start, OperatorId::Tilde, &[('=', OperatorId::TildeEq)]),
            '&' => self.operator(
                start,
                OperatorId::Amp,
                &[('&', OperatorId::AmpAmp), ('=', OperatorId::AmpEq)],
            ),
            '|' => self.operator(
                start,
                OperatorId::Pipe,
                &[('|', OperatorId::PipePipe), ('=', OperatorId::PipeEq)],
            ),
            '^' => {
                if self.match_char('^') {
                    self.operator(start, OperatorId::CaretCaret, &[('=', OperatorId::CaretCaretEq)]);
                } else {
                    self.operator(start, OperatorId::Caret, &[('=', OperatorId::CaretEq)]);
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::EqEq, start);
                } else if self.match_char('>') {
                    self.add_punct(PunctuationId::FatArrow, start);
                } else {
                    self.add_op(OperatorId::Eq, start);
                }
            }
            '!' => self.operator(start, OperatorId::Bang, &[('=', OperatorId::NotEq)]),
            '<' => {
                if self.match_char('<') {
                    self.operator(start, OperatorId::Shl, &[('=', OperatorId::ShlEq)]);
                } else {
                    self.operator(start, OperatorId::Lt, &[('=', OperatorId::LtEq)]);
                }
            }
            '>' => self.scan_greater(start),
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_number(start, '.');
                } else if self.match_char('.') {
                    if self.match_char('.') {
                        self.add_punct(PunctuationId::Ellipsis, start);
                    } else {
                        self.add_punct(PunctuationId::DotDot, start);
                    }
                } else {
                    self.add_punct(PunctuationId::Dot, start);
                }
            }
            '(' => self.add_punct(PunctuationId::LParen, start),
            ')' => self.add_punct(PunctuationId::RParen, start),
            '[' => self.add_punct(PunctuationId::LBracket, start),
            ']' => self.add_punct(PunctuationId::RBracket, start),
            '{' => self.add_punct(PunctuationId::LBrace, start),
            '}' => self.add_punct(PunctuationId::RBrace, start),
            ',' => self.add_punct(PunctuationId::Comma, start),
            ';' => self.add_punct(PunctuationId::Semicolon, start),
            ':' => self.add_punct(PunctuationId::Colon, start),
            '?' => self.add_punct(PunctuationId::Question, start),
            '$' => self.add_punct(PunctuationId::Dollar, start),
            '@' => self.add_punct(PunctuationId::At, start),
            '#' => self.add_punct(PunctuationId::Hash, start),

            // Strings
            '"' => self.scan_string(start),
            '`' => self.scan_wysiwyg(start, '`'),
            '\'' => self.scan_char(start),
            'r' if self.peek() == Some('"') => {
                self.advance();
                self.scan_wysiwyg(start, '"');
            }
            'x' if self.peek() == Some('"') => {
                self.advance();
                self.scan_hex_string(start);
            }
            'q' if self.peek() == Some('"') => {
                self.advance();
                self.scan_delimited_string(start);
            }
            'q' if self.peek() == Some('{') => {
                self.advance();
                self.scan_token_string(start);
            }

            // Numbers
            '0'..='9' => self.scan_number(start, c),

            // Identifiers and keywords
            _ if is_ident_start(c) => self.scan_identifier(start),

            _ => {
                self.errors.push(CompileError::lex(
                    format!("Unexpected character '{}'", c),
                    Span::new(start, self.current_pos),
                ));
                self.add_token(TokenKind::Error(c.to_string()), start);
            }
        }
    }

    // ========================================================================
    // Operator helpers
    // ========================================================================

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn add_op(&mut self, id: OperatorId, start: usize) {
        self.add_token(TokenKind::Operator(id), start);
    }

    fn add_punct(&mut self, id: PunctuationId, start: usize) {
        self.add_token(TokenKind::Punctuation(id), start);
    }

    /// Try to match compound operator, fallback to simple.
    fn operator(&mut self, start: usize, simple: OperatorId, compounds: &[(char, OperatorId)]) {
        for (c, id) in compounds {
            if self.match_char(*c) {
                self.add_op(*id, start);
                return;
            }
        }
        self.add_op(simple, start);
    }

    /// Scan `>`, `>=`, `>>`, `>>=`, `>>>`, `>>>=`.
    fn scan_greater(&mut self, start: usize) {
        if self.match_char('>') {
            if self.match_char('>') {
                self.operator(start, OperatorId::UShr, &[('=', OperatorId::UShrEq)]);
            } else {
                self.operator(start, OperatorId::Shr, &[('=', OperatorId::ShrEq)]);
            }
        } else {
            self.operator(start, OperatorId::Gt, &[('=', OperatorId::GtEq)]);
        }
    }

    // ========================================================================
    // Identifier scanning
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }

        let spelling = &self.source[start..self.current_pos];

        // Look up identifier spelling in the reserved-word registry (no allocation for keywords).
        if let Some(id) = keyword_id(spelling) {
            self.add_token(TokenKind::Keyword(id), start);
        } else {
            self.add_token(TokenKind::Ident(spelling.to_string()), start);
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Check if a character can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Check if a character can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Convenience function to lex a source string.
///
/// This is a shorthand for `Lexer::new(source).tokenize()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Lexed {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_core::lang::keywords::KeywordId;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let lexed = lex(source);
        assert!(lexed.errors.is_empty(), "unexpected lex errors: {:?}", lexed.errors);
        lexed.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_registry_parity() {
        use dscope_core::lang::punctuation;

        for p in punctuation::PUNCTUATION {
            let tokens = kinds(p.canonical);
            assert_eq!(tokens.len(), 2, "expected token + EOF for {:?}, got {:?}", p.canonical, tokens);
            assert!(tokens[0].is_punctuation(p.id), "{:?} lexed as {:?}", p.canonical, tokens[0]);
        }
    }

    #[test]
    fn test_keyword_registry_parity() {
        use dscope_core::lang::keywords;

        for k in keywords::KEYWORDS {
            let tokens = kinds(k.canonical);
            assert_eq!(tokens.len(), 2, "expected token + EOF for keyword {:?}, got {:?}", k.id, tokens);
            assert!(tokens[0].is_keyword(k.id));
            assert!(matches!(tokens[1], TokenKind::Eof));
        }
    }

    #[test]
    fn test_operator_registry_parity() {
        use dscope_core::lang::operators;

        for o in operators::OPERATORS {
            let tokens = kinds(o.spelling);
            assert_eq!(
                tokens.len(),
                2,
                "expected token + EOF for operator spelling {:?}, got {:?}",
                o.spelling,
                tokens
            );
            assert!(tokens[0].is_operator(o.id), "{:?} lexed as {:?}", o.spelling, tokens[0]);
        }
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("immutable foreach_reverse __traits größe _x1");
        assert!(tokens[0].is_keyword(KeywordId::Immutable));
        assert!(tokens[1].is_keyword(KeywordId::ForeachReverse));
        assert!(tokens[2].is_keyword(KeywordId::Traits));
        assert!(matches!(&tokens[3], TokenKind::Ident(s) if s == "größe"));
        assert!(matches!(&tokens[4], TokenKind::Ident(s) if s == "_x1"));
    }

    #[test]
    fn test_maximal_munch_operators() {
        let tokens = kinds("a>>>=b>>c !is d^^=2");
        assert!(tokens[1].is_operator(OperatorId::UShrEq));
        assert!(tokens[3].is_operator(OperatorId::Shr));
        assert!(tokens[5].is_operator(OperatorId::Bang));
        assert!(tokens[6].is_keyword(KeywordId::Is));
        assert!(tokens[8].is_operator(OperatorId::CaretCaretEq));
    }

    #[test]
    fn test_template_bang_is_separate_from_not_equal() {
        let tokens = kinds("a!(b) a != b");
        assert!(tokens[1].is_operator(OperatorId::Bang));
        assert!(tokens[6].is_operator(OperatorId::NotEq));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_numbers() {
        let tokens = kinds("42 3.14 1_000_000 1e10 0xFF 0b101 10UL 2.5f .5");
        assert!(matches!(tokens[0], TokenKind::Int(42)));
        assert!(matches!(tokens[1], TokenKind::Float(f) if (f - 3.14).abs() < 0.001));
        assert!(matches!(tokens[2], TokenKind::Int(1000000)));
        assert!(matches!(tokens[3], TokenKind::Float(_)));
        assert!(matches!(tokens[4], TokenKind::Int(255)));
        assert!(matches!(tokens[5], TokenKind::Int(5)));
        assert!(matches!(tokens[6], TokenKind::Int(10)));
        assert!(matches!(tokens[7], TokenKind::Float(f) if (f - 2.5).abs() < 0.001));
        assert!(matches!(tokens[8], TokenKind::Float(f) if (f - 0.5).abs() < 0.001));
    }

    #[test]
    fn test_slice_not_float() {
        // 1..2 should be Int, DotDot, Int - not a float
        let tokens = kinds("1..2");
        assert!(matches!(tokens[0], TokenKind::Int(1)));
        assert!(tokens[1].is_punctuation(PunctuationId::DotDot));
        assert!(matches!(tokens[2], TokenKind::Int(2)));
    }

    #[test]
    fn test_strings() {
        let tokens = kinds(r#""a\tb" r"c:\dir" `raw\n` x"48 69" q"(a(b)c)" q{int x;} 'z' '\n'"#);
        assert!(matches!(&tokens[0], TokenKind::String(s) if s == "a\tb"));
        assert!(matches!(&tokens[1], TokenKind::String(s) if s == r"c:\dir"));
        assert!(matches!(&tokens[2], TokenKind::String(s) if s == r"raw\n"));
        assert!(matches!(&tokens[3], TokenKind::String(s) if s == "Hi"));
        assert!(matches!(&tokens[4], TokenKind::String(s) if s == "a(b)c"));
        assert!(matches!(&tokens[5], TokenKind::String(s) if s == "int x;"));
        assert!(matches!(tokens[6], TokenKind::Char('z')));
        assert!(matches!(tokens[7], TokenKind::Char('\n')));
    }

    #[test]
    fn test_string_postfix_is_consumed() {
        let tokens = kinds(r#""abc"w ~ "d"d"#);
        assert!(matches!(&tokens[0], TokenKind::String(s) if s == "abc"));
        assert!(tokens[1].is_operator(OperatorId::Tilde));
        assert!(matches!(&tokens[2], TokenKind::String(s) if s == "d"));
        assert!(matches!(tokens[3], TokenKind::Eof));
    }

    #[test]
    fn test_comment_kinds_are_distinct() {
        let lexed = lex("a // line\n/* block */ b /+ outer /+ inner +/ still +/ c /// doc\n");
        let idents: Vec<_> = lexed
            .tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Ident(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(idents, vec!["a", "b", "c"]);
        let kinds: Vec<_> = lexed.comments.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommentKind::Line,
                CommentKind::Block,
                CommentKind::Nested,
                CommentKind::Line
            ]
        );
        assert_eq!(lexed.comments[2].text, " outer /+ inner +/ still ");
        assert!(!lexed.comments[0].is_doc);
        assert!(lexed.comments[3].is_doc);
    }

    #[test]
    fn test_unexpected_character_produces_error_token_and_continues() {
        let lexed = lex("int \u{00A7} x;");
        assert_eq!(lexed.errors.len(), 1);
        assert!(lexed.errors[0].message.contains("Unexpected character"));
        assert!(matches!(&lexed.tokens[1].kind, TokenKind::Error(s) if s == "\u{00A7}"));
        assert!(matches!(&lexed.tokens[2].kind, TokenKind::Ident(s) if s == "x"));
        assert!(lexed.tokens[3].kind.is_punctuation(PunctuationId::Semicolon));
    }

    #[test]
    fn test_unterminated_constructs_reach_eof() {
        for source in ["\"abc", "/* never closed", "/+ /+ +/", "q\"(abc", "'"] {
            let lexed = lex(source);
            assert!(!lexed.errors.is_empty(), "expected an error for {source:?}");
            assert!(matches!(lexed.tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)));
        }
    }

    #[test]
    fn test_shebang_is_skipped() {
        let tokens = kinds("#!/usr/bin/env rdmd\nmodule m;");
        assert!(tokens[0].is_keyword(KeywordId::Module));
    }

    #[test]
    fn test_spans_cover_source_text() {
        let source = "auto x = a.b!(c)[0..$];";
        let lexed = lex(source);
        for token in &lexed.tokens {
            assert!(token.span.start <= token.span.end);
            assert!(token.span.end <= source.len());
        }
        assert_eq!(&source[lexed.tokens[1].span.start..lexed.tokens[1].span.end], "x");
    }
}
