//! String scanning for the D lexer
//!
//! Handles double-quoted strings with escapes, WYSIWYG strings (`r"..."`, `` `...` ``), hex strings (`x"..."`),
//! delimited strings (`q"(...)"`), token strings (`q{...}`) and character literals.

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

// ============================================================================
// Escape sequence handling
// ============================================================================

/// Result of processing an escape sequence
enum EscapeResult {
    Char(char),
    /// Named HTML entity (`\&amp;`), kept verbatim
    Entity(String),
    /// Unknown or malformed escape
    Invalid(String),
    Eof,
}

impl<'a> Lexer<'a> {
    /// Process an escape sequence. Called after consuming the backslash.
    fn scan_escape(&mut self) -> EscapeResult {
        match self.advance() {
            Some('n') => EscapeResult::Char('\n'),
            Some('t') => EscapeResult::Char('\t'),
            Some('r') => EscapeResult::Char('\r'),
            Some('0') if !self.peek().is_some_and(|c| c.is_digit(8)) => EscapeResult::Char('\0'),
            Some('a') => EscapeResult::Char('\u{07}'),
            Some('b') => EscapeResult::Char('\u{08}'),
            Some('f') => EscapeResult::Char('\u{0C}'),
            Some('v') => EscapeResult::Char('\u{0B}'),
            Some(c @ ('\\' | '"' | '\'' | '?')) => EscapeResult::Char(c),
            Some('x') => self.scan_hex_escape(2),
            Some('u') => self.scan_hex_escape(4),
            Some('U') => self.scan_hex_escape(8),
            Some(c) if c.is_digit(8) => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                char::from_u32(value).map_or_else(|| EscapeResult::Invalid(format!("\\{value:o}")), EscapeResult::Char)
            }
            Some('&') => {
                let mut name = String::from("&");
                while let Some(c) = self.peek() {
                    self.advance();
                    name.push(c);
                    if c == ';' || !c.is_ascii_alphanumeric() {
                        break;
                    }
                }
                EscapeResult::Entity(name)
            }
            Some(c) => EscapeResult::Invalid(format!("\\{c}")),
            None => EscapeResult::Eof,
        }
    }

    fn scan_hex_escape(&mut self, digits: usize) -> EscapeResult {
        let mut hex = String::new();
        for _ in 0..digits {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|_| hex.len() == digits)
            .and_then(char::from_u32)
            .map_or_else(|| EscapeResult::Invalid(format!("\\x{hex}")), EscapeResult::Char)
    }

    /// Consume an optional `c`/`w`/`d` string postfix.
    fn string_postfix(&mut self) {
        if matches!(self.peek(), Some('c' | 'w' | 'd')) {
            self.advance();
        }
    }

    fn unterminated(&mut self, what: &str, start: usize) {
        self.errors.push(CompileError::lex(
            format!("Unterminated {what}"),
            Span::new(start, self.current_pos),
        ));
    }

    // ========================================================================
    // String scanning
    // ========================================================================

    /// Scan a `"..."` string; the opening quote has been consumed.
    pub(super) fn scan_string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.scan_escape() {
                    EscapeResult::Char(c) => value.push(c),
                    EscapeResult::Entity(name) => value.push_str(&name),
                    EscapeResult::Invalid(text) => {
                        let end = self.current_pos;
                        self.errors.push(CompileError::lex(
                            format!("Invalid escape sequence '{text}'"),
                            Span::new(end.saturating_sub(text.len()), end),
                        ));
                        value.push_str(&text);
                    }
                    EscapeResult::Eof => {
                        self.unterminated("string literal", start);
                        self.add_token(TokenKind::String(value), start);
                        return;
                    }
                },
                Some(c) => value.push(c),
                None => {
                    self.unterminated("string literal", start);
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
            }
        }
        self.string_postfix();
        self.add_token(TokenKind::String(value), start);
    }

    /// Scan a WYSIWYG string up to `close`; the opening delimiter has been consumed.
    pub(super) fn scan_wysiwyg(&mut self, start: usize, close: char) {
        let text_start = self.current_pos;
        loop {
            match self.advance() {
                Some(c) if c == close => {
                    let value = self.source[text_start..self.current_pos - close.len_utf8()].to_string();
                    self.string_postfix();
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
                Some(_) => {}
                None => {
                    self.unterminated("string literal", start);
                    let value = self.source[text_start..self.current_pos].to_string();
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
            }
        }
    }

    /// Scan `x"0A 0B"`; the `x"` has been consumed.
    pub(super) fn scan_hex_string(&mut self, start: usize) {
        let mut bytes = Vec::new();
        let mut pending: Option<u32> = None;
        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) if c.is_whitespace() => {}
                Some(c) if c.is_ascii_hexdigit() => {
                    let digit = c.to_digit(16).unwrap_or(0);
                    match pending.take() {
                        Some(high) => bytes.push((high * 16 + digit) as u8),
                        None => pending = Some(digit),
                    }
                }
                Some(c) => {
                    self.errors.push(CompileError::lex(
                        format!("Invalid character '{c}' in hex string"),
                        Span::new(self.current_pos - c.len_utf8(), self.current_pos),
                    ));
                }
                None => {
                    self.unterminated("hex string", start);
                    break;
                }
            }
        }
        if pending.is_some() {
            self.errors.push(CompileError::lex(
                "Odd number of hex digits in hex string",
                Span::new(start, self.current_pos),
            ));
        }
        self.string_postfix();
        self.add_token(TokenKind::String(String::from_utf8_lossy(&bytes).into_owned()), start);
    }

    /// Scan `q"(...)"`, `q"[...]"`, `q"/.../"` and friends; the `q"` has been consumed.
    pub(super) fn scan_delimited_string(&mut self, start: usize) {
        let Some(open) = self.advance() else {
            self.unterminated("delimited string", start);
            self.add_token(TokenKind::String(String::new()), start);
            return;
        };
        let close = match open {
            '(' => ')',
            '[' => ']',
            '<' => '>',
            '{' => '}',
            c if c.is_alphabetic() || c == '_' => {
                // Heredoc delimiters run to a line holding only the identifier; not supported
                self.errors.push(
                    CompileError::unimplemented("heredoc string", Span::new(start, self.current_pos))
                        .with_hint("use a bracket delimiter such as q\"(...)\""),
                );
                self.skip_to_line_end();
                self.add_token(TokenKind::Error(self.source[start..self.current_pos].to_string()), start);
                return;
            }
            c => c,
        };
        let nests = open != close;
        let text_start = self.current_pos;
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Some(c) if nests && c == open => depth += 1,
                Some(c) if c == close && depth > 0 => depth -= 1,
                Some(c) if c == close && self.peek() == Some('"') => {
                    let value = self.source[text_start..self.current_pos - c.len_utf8()].to_string();
                    self.advance();
                    self.string_postfix();
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
                Some(_) => {}
                None => {
                    self.unterminated("delimited string", start);
                    let value = self.source[text_start..self.current_pos].to_string();
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
            }
        }
    }

    /// Scan `q{ tokens }` as raw text; the `q{` has been consumed.
    pub(super) fn scan_token_string(&mut self, start: usize) {
        let text_start = self.current_pos;
        let mut depth = 1usize;
        loop {
            match self.advance() {
                Some('{') => depth += 1,
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        let value = self.source[text_start..self.current_pos - 1].to_string();
                        self.string_postfix();
                        self.add_token(TokenKind::String(value), start);
                        return;
                    }
                }
                Some(_) => {}
                None => {
                    self.unterminated("token string", start);
                    let value = self.source[text_start..self.current_pos].to_string();
                    self.add_token(TokenKind::String(value), start);
                    return;
                }
            }
        }
    }

    /// Scan a character literal; the opening `'` has been consumed.
    pub(super) fn scan_char(&mut self, start: usize) {
        let value = match self.advance() {
            Some('\\') => match self.scan_escape() {
                EscapeResult::Char(c) => Some(c),
                EscapeResult::Entity(_) | EscapeResult::Invalid(_) | EscapeResult::Eof => None,
            },
            Some('\'') => {
                self.errors.push(CompileError::lex(
                    "Empty character literal",
                    Span::new(start, self.current_pos),
                ));
                self.add_token(TokenKind::Error("''".to_string()), start);
                return;
            }
            Some('\n') | None => None,
            Some(c) => Some(c),
        };
        match (value, self.peek()) {
            (Some(c), Some('\'')) => {
                self.advance();
                self.add_token(TokenKind::Char(c), start);
            }
            _ => {
                // Recover at the closing quote on this line, if there is one
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                    if c == '\'' {
                        break;
                    }
                }
                self.errors.push(CompileError::lex(
                    "Invalid character literal",
                    Span::new(start, self.current_pos),
                ));
                self.add_token(TokenKind::Error(self.source[start..self.current_pos].to_string()), start);
            }
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }
}
