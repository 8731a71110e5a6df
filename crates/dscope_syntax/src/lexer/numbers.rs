//! Number scanning for the D lexer
//!
//! Handles decimal, hexadecimal and binary integers, floating-point literals, underscores and type suffixes.

use super::Lexer;
use super::tokens::TokenKind;
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    pub(super) fn scan_number(&mut self, start: usize, first: char) {
        if first == '0' {
            match self.peek() {
                Some('x' | 'X') => {
                    self.advance();
                    return self.scan_radix_integer(start, 16);
                }
                Some('b' | 'B') => {
                    self.advance();
                    return self.scan_radix_integer(start, 2);
                }
                _ => {}
            }
        }

        let mut value = String::new();
        if first != '.' {
            value.push(first);
        } else {
            value.push_str("0.");
        }
        let mut is_float = first == '.';

        self.take_digits(&mut value, |c| c.is_ascii_digit());

        // Decimal part; `1..2` and `1.foo` keep the integer
        if !is_float && self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            value.push('.');
            self.advance();
            self.take_digits(&mut value, |c| c.is_ascii_digit());
        }

        // Exponent part
        if matches!(self.peek(), Some('e' | 'E'))
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            self.take_digits(&mut value, |c| c.is_ascii_digit());
        }

        // Suffixes: integers take `L`/`u`/`U`, floats `f`/`F`/`L`, either may be imaginary `i`
        loop {
            match self.peek() {
                Some('f' | 'F') => {
                    is_float = true;
                    self.advance();
                }
                Some('L' | 'u' | 'U' | 'i') => {
                    self.advance();
                }
                _ => break,
            }
        }

        if is_float {
            match value.parse::<f64>() {
                Ok(f) => self.add_token(TokenKind::Float(f), start),
                Err(_) => self.number_error(format!("Invalid float literal: {}", value), start),
            }
        } else {
            match value.parse::<u64>() {
                Ok(i) => self.add_token(TokenKind::Int(i), start),
                Err(_) => self.number_error(format!("Integer literal is too large: {}", value), start),
            }
        }
    }

    fn scan_radix_integer(&mut self, start: usize, radix: u32) {
        let mut digits = String::new();
        self.take_digits(&mut digits, |c| c.is_digit(radix));
        while matches!(self.peek(), Some('L' | 'u' | 'U')) {
            self.advance();
        }
        if digits.is_empty() {
            self.number_error("Missing digits after radix prefix".to_string(), start);
            return;
        }
        match u64::from_str_radix(&digits, radix) {
            Ok(i) => self.add_token(TokenKind::Int(i), start),
            Err(_) => self.number_error(format!("Integer literal is too large: {}", digits), start),
        }
    }

    fn take_digits(&mut self, value: &mut String, is_digit: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if is_digit(c) || c == '_' {
                if c != '_' {
                    value.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }
    }

    fn number_error(&mut self, message: String, start: usize) {
        let span = Span::new(start, self.current_pos);
        self.errors.push(CompileError::lex(message, span));
        self.add_token(TokenKind::Error(self.source[start..self.current_pos].to_string()), start);
    }
}
