//! Comment scanning for the D lexer
//!
//! Handles line (`//`), block (`/* */`) and nesting (`/+ +/`) comments.

use super::Lexer;
use super::tokens::{Comment, CommentKind};
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    /// Scan a comment after its opening `/` has been consumed.
    ///
    /// Returns `false` if the `/` does not start a comment.
    pub(super) fn scan_comment(&mut self, start: usize) -> bool {
        match self.peek() {
            Some('/') => {
                self.advance();
                self.scan_line_comment(start);
                true
            }
            Some('*') => {
                self.advance();
                self.scan_block_comment(start);
                true
            }
            Some('+') => {
                self.advance();
                self.scan_nested_comment(start);
                true
            }
            _ => false,
        }
    }

    fn scan_line_comment(&mut self, start: usize) {
        let text_start = self.current_pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        let text = &self.source[text_start..self.current_pos];
        // `///` is documentation, `////...` is a separator line
        let is_doc = text.starts_with('/') && !text.starts_with("//");
        self.push_comment(CommentKind::Line, start, text_start, self.current_pos, is_doc);
    }

    fn scan_block_comment(&mut self, start: usize) {
        let text_start = self.current_pos;
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    let text_end = self.current_pos - 1;
                    self.advance();
                    let text = &self.source[text_start..text_end];
                    let is_doc = text.starts_with('*') && text.len() > 1;
                    self.push_comment(CommentKind::Block, start, text_start, text_end, is_doc);
                    return;
                }
                Some(_) => {}
                None => {
                    self.errors.push(CompileError::lex(
                        "Unterminated block comment",
                        Span::new(start, self.current_pos),
                    ));
                    self.push_comment(CommentKind::Block, start, text_start, self.current_pos, false);
                    return;
                }
            }
        }
    }

    fn scan_nested_comment(&mut self, start: usize) {
        let text_start = self.current_pos;
        let mut depth = 1usize;
        loop {
            match self.advance() {
                Some('/') if self.peek() == Some('+') => {
                    self.advance();
                    depth += 1;
                }
                Some('+') if self.peek() == Some('/') => {
                    let text_end = self.current_pos - 1;
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        let text = &self.source[text_start..text_end];
                        let is_doc = text.starts_with('+') && text.len() > 1;
                        self.push_comment(CommentKind::Nested, start, text_start, text_end, is_doc);
                        return;
                    }
                }
                Some(_) => {}
                None => {
                    self.errors.push(CompileError::lex(
                        "Unterminated nesting comment",
                        Span::new(start, self.current_pos),
                    ));
                    self.push_comment(CommentKind::Nested, start, text_start, self.current_pos, false);
                    return;
                }
            }
        }
    }

    fn push_comment(&mut self, kind: CommentKind, start: usize, text_start: usize, text_end: usize, is_doc: bool) {
        self.comments.push(Comment {
            kind,
            span: Span::new(start, self.current_pos),
            text: self.source[text_start..text_end].to_string(),
            is_doc,
        });
    }
}
