//! Caret context: is an offset inside code, a comment or a string literal?
//!
//! Editors ask this on every keystroke (to suppress completion in comments, or to decide which comment delimiters an
//! uncomment action must strip). The scan is a single forward pass over the text up to the offset and does not need
//! a token stream, so it works on text that does not lex cleanly.

use crate::ast::Span;

/// What surrounds a caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenContext {
    Code,
    /// `// ...`; the span runs to the end of the line.
    LineComment(Span),
    /// `/* ... */`
    BlockComment(Span),
    /// `/+ ... +/`, spanning the outermost comment of a nesting.
    NestedComment(Span),
    /// Inside a string or character literal.
    String(Span),
}

impl TokenContext {
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenContext::LineComment(_) | TokenContext::BlockComment(_) | TokenContext::NestedComment(_)
        )
    }

    pub fn span(self) -> Option<Span> {
        match self {
            TokenContext::Code => None,
            TokenContext::LineComment(span)
            | TokenContext::BlockComment(span)
            | TokenContext::NestedComment(span)
            | TokenContext::String(span) => Some(span),
        }
    }
}

/// Classify `offset` in `source`.
///
/// An unterminated comment or string extends to the end of the text. A caret on the first character of an opener is
/// still code, and so is a caret right after a closing delimiter. The end of a line comment belongs to the comment.
pub fn token_context(source: &str, offset: usize) -> TokenContext {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let mut i = 0;

    while i < offset {
        let start = i;
        let (end, context): (usize, fn(Span) -> TokenContext) = match (bytes[i], bytes.get(i + 1).copied()) {
            (b'/', Some(b'/')) => (line_end(bytes, i), TokenContext::LineComment),
            (b'/', Some(b'*')) => (block_comment_end(bytes, i + 2), TokenContext::BlockComment),
            (b'/', Some(b'+')) => (nested_comment_end(bytes, i + 2), TokenContext::NestedComment),
            (b'"', _) => (quoted_end(bytes, i + 1, b'"', true), TokenContext::String),
            (b'\'', _) => (quoted_end(bytes, i + 1, b'\'', true), TokenContext::String),
            (b'`', _) => (quoted_end(bytes, i + 1, b'`', false), TokenContext::String),
            (b'r', Some(b'"')) if !is_ident_byte(bytes, i.wrapping_sub(1)) => {
                (quoted_end(bytes, i + 2, b'"', false), TokenContext::String)
            }
            (c, _) if c.is_ascii_alphanumeric() || c == b'_' => {
                // Skip whole identifiers so `r` inside `bar"` does not open a raw string.
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        };

        let is_line = bytes[start..].starts_with(b"//");
        let open_ended = is_line || (end == bytes.len() && !is_closed(&bytes[start..end]));
        if offset < end || (offset == end && open_ended) {
            return context(Span::new(start, end));
        }
        i = end;
    }
    TokenContext::Code
}

/// `offset` moved back to the nearest character boundary of `source`, and clamped to its length.
pub fn char_boundary_at(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn is_ident_byte(bytes: &[u8], i: usize) -> bool {
    bytes.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&c| c == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

fn block_comment_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

fn nested_comment_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 1;
    let mut i = from;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'+') => {
                depth += 1;
                i += 2;
            }
            (b'+', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn quoted_end(bytes: &[u8], from: usize, quote: u8, escapes: bool) -> usize {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if escapes => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Whether an unterminated-looking construct actually ends with its closing delimiter.
fn is_closed(text: &[u8]) -> bool {
    match text {
        [b'/', b'*', rest @ ..] => rest.len() >= 2 && rest.ends_with(b"*/"),
        [b'/', b'+', rest @ ..] => rest.len() >= 2 && rest.ends_with(b"+/"),
        [b'r', b'"', rest @ ..] => rest.ends_with(b"\""),
        [quote, rest @ ..] => rest.last() == Some(quote),
        [] => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_at_marker(source: &str) -> TokenContext {
        let offset = source.find('|').expect("marker");
        let text = source.replacen('|', "", 1);
        token_context(&text, offset)
    }

    #[test]
    fn test_code_outside_comments() {
        assert_eq!(context_at_marker("int x|;"), TokenContext::Code);
        assert_eq!(context_at_marker("/* a */ int| x;"), TokenContext::Code);
        assert_eq!(context_at_marker("/* a */| int x;"), TokenContext::Code);
    }

    #[test]
    fn test_line_comment() {
        let source = "int x; // trailing| note\nint y;";
        assert_eq!(context_at_marker(source), TokenContext::LineComment(Span::new(7, 23)));
        assert_eq!(context_at_marker("// note\nint |y;"), TokenContext::Code);
    }

    #[test]
    fn test_block_and_nested_comments() {
        assert_eq!(context_at_marker("/* a| */"), TokenContext::BlockComment(Span::new(0, 7)));
        // The inner `+/` closes only the inner level.
        let source = "/+ outer /+ inner +/ still| outer +/ code";
        match context_at_marker(source) {
            TokenContext::NestedComment(span) => assert_eq!(span, Span::new(0, 35)),
            other => panic!("expected nested comment, got {other:?}"),
        }
    }

    #[test]
    fn test_strings_hide_comment_openers() {
        assert_eq!(context_at_marker("auto s = \"// not| a comment\";"), TokenContext::String(Span::new(9, 27)));
        assert_eq!(context_at_marker("auto s = \"// x\"; int |y;"), TokenContext::Code);
        assert_eq!(context_at_marker("auto s = `a\\`; // c|"), TokenContext::LineComment(Span::new(15, 19)));
    }

    #[test]
    fn test_unterminated_comment_reaches_end() {
        let source = "int a; /* open|";
        assert_eq!(context_at_marker(source), TokenContext::BlockComment(Span::new(7, 14)));
    }

    #[test]
    fn test_char_boundary_at_snaps_back() {
        let source = "int é = 1; // ü";
        let e = source.find('é').unwrap();
        assert_eq!(char_boundary_at(source, e + 1), e);
        assert_eq!(char_boundary_at(source, e + 2), e + 2);
        assert_eq!(char_boundary_at(source, source.len() + 5), source.len());
        assert_eq!(char_boundary_at(source, source.len() - 1), source.len() - 2);
        assert!(matches!(token_context(source, source.len() - 1), TokenContext::LineComment(_)));
    }
}
