//! Comment, uncomment and import-insertion edits.
//!
//! Every action computes [`TextEdit`]s against the current text and never mutates it; editors apply them in one
//! undo step. Offsets are byte offsets into the original text, so edits of one action never overlap and are applied
//! right to left by [`apply_edits`].

use dscope_syntax::ast::{Span, SyntaxTree};
use dscope_syntax::context::{TokenContext, char_boundary_at, token_context};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::new(at, at),
            replacement: text.into(),
        }
    }

    pub fn delete(span: Span) -> Self {
        Self {
            span,
            replacement: String::new(),
        }
    }
}

/// Apply non-overlapping edits, last offset first.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.span.start.cmp(&a.span.start).then(b.span.end.cmp(&a.span.end)));
    let mut out = source.to_string();
    for edit in ordered {
        let start = edit.span.start.min(out.len());
        let end = edit.span.end.clamp(start, out.len());
        if out.is_char_boundary(start) && out.is_char_boundary(end) {
            out.replace_range(start..end, &edit.replacement);
        }
    }
    out
}

/// Comment out `selection`.
///
/// An empty selection comments its line with `//`. A selection already inside a block comment, or containing
/// block-comment delimiters, is wrapped in nesting `/+ +/`; anything else in `/* */`. Ends inside a multi-byte
/// character snap back to its start.
pub fn comment_selection(source: &str, selection: Span) -> Vec<TextEdit> {
    let start = char_boundary_at(source, selection.start);
    let selection = Span::new(start, char_boundary_at(source, selection.end).max(start));
    if selection.is_empty() {
        return vec![TextEdit::insert(line_start(source, selection.start), "//")];
    }
    let inner = source.get(selection.start..selection.end).unwrap_or_default();
    let nests = matches!(
        token_context(source, selection.start),
        TokenContext::BlockComment(_) | TokenContext::NestedComment(_)
    ) || inner.contains("/*")
        || inner.contains("*/");
    let (open, close) = if nests { ("/+", "+/") } else { ("/*", "*/") };
    vec![
        TextEdit::insert(selection.end, close),
        TextEdit::insert(selection.start, open),
    ]
}

/// Remove the comment around `caret`.
///
/// A line comment loses all its leading slashes, also when the caret sits in the code before it on a line that is
/// only a comment. Block and nested comments lose their delimiters, repeated `*`/`+` included; an unterminated one
/// loses only its opener. Anything else yields no edits.
pub fn uncomment_at(source: &str, caret: usize) -> Vec<TextEdit> {
    let caret = char_boundary_at(source, caret);
    match token_context(source, caret) {
        TokenContext::LineComment(span) => vec![strip_slashes(source, span.start)],
        TokenContext::BlockComment(span) => strip_delimiters(source, span, b'*'),
        TokenContext::NestedComment(span) => strip_delimiters(source, span, b'+'),
        TokenContext::String(_) => Vec::new(),
        TokenContext::Code => {
            let start = line_start(source, caret);
            let first = source[start..]
                .find(|c: char| c != ' ' && c != '\t')
                .map_or(source.len(), |i| start + i);
            if source[first..].starts_with("//") && first >= caret {
                vec![strip_slashes(source, first)]
            } else {
                Vec::new()
            }
        }
    }
}

fn strip_slashes(source: &str, start: usize) -> TextEdit {
    let count = source.as_bytes()[start..].iter().take_while(|&&b| b == b'/').count();
    TextEdit::delete(Span::new(start, start + count))
}

fn strip_delimiters(source: &str, span: Span, fill: u8) -> Vec<TextEdit> {
    let bytes = source.as_bytes();
    let end = span.end.min(bytes.len());
    let terminated = end >= span.start + 4 && bytes[end - 2] == fill && bytes[end - 1] == b'/';
    let limit = if terminated { end - 2 } else { end };

    let mut open_end = span.start + 2;
    while open_end < limit && bytes[open_end] == fill {
        open_end += 1;
    }
    let mut edits = Vec::new();
    if terminated {
        let mut close_start = end - 2;
        while close_start > open_end && bytes[close_start - 1] == fill {
            close_start -= 1;
        }
        edits.push(TextEdit::delete(Span::new(close_start, end)));
    }
    edits.push(TextEdit::delete(Span::new(span.start, open_end)));
    edits
}

fn line_start(source: &str, offset: usize) -> usize {
    let offset = char_boundary_at(source, offset);
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Edit adding `import module;` after the last import, or after the module declaration when there is none.
///
/// `None` if `module` is already imported.
pub fn insert_import_edit(tree: &SyntaxTree, module: &str) -> Option<TextEdit> {
    if tree.import_visibility(module).is_some() {
        return None;
    }
    let line = format!("import {module};");
    if let Some(end) = tree.last_import_end() {
        return Some(TextEdit::insert(end, format!("\n{line}")));
    }
    let source = tree.line_index.text();
    match tree.module_name.as_ref().and_then(|_| module_declaration_end(source)) {
        Some(end) => Some(TextEdit::insert(end, format!("\n{line}"))),
        None => Some(TextEdit::insert(0, format!("{line}\n"))),
    }
}

/// End of `module a.b;`, skipping comments and strings that mention the word.
fn module_declaration_end(source: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let is_word = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_');
    source
        .match_indices("module")
        .map(|(i, _)| i)
        .find(|&i| {
            (i == 0 || !is_word(i - 1)) && !is_word(i + "module".len()) && token_context(source, i) == TokenContext::Code
        })
        .and_then(|i| source[i..].find(';').map(|semi| i + semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    fn comment(source: &str, start: usize, end: usize) -> String {
        apply_edits(source, &comment_selection(source, Span::new(start, end)))
    }

    fn uncomment(source: &str, caret: usize) -> String {
        apply_edits(source, &uncomment_at(source, caret))
    }

    #[test]
    fn test_comment_selection() {
        assert_eq!(comment("int a;\n  int b;", 10, 10), "int a;\n//  int b;");
        assert_eq!(comment("int a; int b;", 7, 13), "int a; /*int b;*/");
        assert_eq!(comment("/* int a; int b; */", 10, 16), "/* int a; /+int b;+/ */");
        assert_eq!(comment("a; /* x */ b;", 0, 13), "/+a; /* x */ b;+/");
    }

    #[test]
    fn test_uncomment_line_comments() {
        assert_eq!(uncomment("int a; /// doc", 12), "int a;  doc");
        assert_eq!(uncomment("    // int b;", 1), "     int b;");
        assert_eq!(uncomment("int a; // note", 2), "int a; // note");
    }

    #[test]
    fn test_uncomment_block_and_nested_comments() {
        assert_eq!(uncomment("a /* b */ c", 5), "a  b  c");
        assert_eq!(uncomment("/** doc **/", 4), " doc ");
        assert_eq!(uncomment("/**/", 2), "");
        assert_eq!(uncomment("/+ outer /+ inner +/ +/", 12), " outer /+ inner +/ ");
        assert_eq!(uncomment("x; /* open", 7), "x;  open");
        assert!(uncomment_at("s = \"// no\";", 7).is_empty());
    }

    #[test]
    fn test_insert_import_edit() {
        let tree = parse_source("module app;\nimport std.stdio;\nvoid main() {}").tree;
        assert!(insert_import_edit(&tree, "std.stdio").is_none());
        let edit = insert_import_edit(&tree, "std.string").unwrap();
        assert_eq!(
            apply_edits(tree.line_index.text(), &[edit]),
            "module app;\nimport std.stdio;\nimport std.string;\nvoid main() {}"
        );

        let tree = parse_source("// module header\nmodule app;\nint x;").tree;
        let edit = insert_import_edit(&tree, "core.thread").unwrap();
        assert_eq!(
            apply_edits(tree.line_index.text(), &[edit]),
            "// module header\nmodule app;\nimport core.thread;\nint x;"
        );

        let tree = parse_source("int x;").tree;
        let edit = insert_import_edit(&tree, "a").unwrap();
        assert_eq!(apply_edits(tree.line_index.text(), &[edit]), "import a;\nint x;");
    }

    #[test]
    fn test_offsets_inside_multibyte_characters() {
        let source = "// é\nint ü = 1; /* ö */ void f() { ü; }";
        let u = source.find('ü').unwrap();
        assert_eq!(comment(source, u + 1, u + 1), "// é\n//int ü = 1; /* ö */ void f() { ü; }");
        assert_eq!(comment(source, u + 1, u + 2), "// é\nint /*ü*/ = 1; /* ö */ void f() { ü; }");
        assert_eq!(uncomment(source, 4), " é\nint ü = 1; /* ö */ void f() { ü; }");
        let o = source.find('ö').unwrap();
        assert_eq!(uncomment(source, o + 1), "// é\nint ü = 1;  ö  void f() { ü; }");
        for offset in 0..=source.len() + 2 {
            let _ = comment_selection(source, Span::new(offset, source.len() + 2));
            let _ = uncomment_at(source, offset);
        }
    }
}
