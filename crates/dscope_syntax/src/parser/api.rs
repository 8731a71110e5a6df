/// Parse a token stream into a [`SyntaxTree`].
///
/// This is the main public entrypoint for parsing an already lexed module.
///
/// ## Parameters
/// - `tokens`: Token stream produced by `dscope_syntax::lexer`, ending with `Eof`.
///
/// ## Notes
/// - Never fails as a whole: the tree is always returned, alongside every recorded error.
/// - Comments and line information are not available from tokens; use [`parse_source`] for a complete tree.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token]) -> Parsed {
    Parser::new(tokens).parse()
}

/// Lex and parse `source`, attaching comments, documentation and the line index to the tree.
///
/// Lex errors come first in the error list, followed by parse errors.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn parse_source(source: &str) -> Parsed {
    let lexed = crate::lexer::lex(source);
    let mut parsed = parse(&lexed.tokens);

    let mut errors = lexed.errors;
    errors.append(&mut parsed.errors);
    parsed.errors = errors;

    parsed.tree.line_index = LineIndex::new(source);
    parsed.tree.comments = lexed.comments;
    attach_doc_comments(&mut parsed.tree, source);
    tracing::debug!(
        nodes = parsed.tree.nodes.len(),
        errors = parsed.errors.len(),
        "parsed source"
    );
    parsed
}

/// Set `description` from a doc comment directly above a declaration, or a trailing doc comment on its line.
fn attach_doc_comments(tree: &mut SyntaxTree, source: &str) {
    let root = tree.root;
    let targets: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|&id| id != root && !matches!(tree.node(id).kind, NodeKind::Block(_)))
        .collect();

    for id in targets {
        let span = tree.node(id).span;
        let description = leading_doc(&tree.comments, source, span.start)
            .or_else(|| trailing_doc(&tree.comments, source, span.end));
        if let Some(text) = description {
            tree.node_mut(id).description = Some(text);
        }
    }
}

/// Consecutive doc comments that end right before `start` (only whitespace in between).
fn leading_doc(comments: &[Comment], source: &str, start: usize) -> Option<String> {
    let mut parts = Vec::new();
    let mut boundary = start;
    for comment in comments.iter().rev().filter(|c| c.span.end <= start) {
        let gap = source.get(comment.span.end..boundary)?;
        if !gap.chars().all(char::is_whitespace) || !comment.is_doc {
            break;
        }
        parts.push(doc_text(comment));
        boundary = comment.span.start;
    }
    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("\n"))
}

/// A doc comment after `end` on the same line, separated by nothing but `;`, `,` and spaces.
fn trailing_doc(comments: &[Comment], source: &str, end: usize) -> Option<String> {
    let comment = comments.iter().find(|c| c.span.start >= end)?;
    let gap = source.get(end..comment.span.start)?;
    let same_line = gap.chars().all(|c| matches!(c, ' ' | '\t' | ';' | ','));
    (comment.is_doc && same_line).then(|| doc_text(comment))
}

/// Comment text with per-line `*`/`+` decoration removed.
fn doc_text(comment: &Comment) -> String {
    comment
        .text
        .lines()
        .map(|line| line.trim().trim_start_matches(['*', '+', '/']).trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
