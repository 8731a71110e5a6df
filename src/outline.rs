//! Folding ranges and the type/member navigation lists of an editor's outline bar.

use std::collections::VecDeque;

use dscope_syntax::ast::{NodeId, NodeKind, Span, SyntaxTree};
use dscope_syntax::lexer::CommentKind;

use crate::resolver::search_block_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldKind {
    /// Body of a class-like, enum or function
    Declaration,
    /// Statement block
    Block,
    Comment,
}

/// A collapsible region; lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldingRange {
    pub span: Span,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: FoldKind,
}

/// Every body or block comment spanning more than one line, ordered by start.
pub fn folding_ranges(tree: &SyntaxTree) -> Vec<FoldingRange> {
    let mut out = Vec::new();
    for id in tree.descendants(tree.root) {
        let node = tree.node(id);
        let Some(body) = node.body else {
            continue;
        };
        let kind = match node.kind {
            NodeKind::Module => continue,
            NodeKind::Block(_) => FoldKind::Block,
            _ => FoldKind::Declaration,
        };
        out.extend(range(tree, body, kind));
    }
    for comment in &tree.comments {
        if comment.kind != CommentKind::Line {
            out.extend(range(tree, comment.span, FoldKind::Comment));
        }
    }
    out.sort_by_key(|r| (r.span.start, r.span.end));
    out
}

fn range(tree: &SyntaxTree, span: Span, kind: FoldKind) -> Option<FoldingRange> {
    let start_line = tree.location(span.start).line;
    let end_line = tree.location(span.end.saturating_sub(1).max(span.start)).line;
    (start_line < end_line).then_some(FoldingRange {
        span,
        start_line,
        end_line,
        kind,
    })
}

/// One entry of a navigation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    pub node: NodeId,
    pub name: String,
    pub kind: &'static str,
    /// Line of the declared name
    pub line: usize,
}

impl OutlineItem {
    fn new(tree: &SyntaxTree, id: NodeId) -> Self {
        let node = tree.node(id);
        Self {
            node: id,
            name: node.name.clone(),
            kind: node.kind.label(),
            line: tree.location(node.name_span.start).line,
        }
    }
}

/// Types of a module and which one the caret is in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeLookup {
    pub types: Vec<OutlineItem>,
    /// Index into `types` of the innermost type containing the caret
    pub selected: Option<usize>,
}

impl TypeLookup {
    pub fn selected_item(&self) -> Option<&OutlineItem> {
        self.selected.and_then(|i| self.types.get(i))
    }
}

/// All named class-likes and enums, nested ones included, sorted by name.
pub fn type_lookup(tree: &SyntaxTree, offset: usize) -> TypeLookup {
    let mut found = Vec::new();
    let mut queue: VecDeque<NodeId> = tree.children(tree.root).iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        let node = tree.node(id);
        if matches!(node.kind, NodeKind::ClassLike(_) | NodeKind::Enum) && !node.name.is_empty() {
            found.push(OutlineItem::new(tree, id));
        }
        queue.extend(tree.children(id));
    }
    found.sort_by(|a, b| a.name.cmp(&b.name).then(a.line.cmp(&b.line)));

    let block = search_block_at(tree, offset);
    let enclosing = tree
        .ancestors(block)
        .find(|&id| matches!(tree.node(id).kind, NodeKind::ClassLike(_) | NodeKind::Enum));
    let selected = enclosing.and_then(|id| found.iter().position(|item| item.node == id));
    TypeLookup { types: found, selected }
}

/// Named direct members of `block`, in source order.
pub fn member_lookup(tree: &SyntaxTree, block: NodeId) -> Vec<OutlineItem> {
    tree.children(block)
        .iter()
        .copied()
        .filter(|&id| !tree.node(id).name.is_empty())
        .map(|id| OutlineItem::new(tree, id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    const SOURCE: &str = "\
module shapes;
class Shape {
    int sides;
    void draw() {
        if (sides > 0) {
            sides--;
        }
    }
}
/* two
   lines */
enum Color { Red, Green }
struct Point { int x; int y; }
";

    fn render(items: &[OutlineItem], selected: Option<usize>) -> String {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = if Some(i) == selected { "*" } else { "-" };
                format!("{marker} {} {} (line {})", item.kind, item.name, item.line)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_folding_ranges() {
        let tree = parse_source(SOURCE).tree;
        let ranges: Vec<String> = folding_ranges(&tree)
            .iter()
            .map(|r| format!("{:?} {}-{}", r.kind, r.start_line, r.end_line))
            .collect();
        insta::assert_snapshot!(ranges.join("\n"), @r"
        Declaration 2-9
        Declaration 4-8
        Block 5-7
        Comment 10-11
        ");
    }

    #[test]
    fn test_type_lookup_marks_caret_type() {
        let tree = parse_source(SOURCE).tree;
        let lookup = type_lookup(&tree, SOURCE.find("int y").unwrap());
        insta::assert_snapshot!(render(&lookup.types, lookup.selected), @r"
        - enum Color (line 12)
        * struct Point (line 13)
        - class Shape (line 2)
        ");
        assert_eq!(lookup.selected_item().map(|i| i.name.as_str()), Some("Point"));

        let outside = type_lookup(&tree, 0);
        assert_eq!(outside.selected, None);
    }

    #[test]
    fn test_member_lookup() {
        let tree = parse_source(SOURCE).tree;
        let lookup = type_lookup(&tree, SOURCE.find("sides--").unwrap());
        let shape = lookup.selected_item().unwrap().node;
        insta::assert_snapshot!(render(&member_lookup(&tree, shape), None), @r"
        - variable sides (line 3)
        - method draw (line 4)
        ");
    }
}
