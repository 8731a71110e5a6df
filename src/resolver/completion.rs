//! Completion lists and call signatures at the caret.

use std::collections::HashMap;
use std::sync::Arc;

use dscope_syntax::ast::{ExprId, NodeKind};
use dscope_syntax::context::{TokenContext, char_boundary_at, token_context};
use dscope_syntax::expressions::Expr;
use dscope_syntax::printer::render_declaration;

use super::scope::search_block_at;
use super::{Candidate, Lookup, Target, dotted_name_at};
use crate::cache::{ModuleCache, ModuleEntry};

/// One completion entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub name: String,
    /// Node kind label (`"variable"`, `"class"`, `"module"`, ...)
    pub kind: &'static str,
    /// Module declaring the symbol
    pub module: String,
    pub proximity: usize,
}

impl CompletionItem {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name().to_string(),
            kind: candidate.node().kind.label(),
            module: candidate.module.name.clone(),
            proximity: candidate.proximity,
        }
    }
}

/// Symbols that may be typed at `offset`.
///
/// After `chain.` the members of whatever `chain` resolves to are listed; otherwise everything visible in the scope
/// chain. The identifier already typed before the caret filters by prefix. Comments and strings get nothing, and so
/// does a configuration with completion switched off.
pub fn completion_candidates(cache: &ModuleCache, module: &Arc<ModuleEntry>, offset: usize) -> Vec<CompletionItem> {
    if !cache.config().code_completion || token_context(&module.source, offset) != TokenContext::Code {
        return Vec::new();
    }
    let offset = char_boundary_at(&module.source, offset);
    let source = module.source.as_bytes();
    let mut start = offset;
    while start > 0 && (source[start - 1].is_ascii_alphanumeric() || source[start - 1] == b'_') {
        start -= 1;
    }
    let prefix = &module.source[start..offset];

    let mut lookup = Lookup::new(cache, module);
    let candidates = if start > 0 && source[start - 1] == b'.' {
        let chain = dotted_name_at(&module.source, start - 1);
        let parts: Vec<&str> = chain.iter().map(String::as_str).collect();
        let targets = lookup.path_targets(module, &parts, offset);
        let mut items = Vec::new();
        for target in &targets {
            for member in lookup.member_targets(target, None) {
                match member {
                    Target::Symbol(candidate) => items.push(CompletionItem::from_candidate(&candidate)),
                    Target::Package { name, proximity } => items.push(package_item(&name, proximity)),
                }
            }
        }
        items
    } else {
        let block = search_block_at(&module.tree, offset);
        let mut items: Vec<CompletionItem> = lookup
            .scope_chain(module, block, offset, None)
            .iter()
            .map(CompletionItem::from_candidate)
            .collect();
        let outer = module.tree.ancestors(block).count();
        for import in module.tree.imports() {
            let name = import.alias.clone().unwrap_or_else(|| first_segment(&import.module).to_string());
            items.push(CompletionItem {
                name,
                kind: NodeKind::Module.label(),
                module: import.module.clone(),
                proximity: outer,
            });
        }
        items
    };

    rank(candidates.into_iter().filter(|item| item.name.starts_with(prefix)).collect())
}

fn package_item(name: &str, proximity: usize) -> CompletionItem {
    CompletionItem {
        name: name.rsplit('.').next().unwrap_or(name).to_string(),
        kind: "package",
        module: name.to_string(),
        proximity,
    }
}

fn first_segment(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}

/// One entry per name, keeping the closest declaration; closest first, then alphabetical.
fn rank(items: Vec<CompletionItem>) -> Vec<CompletionItem> {
    let mut best: HashMap<String, CompletionItem> = HashMap::new();
    for item in items {
        match best.get(&item.name) {
            Some(existing) if existing.proximity <= item.proximity => {}
            _ => {
                best.insert(item.name.clone(), item);
            }
        }
    }
    let mut out: Vec<CompletionItem> = best.into_values().collect();
    out.sort_by(|a, b| a.proximity.cmp(&b.proximity).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Signatures of the function being called around `offset`: every overload the callee resolves to. Calls of a
/// class-like (constructors, `new T(...)`) list its constructors.
pub fn method_insight(cache: &ModuleCache, module: &Arc<ModuleEntry>, offset: usize) -> Vec<String> {
    if !cache.config().method_insight {
        return Vec::new();
    }
    let Some((callee, is_new)) = enclosing_call(module, offset) else {
        return Vec::new();
    };
    let mut lookup = Lookup::new(cache, module);
    let block = search_block_at(&module.tree, offset);
    let targets = match callee {
        Callee::Expr(expr) => lookup.expr_targets(module, expr, offset),
        Callee::Type(ty) => lookup.type_targets(module, &ty, block, offset),
    };

    let mut out = Vec::new();
    for target in targets {
        let Target::Symbol(candidate) = target else {
            continue;
        };
        let tree = &candidate.module.tree;
        match &candidate.node().kind {
            NodeKind::Method(_) if !is_new => out.push(render_declaration(tree, candidate.node)),
            NodeKind::ClassLike(_) => {
                out.extend(tree.children_named(candidate.node, "this").map(|id| render_declaration(tree, id)));
            }
            _ => {}
        }
    }
    out.dedup();
    out
}

enum Callee {
    Expr(ExprId),
    Type(dscope_syntax::types::TypeDecl),
}

/// Innermost call or `new` whose argument list contains `offset`.
fn enclosing_call(module: &ModuleEntry, offset: usize) -> Option<(Callee, bool)> {
    let tree = &module.tree;
    let mut best: Option<(usize, Callee, bool)> = None;
    for (_, expr) in tree.exprs.iter() {
        if !expr.span.contains(offset) {
            continue;
        }
        let found = match &expr.node {
            Expr::Call { callee, .. } if offset > tree.expr(*callee).span.end => Some((Callee::Expr(*callee), false)),
            Expr::New { ty, .. } => Some((Callee::Type(ty.clone()), true)),
            _ => None,
        };
        let Some((callee, is_new)) = found else {
            continue;
        };
        if best.as_ref().is_none_or(|(len, ..)| expr.span.len() < *len) {
            best = Some((expr.span.len(), callee, is_new));
        }
    }
    best.map(|(_, callee, is_new)| (callee, is_new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn setup(sources: &[(&str, &str)]) -> Arc<ModuleCache> {
        let cache = Arc::new(ModuleCache::new(Arc::new(AnalysisConfig::default())));
        for (name, source) in sources {
            cache.replace_module(ModuleEntry::parse(name, None, *source));
        }
        cache
    }

    fn names(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_completes_visible_names_with_prefix() {
        let source = "import util; int counter; void f() { int count; co }";
        let cache = setup(&[("util", "int correct; private int coy;"), ("app", source)]);
        let app = cache.get("app").unwrap();
        let offset = source.find(" }").unwrap();
        let items = completion_candidates(&cache, &app, offset);
        assert_eq!(names(&items), ["count", "counter", "correct"]);
        assert_eq!(items[0].kind, "variable");
    }

    #[test]
    fn test_member_completion_after_dot() {
        let source = "struct P { int x; int y; void move() {} } void f() { P p; p. }";
        let cache = setup(&[("app", source)]);
        let app = cache.get("app").unwrap();
        let offset = source.find("p. ").unwrap() + 2;
        let items = completion_candidates(&cache, &app, offset);
        assert_eq!(names(&items), ["move", "x", "y"]);
    }

    #[test]
    fn test_nothing_in_comments_or_when_disabled() {
        let source = "int value; // va";
        let cache = setup(&[("app", source)]);
        let app = cache.get("app").unwrap();
        assert!(completion_candidates(&cache, &app, source.len()).is_empty());

        let config = AnalysisConfig::default().with_code_completion(false);
        let disabled = ModuleCache::new(Arc::new(config));
        let entry = disabled.replace_module(ModuleEntry::parse("app", None, "int value; "));
        assert!(completion_candidates(&disabled, &entry, 11).is_empty());
    }

    #[test]
    fn test_offsets_inside_multibyte_characters() {
        let source = "int größe; int grün; void f() { grö }";
        let cache = setup(&[("app", source)]);
        let app = cache.get("app").unwrap();
        let inside = source.rfind('ö').unwrap() + 1;
        assert_eq!(names(&completion_candidates(&cache, &app, inside)), ["größe", "grün"]);
        for offset in 0..=source.len() + 1 {
            let _ = completion_candidates(&cache, &app, offset);
            let _ = method_insight(&cache, &app, offset);
            let _ = crate::resolver::goto_definition(&cache, &app, offset);
        }
    }

    #[test]
    fn test_method_insight_lists_overloads() {
        let source = "void put(int x) {} void put(string s, int n) {} void f() { put(1); }";
        let cache = setup(&[("app", source)]);
        let app = cache.get("app").unwrap();
        let offset = source.find("put(1").unwrap() + 4;
        let signatures = method_insight(&cache, &app, offset);
        assert_eq!(signatures, ["void put(int x)", "void put(string s, int n)"]);
    }

    #[test]
    fn test_method_insight_for_constructors() {
        let source = "class C { this(int a) {} } void f() { auto c = new C(1); }";
        let cache = setup(&[("app", source)]);
        let app = cache.get("app").unwrap();
        let offset = source.find("C(1").unwrap() + 2;
        assert_eq!(method_insight(&cache, &app, offset), ["this(int a)"]);
    }
}
