//! Post-parse type-reference scan.
//!
//! Walks every declared type in a module (variables, parameters, return types, enum bases, base-class lists) and
//! reports identifier types that resolve to nothing. The result feeds semantic highlighting and the error list.
//!
//! ## Notes
//! - The scan is skipped (`None`) when semantic highlighting is off, and deferred while a bulk scan is rebuilding the
//!   cache: results computed against a half-populated cache would flag every library type.
//! - Names the implicit `object` module defines are taken for granted while that module is not cached.

use std::sync::Arc;

use dscope_syntax::ast::{CodeLocation, NodeId, NodeKind, Span, SyntaxTree};
use dscope_syntax::types::{TypeDecl, TypeOrExpr};

use crate::cache::{ModuleCache, ModuleEntry};
use crate::diagnostics::ErrorRecord;
use crate::resolver;

/// Aliases and classes `object` declares.
const OBJECT_NAMES: &[&str] = &[
    "string",
    "wstring",
    "dstring",
    "size_t",
    "ptrdiff_t",
    "hash_t",
    "Object",
    "Throwable",
    "Exception",
    "Error",
    "TypeInfo",
    "ClassInfo",
];

/// An identifier type nothing in scope declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedType {
    pub name: String,
    /// Where the name is written, or the declaration's extent when the name cannot be located
    pub span: Span,
    pub location: CodeLocation,
}

impl UnresolvedType {
    pub fn to_record(&self, entry: &ModuleEntry) -> ErrorRecord {
        ErrorRecord::semantic(
            format!("undefined type `{}`", self.name),
            self.span,
            &entry.tree.line_index,
            entry.path.clone(),
        )
    }
}

/// Unresolved type references of `entry`, in declaration order.
#[tracing::instrument(skip_all, fields(module = %entry.name))]
pub fn scan_type_references(cache: &ModuleCache, entry: &Arc<ModuleEntry>) -> Option<Vec<UnresolvedType>> {
    if !cache.config().semantic_highlighting {
        return None;
    }
    if cache.is_parsing() {
        tracing::debug!("bulk scan in progress; type reference scan deferred");
        return None;
    }
    let assume_object = !cache.contains("object");
    let tree = &entry.tree;

    let mut out = Vec::new();
    for id in declarations(tree) {
        let node = tree.node(id);
        let mut types: Vec<&TypeDecl> = node.ty.iter().collect();
        if let Some(class) = node.class_like() {
            types.extend(&class.base_classes);
        }
        for ty in types {
            let mut references = Vec::new();
            collect_references(ty, &mut references);
            for parts in references {
                let Some(&last) = parts.last() else {
                    continue;
                };
                if assume_object && parts.len() == 1 && OBJECT_NAMES.contains(&last) {
                    continue;
                }
                if resolver::resolve_path(cache, entry, &parts, node.span.start).is_empty() {
                    let span = name_span(&entry.source, node.span, last);
                    out.push(UnresolvedType {
                        name: parts.join("."),
                        span,
                        location: tree.location(span.start),
                    });
                }
            }
        }
    }
    tracing::debug!(unresolved = out.len(), "type references scanned");
    Some(out)
}

/// Every node, plus parameters and template parameters, in source order.
fn declarations(tree: &SyntaxTree) -> Vec<NodeId> {
    let mut out = Vec::new();
    for id in tree.descendants(tree.root) {
        let node = tree.node(id);
        out.extend(&node.template_parameters);
        if let Some(method) = node.method() {
            out.extend(&method.parameters);
        }
        if !matches!(node.kind, NodeKind::Module | NodeKind::Block(_)) {
            out.push(id);
        }
    }
    out.sort_by_key(|&id| tree.node(id).span.start);
    out
}

/// Dotted identifier chains a type declaration names: `Foo`, `a.b.Bar`, template arguments, delegate parameters.
fn collect_references<'t>(ty: &'t TypeDecl, out: &mut Vec<Vec<&'t str>>) {
    match ty {
        TypeDecl::Identifier(_) | TypeDecl::Qualified { .. } => {
            if let Some(chain) = ty.identifier_chain() {
                out.push(chain);
            }
            if let TypeDecl::Qualified { inner, member } = ty {
                collect_template_arguments(inner, out);
                collect_template_arguments(member, out);
            }
        }
        TypeDecl::TemplateInstance { name, .. } => {
            out.push(vec![name.as_str()]);
            collect_template_arguments(ty, out);
        }
        TypeDecl::Delegate {
            return_type,
            parameters,
            ..
        } => {
            collect_references(return_type, out);
            for parameter in parameters {
                if let Some(ty) = &parameter.ty {
                    collect_references(ty, out);
                }
            }
        }
        other => {
            if let Some(base) = other.base() {
                collect_references(base, out);
            }
        }
    }
}

fn collect_template_arguments<'t>(ty: &'t TypeDecl, out: &mut Vec<Vec<&'t str>>) {
    if let TypeDecl::TemplateInstance { args, .. } = ty {
        for arg in args {
            if let TypeOrExpr::Type(arg) = arg {
                collect_references(arg, out);
            }
        }
    }
}

/// Span of the first standalone occurrence of `name` inside `within`.
fn name_span(source: &str, within: Span, name: &str) -> Span {
    let Some(text) = source.get(within.start..within.end.min(source.len())) else {
        return within;
    };
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    for (i, _) in text.match_indices(name) {
        let before = text[..i].chars().next_back();
        let after = text[i + name.len()..].chars().next();
        if !is_word(before) && !is_word(after) {
            let start = within.start + i;
            return Span::new(start, start + name.len());
        }
    }
    within
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::diagnostics::{Origin, Severity};

    fn scan(config: AnalysisConfig, modules: &[(&str, &str)], target: &str) -> Option<Vec<UnresolvedType>> {
        let cache = Arc::new(ModuleCache::new(Arc::new(config)));
        for (name, source) in modules {
            cache.replace_module(ModuleEntry::parse(name, None, *source));
        }
        let entry = cache.get(target).expect("cached");
        scan_type_references(&cache, &entry)
    }

    fn names(found: &[UnresolvedType]) -> Vec<&str> {
        found.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_reports_only_unknown_types() {
        let source = "import lib; class Local {} Local a; Remote b; Missing c; int d; string e; void f(Gone g) {}";
        let found = scan(
            AnalysisConfig::default(),
            &[("lib", "struct Remote {}"), ("app", source)],
            "app",
        )
        .unwrap();
        assert_eq!(names(&found), ["Missing", "Gone"]);
        assert_eq!(&source[found[0].span.start..found[0].span.end], "Missing");
    }

    #[test]
    fn test_template_parameters_and_arguments() {
        let source = "T id(T)(T value) { return value; } Box!(Nope) boxed; struct Box(U) { U item; }";
        let found = scan(AnalysisConfig::default(), &[("app", source)], "app").unwrap();
        assert_eq!(names(&found), ["Nope"]);
    }

    #[test]
    fn test_qualified_chains_and_base_classes() {
        let source = "import pkg.mod; pkg.mod.Thing t; pkg.mod.Other o; class C : Base {}";
        let found = scan(
            AnalysisConfig::default(),
            &[("pkg.mod", "class Thing {}"), ("app", source)],
            "app",
        )
        .unwrap();
        assert_eq!(names(&found), ["pkg.mod.Other", "Base"]);
    }

    #[test]
    fn test_disabled_or_deferred() {
        let config = AnalysisConfig::default().with_semantic_highlighting(false);
        assert!(scan(config, &[("app", "Missing m;")], "app").is_none());

        let cache = Arc::new(ModuleCache::new(Arc::new(AnalysisConfig::default())));
        let entry = cache.replace_module(ModuleEntry::parse("app", None, "Missing m;"));
        let guard = cache.begin_bulk_parse();
        assert!(scan_type_references(&cache, &entry).is_none());
        drop(guard);
        assert_eq!(scan_type_references(&cache, &entry).map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_records_are_semantic_warnings() {
        let entry = ModuleEntry::parse("app", None, "int x;\nMissing m;");
        let unresolved = UnresolvedType {
            name: "Missing".into(),
            span: Span::new(7, 14),
            location: CodeLocation::new(2, 1),
        };
        let record = unresolved.to_record(&entry);
        assert_eq!(record.origin, Origin::Semantic);
        assert_eq!(record.severity, Severity::Warning);
        assert_eq!(record.location, CodeLocation::new(2, 1));
    }
}
