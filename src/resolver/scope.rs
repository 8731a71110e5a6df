//! Scope chain: caret blocks, local declarations and import visibility.

use std::collections::HashSet;
use std::sync::Arc;

use dscope_core::lang::keywords::KeywordId;
use dscope_syntax::ast::{ImportBinding, NodeId, NodeKind, Span, SyntaxTree};

use super::{Candidate, Lookup};
use crate::cache::ModuleEntry;

/// Module every D module imports implicitly.
const IMPLICIT_IMPORT: &str = "object";

/// Innermost block-like node (module, class-like, enum, method, statement block) whose extent contains `offset`.
///
/// Offsets outside every declaration map to the module root.
pub fn search_block_at(tree: &SyntaxTree, offset: usize) -> NodeId {
    let mut current = tree.root;
    'descend: loop {
        for &child in tree.children(current) {
            let node = tree.node(child);
            if node.is_block() && node.span.contains(offset) {
                current = child;
                continue 'descend;
            }
        }
        return current;
    }
}

/// Extent of the top-level statement of `block` that contains `offset`.
pub fn search_statement_at(tree: &SyntaxTree, block: NodeId, offset: usize) -> Option<Span> {
    tree.node(block).statements.iter().copied().find(|s| s.contains(offset))
}

/// Declarations `scope` itself contributes, in declaration order.
///
/// Inside function bodies and statement blocks only declarations written before `offset` count. Parameters and
/// template parameters belong to their owner's scope; values of an anonymous enum are visible in the enclosing one.
pub(super) fn local_declarations(tree: &SyntaxTree, scope: NodeId, offset: usize, name: Option<&str>) -> Vec<NodeId> {
    let node = tree.node(scope);
    let ordered = matches!(node.kind, NodeKind::Method(_) | NodeKind::Block(_));
    let matches = |id: NodeId| {
        let decl = tree.node(id);
        !decl.name.is_empty() && name.is_none_or(|n| decl.name == n)
    };

    let mut out: Vec<NodeId> = node.template_parameters.iter().copied().filter(|&id| matches(id)).collect();
    if let Some(method) = node.method() {
        out.extend(method.parameters.iter().copied().filter(|&id| matches(id)));
    }
    for &child in tree.children(scope) {
        let decl = tree.node(child);
        if ordered && decl.span.start > offset {
            continue;
        }
        if matches!(decl.kind, NodeKind::Enum) && decl.name.is_empty() {
            out.extend(tree.children(child).iter().copied().filter(|&id| matches(id)));
        } else if matches(child) {
            out.push(child);
        }
    }
    out
}

impl Lookup<'_> {
    /// Walk outward from `block`, then through the imports visible in `module`.
    pub(super) fn scope_chain(
        &mut self,
        module: &Arc<ModuleEntry>,
        block: NodeId,
        offset: usize,
        name: Option<&str>,
    ) -> Vec<Candidate> {
        let tree = &module.tree;
        let mut out = Vec::new();
        let mut proximity = 0;
        for scope in tree.ancestors(block) {
            if !tree.node(scope).is_block() {
                continue;
            }
            for id in local_declarations(tree, scope, offset, name) {
                out.push(Candidate::new(module, id, proximity));
            }
            if tree.node(scope).class_like().is_some() {
                let class = Candidate::new(module, scope, proximity);
                for base in self.base_classes(&class) {
                    out.extend(self.class_members(&base, name).into_iter().map(|mut c| {
                        c.proximity = proximity;
                        c
                    }));
                }
            }
            proximity += 1;
        }
        out.extend(self.imported_declarations(module, name, proximity));
        out
    }

    /// Matches from every module imported (directly, implicitly or through public imports) by `module`.
    pub(super) fn imported_declarations(
        &mut self,
        module: &Arc<ModuleEntry>,
        name: Option<&str>,
        proximity: usize,
    ) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (imported, bindings) in self.visible_imports(module) {
            out.extend(self.module_declarations(&imported, name, bindings.as_deref(), proximity));
        }
        out
    }

    /// Modules whose declarations are visible unqualified in `module`, with their selective-import filters.
    ///
    /// Static and renamed imports only make the module reachable by its qualified name or alias. Public imports of
    /// imported modules are followed transitively. Imports that are not cached are skipped.
    pub(super) fn visible_imports(&self, module: &ModuleEntry) -> Vec<(Arc<ModuleEntry>, Option<Vec<ImportBinding>>)> {
        let mut out = Vec::new();
        let mut visited = HashSet::from([module.name.clone()]);
        let mut pending: Vec<(String, Option<Vec<ImportBinding>>)> = module
            .tree
            .imports()
            .iter()
            .filter(|i| !i.is_static && i.alias.is_none())
            .map(|i| (i.module.clone(), (!i.bindings.is_empty()).then(|| i.bindings.clone())))
            .collect();
        if module.name != IMPLICIT_IMPORT {
            pending.push((IMPLICIT_IMPORT.to_string(), None));
        }

        while let Some((name, bindings)) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(entry) = self.cache.get(&name) else {
                continue;
            };
            if bindings.is_none() {
                pending.extend(
                    entry
                        .tree
                        .imports()
                        .iter()
                        .filter(|i| i.is_public && !i.is_static && i.alias.is_none())
                        .map(|i| (i.module.clone(), (!i.bindings.is_empty()).then(|| i.bindings.clone()))),
                );
            }
            out.push((entry, bindings));
        }
        out
    }

    /// Top-level declarations of `module` named `name`, restricted to `bindings` for selective imports.
    ///
    /// Private declarations are only visible from the module that declares them.
    pub(super) fn module_declarations(
        &self,
        module: &Arc<ModuleEntry>,
        name: Option<&str>,
        bindings: Option<&[ImportBinding]>,
        proximity: usize,
    ) -> Vec<Candidate> {
        let tree = &module.tree;
        let visible = |id: NodeId| module.name == self.origin || tree.node(id).protection() != KeywordId::Private;

        let Some(bindings) = bindings else {
            return local_declarations(tree, tree.root, usize::MAX, name)
                .into_iter()
                .filter(|&id| visible(id))
                .map(|id| Candidate::new(module, id, proximity))
                .collect();
        };

        let mut out = Vec::new();
        for binding in bindings {
            let visible_name = binding.alias.as_deref().unwrap_or(&binding.name);
            if name.is_some_and(|n| n != visible_name) {
                continue;
            }
            for id in local_declarations(tree, tree.root, usize::MAX, Some(&binding.name)) {
                if visible(id) {
                    let mut candidate = Candidate::new(module, id, proximity);
                    candidate.alias = binding.alias.clone();
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Modules reachable from `module` under the qualified name or alias `name` (`io` in `import io = std.stdio;`).
    pub(super) fn import_aliases(&self, module: &ModuleEntry, name: &str) -> Vec<Arc<ModuleEntry>> {
        module
            .tree
            .imports()
            .iter()
            .filter(|i| i.alias.as_deref() == Some(name) || (i.alias.is_none() && i.module == name))
            .filter_map(|i| self.cache.get(&i.module))
            .collect()
    }

    /// Enclosing class-like of `block`, for `this` and `super`.
    pub(super) fn enclosing_class(&self, module: &Arc<ModuleEntry>, block: NodeId) -> Option<Candidate> {
        module
            .tree
            .ancestors(block)
            .find(|&id| module.tree.node(id).class_like().is_some())
            .map(|id| Candidate::new(module, id, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    fn names(tree: &SyntaxTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.node(id).name.clone()).collect()
    }

    #[test]
    fn test_search_block_at_descends_to_innermost() {
        let source = "class C { int field; void f(int p) { if (p) { int inner; } } }";
        let tree = parse_source(source).tree;
        let at = |needle: &str| search_block_at(&tree, source.find(needle).unwrap());
        assert_eq!(tree.node(at("inner")).kind.label(), "block");
        assert_eq!(tree.node(at("int p")).name, "f");
        assert_eq!(tree.node(at("void")).name, "f");
        assert_eq!(tree.node(at("field")).name, "C");
        assert_eq!(tree.node(at(" int field")).name, "C");
        assert_eq!(at("class"), tree.root);
    }

    #[test]
    fn test_function_locals_respect_declaration_order() {
        let source = "void f(int p) { int before; /*here*/ int after; }";
        let tree = parse_source(source).tree;
        let offset = source.find("/*here*/").unwrap();
        let block = search_block_at(&tree, offset);
        let found = local_declarations(&tree, block, offset, None);
        assert_eq!(names(&tree, &found), ["p", "before"]);
    }

    #[test]
    fn test_anonymous_enum_values_flatten_into_scope() {
        let tree = parse_source("enum { Red, Green } enum Named { Blue }").tree;
        let found = local_declarations(&tree, tree.root, 0, None);
        assert_eq!(names(&tree, &found), ["Red", "Green", "Named"]);
    }

    #[test]
    fn test_template_parameters_are_in_scope() {
        let source = "T id(T)(T value) { return value; }";
        let tree = parse_source(source).tree;
        let method = tree.children(tree.root)[0];
        let found = local_declarations(&tree, method, source.len(), None);
        assert_eq!(names(&tree, &found), ["T", "value"]);
    }

    #[test]
    fn test_search_statement_at() {
        let source = "void f() { int a = 1; a += 2; }";
        let tree = parse_source(source).tree;
        let method = tree.children(tree.root)[0];
        let statement = search_statement_at(&tree, method, source.find("+=").unwrap()).unwrap();
        assert_eq!(&source[statement.start..statement.end], "a += 2;");
    }
}
