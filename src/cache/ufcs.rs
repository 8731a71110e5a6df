//! UFCS index: free functions callable as members of their first parameter's type.
//!
//! `void shout(string s)` at module level makes `"hi".shout()` valid; the index maps the first parameter's type name
//! (`string`) to every such function across cached modules. Contributions are keyed by module so a re-parse can
//! retract exactly what the old tree added.

use std::collections::HashMap;

use dscope_core::lang::keywords;
use dscope_syntax::ast::{MethodKind, NodeId, NodeKind, SyntaxTree};
use dscope_syntax::types::TypeDecl;

/// A free function usable with member syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UfcsMethod {
    pub module: String,
    pub node: NodeId,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct UfcsIndex {
    by_type: HashMap<String, Vec<UfcsMethod>>,
    /// Type keys each module contributed to
    by_module: HashMap<String, Vec<String>>,
}

impl UfcsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the module-level functions of `tree` under `module`.
    pub fn add_module(&mut self, module: &str, tree: &SyntaxTree) {
        let contributions = contributions(module, tree);
        if contributions.is_empty() {
            return;
        }
        let keys = self.by_module.entry(module.to_string()).or_default();
        for (key, method) in contributions {
            if !keys.contains(&key) {
                keys.push(key.clone());
            }
            self.by_type.entry(key).or_default().push(method);
        }
    }

    /// Remove everything `module` contributed.
    pub fn retract_module(&mut self, module: &str) {
        let Some(keys) = self.by_module.remove(module) else {
            return;
        };
        for key in keys {
            if let Some(methods) = self.by_type.get_mut(&key) {
                methods.retain(|m| m.module != module);
                if methods.is_empty() {
                    self.by_type.remove(&key);
                }
            }
        }
    }

    /// Functions whose first parameter has type `type_name`, optionally filtered by function name.
    pub fn candidates<'a>(&'a self, type_name: &str, name: Option<&'a str>) -> impl Iterator<Item = &'a UfcsMethod> {
        self.by_type
            .get(type_name)
            .into_iter()
            .flatten()
            .filter(move |m| name.is_none_or(|n| m.name == n))
    }

    /// Total number of indexed functions.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Key a type is indexed under: the last identifier (`a.Foo!(int)` -> `Foo`) or the basic type keyword, after
/// stripping type constructors.
pub fn type_key(ty: &TypeDecl) -> Option<String> {
    match ty.unqualified() {
        TypeDecl::Basic(kw) => Some(keywords::as_str(*kw).to_string()),
        other => other.name().map(str::to_string),
    }
}

fn contributions(module: &str, tree: &SyntaxTree) -> Vec<(String, UfcsMethod)> {
    let mut out = Vec::new();
    for &id in tree.children(tree.root) {
        let node = tree.node(id);
        let NodeKind::Method(data) = &node.kind else {
            continue;
        };
        if data.kind != MethodKind::Normal {
            continue;
        }
        let first = data.parameters.first().and_then(|&p| tree.node(p).ty.as_ref());
        if let Some(key) = first.and_then(type_key) {
            out.push((
                key,
                UfcsMethod {
                    module: module.to_string(),
                    node: id,
                    name: node.name.clone(),
                },
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    #[test]
    fn test_indexes_first_parameter_type() {
        let parsed = parse_source("void shout(string s) {} int twice(const(int) x) { return 2*x; } void none() {}");
        let mut index = UfcsIndex::new();
        index.add_module("text", &parsed.tree);
        assert_eq!(index.len(), 2);
        let names: Vec<_> = index.candidates("string", None).map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["shout"]);
        assert_eq!(index.candidates("int", Some("twice")).count(), 1);
        assert_eq!(index.candidates("int", Some("other")).count(), 0);
    }

    #[test]
    fn test_retract_removes_only_that_module() {
        let a = parse_source("void f(Foo x) {}");
        let b = parse_source("void g(Foo x) {}");
        let mut index = UfcsIndex::new();
        index.add_module("a", &a.tree);
        index.add_module("b", &b.tree);
        index.retract_module("a");
        let names: Vec<_> = index.candidates("Foo", None).map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["g"]);
        index.retract_module("b");
        assert!(index.is_empty());
    }
}
