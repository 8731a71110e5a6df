//! Member access and declared-type lookup.
//!
//! A candidate's members are the members of the types it stands for: a class-like or enum stands for itself, a
//! module for its top-level declarations, and a variable, function or alias for its declared (or inferred) type.
//! When the direct search finds nothing, free functions taking the type as first parameter are tried (UFCS).

use std::collections::HashSet;
use std::sync::Arc;

use dscope_core::lang::keywords::KeywordId;
use dscope_syntax::ast::{ExprId, NodeId, NodeKind};
use dscope_syntax::expressions::{Expr, Literal, Member, UnaryOp};
use dscope_syntax::type_of::type_of;
use dscope_syntax::types::{TypeDecl, TypeofArg};

use super::scope::{local_declarations, search_block_at};
use super::{Candidate, Lookup, Target};
use crate::cache::{ModuleEntry, ufcs};

impl Lookup<'_> {
    // ------------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------------

    /// First segment of a dotted name: scoped declarations, import aliases, this module, packages.
    pub(super) fn path_start(&mut self, module: &Arc<ModuleEntry>, block: NodeId, offset: usize, name: &str) -> Vec<Target> {
        let mut out: Vec<Target> = self
            .scope_chain(module, block, offset, Some(name))
            .into_iter()
            .map(Target::Symbol)
            .collect();
        let outer = module.tree.ancestors(block).count();
        for imported in self.import_aliases(module, name) {
            out.push(Target::Symbol(Candidate::module_root(&imported, outer)));
        }
        if module.name == name {
            out.push(Target::Symbol(Candidate::module_root(module, outer)));
        }
        if !self.cache.modules_in_package(name).is_empty() {
            out.push(Target::Package {
                name: name.to_string(),
                proximity: outer,
            });
        }
        out
    }

    pub(super) fn path_targets(&mut self, module: &Arc<ModuleEntry>, path: &[&str], offset: usize) -> Vec<Target> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let block = search_block_at(&module.tree, offset);
        let mut targets = self.path_start(module, block, offset, first);
        for part in rest {
            targets = targets
                .iter()
                .flat_map(|t| self.member_targets(t, Some(*part)))
                .collect();
        }
        targets
    }

    /// Members of a lookup target; `None` lists them all.
    pub(super) fn member_targets(&mut self, target: &Target, name: Option<&str>) -> Vec<Target> {
        match target {
            Target::Symbol(candidate) => self.members(candidate, name).into_iter().map(Target::Symbol).collect(),
            Target::Package { name: package, proximity } => self.package_members(package, name, *proximity),
        }
    }

    /// `std.stdio` is a module of package `std`; `std.container` may be a module or a sub-package.
    fn package_members(&self, package: &str, name: Option<&str>, proximity: usize) -> Vec<Target> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let prefix_len = package.len() + 1;
        for entry in self.cache.modules_in_package(package) {
            let rest = &entry.name[prefix_len..];
            let segment = rest.split('.').next().unwrap_or(rest);
            if name.is_some_and(|n| n != segment) || !seen.insert(segment.to_string()) {
                continue;
            }
            let full = format!("{package}.{segment}");
            if let Some(module) = self.cache.get(&full) {
                out.push(Target::Symbol(Candidate::module_root(&module, proximity)));
            }
            if !self.cache.modules_in_package(&full).is_empty() {
                out.push(Target::Package { name: full, proximity });
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    /// Members of `candidate` named `name` (or all of them), falling back to UFCS functions for a named lookup.
    pub(super) fn members(&mut self, candidate: &Candidate, name: Option<&str>) -> Vec<Candidate> {
        let mut out = Vec::new();
        for ty in self.type_symbols(candidate) {
            out.extend(self.direct_members(&ty, name));
        }
        if let (true, Some(name)) = (out.is_empty(), name) {
            if let Some(key) = self.ufcs_key(candidate) {
                out.extend(self.ufcs_functions(&key, name));
            }
        }
        out
    }

    fn direct_members(&mut self, ty: &Candidate, name: Option<&str>) -> Vec<Candidate> {
        match ty.node().kind {
            NodeKind::Module => {
                let mut out = self.module_declarations(&ty.module, name, None, 0);
                let reexported: Vec<_> = ty
                    .module
                    .tree
                    .imports()
                    .iter()
                    .filter(|i| i.is_public && !i.is_static && i.alias.is_none())
                    .filter_map(|i| Some((self.cache.get(&i.module)?, i.bindings.clone())))
                    .collect();
                for (module, bindings) in reexported {
                    let bindings = (!bindings.is_empty()).then_some(bindings.as_slice());
                    out.extend(self.module_declarations(&module, name, bindings, 0));
                }
                out
            }
            NodeKind::ClassLike(_) => self.class_members(ty, name),
            NodeKind::Enum => local_declarations(&ty.module.tree, ty.node, usize::MAX, name)
                .into_iter()
                .map(|id| Candidate::new(&ty.module, id, 0))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Members of a class-like, including inherited ones.
    pub(super) fn class_members(&mut self, class: &Candidate, name: Option<&str>) -> Vec<Candidate> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_class_members(class, name, &mut visited, &mut out);
        out
    }

    fn collect_class_members(
        &mut self,
        class: &Candidate,
        name: Option<&str>,
        visited: &mut HashSet<(String, NodeId)>,
        out: &mut Vec<Candidate>,
    ) {
        if !visited.insert((class.module.name.clone(), class.node)) {
            return;
        }
        out.extend(
            local_declarations(&class.module.tree, class.node, usize::MAX, name)
                .into_iter()
                .map(|id| Candidate::new(&class.module, id, 0)),
        );
        for base in self.base_classes(class) {
            self.collect_class_members(&base, name, visited, out);
        }
    }

    /// Resolved base classes and interfaces of a class-like.
    pub(super) fn base_classes(&mut self, class: &Candidate) -> Vec<Candidate> {
        let Some(data) = class.node().class_like() else {
            return Vec::new();
        };
        let bases = data.base_classes.clone();
        let block = class.module.tree.parent(class.node).unwrap_or(class.module.tree.root);
        let offset = class.node().span.start;
        let mut out = Vec::new();
        for base in &bases {
            for target in self.type_targets(&class.module, base, block, offset) {
                if let Target::Symbol(candidate) = target {
                    out.extend(
                        self.type_symbols(&candidate)
                            .into_iter()
                            .filter(|c| c.node().class_like().is_some() && c != class),
                    );
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Declared types
    // ------------------------------------------------------------------------

    /// The type declarations `candidate` stands for.
    pub(super) fn type_symbols(&mut self, candidate: &Candidate) -> Vec<Candidate> {
        match &candidate.node().kind {
            NodeKind::Module | NodeKind::ClassLike(_) | NodeKind::Enum => return vec![candidate.clone()],
            NodeKind::Block(_) | NodeKind::TemplateParameter(_) => return Vec::new(),
            NodeKind::EnumValue { .. } if candidate.node().ty.is_none() => {
                let tree = &candidate.module.tree;
                return tree
                    .parent(candidate.node)
                    .filter(|&p| !tree.node(p).name.is_empty())
                    .map(|p| vec![Candidate::new(&candidate.module, p, candidate.proximity)])
                    .unwrap_or_default();
            }
            _ => {}
        }
        let Some(ty) = declared_type(candidate) else {
            return Vec::new();
        };
        let module = Arc::clone(&candidate.module);
        let block = module.tree.parent(candidate.node).unwrap_or(module.tree.root);
        let offset = candidate.node().span.start;
        self.nested(|lookup| {
            let mut out = Vec::new();
            for target in lookup.type_targets(&module, &ty, block, offset) {
                match target {
                    Target::Symbol(found) if found != *candidate => out.extend(lookup.type_symbols(&found)),
                    _ => {}
                }
            }
            out
        })
    }

    /// Targets a type declaration written in `block` names.
    pub(super) fn type_targets(
        &mut self,
        module: &Arc<ModuleEntry>,
        ty: &TypeDecl,
        block: NodeId,
        offset: usize,
    ) -> Vec<Target> {
        self.nested(|lookup| match ty {
            TypeDecl::Basic(_) => Vec::new(),
            TypeDecl::Identifier(name) | TypeDecl::TemplateInstance { name, .. } => {
                lookup.path_start(module, block, offset, name)
            }
            TypeDecl::Qualified { inner, member } => {
                let Some(name) = member.name() else {
                    return Vec::new();
                };
                let inner = lookup.type_targets(module, inner, block, offset);
                inner.iter().flat_map(|t| lookup.member_targets(t, Some(name))).collect()
            }
            TypeDecl::ModuleScope(inner) => lookup.type_targets(module, inner, module.tree.root, usize::MAX),
            TypeDecl::Typeof(TypeofArg::Expr(expr)) | TypeDecl::Expression { expr, .. } => {
                lookup.expr_targets(module, *expr, offset)
            }
            TypeDecl::Typeof(TypeofArg::Return) => {
                let method = module.tree.ancestors(block).find(|&id| module.tree.node(id).method().is_some());
                match method.and_then(|id| module.tree.node(id).ty.clone()) {
                    Some(ret) => lookup.type_targets(module, &ret, block, offset),
                    None => Vec::new(),
                }
            }
            other => match other.base() {
                Some(base) => lookup.type_targets(module, base, block, offset),
                None => Vec::new(),
            },
        })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Targets expression `expr` of `module` names.
    pub(super) fn expr_targets(&mut self, module: &Arc<ModuleEntry>, expr: ExprId, offset: usize) -> Vec<Target> {
        let tree = &module.tree;
        let block = search_block_at(tree, offset);
        let symbol = |id: NodeId| vec![Target::Symbol(Candidate::new(module, id, 0))];

        self.nested(|lookup| match &tree.expr(expr).node {
            Expr::Identifier(name) => lookup.path_start(module, block, offset, name),
            Expr::Access {
                base,
                member: Member::Name(member),
            } => {
                let Some(name) = member.name() else {
                    return Vec::new();
                };
                let bases = lookup.expr_targets(module, *base, offset);
                let mut out: Vec<Target> = bases.iter().flat_map(|t| lookup.member_targets(t, Some(name))).collect();
                if out.is_empty() && bases.is_empty() {
                    let key = literal_type_key(&tree.expr(*base).node)
                        .map(str::to_string)
                        .or_else(|| type_of(tree, *base).as_ref().and_then(ufcs::type_key));
                    if let Some(key) = key {
                        out.extend(lookup.ufcs_functions(&key, name).into_iter().map(Target::Symbol));
                    }
                }
                out
            }
            Expr::Access {
                member: Member::New(new),
                ..
            } => lookup.expr_targets(module, *new, offset),
            Expr::Call { callee: inner, .. }
            | Expr::Index { base: inner, .. }
            | Expr::Slice { base: inner, .. }
            | Expr::Paren(inner)
            | Expr::PostIncrement(inner)
            | Expr::PostDecrement(inner)
            | Expr::Cast {
                target: None,
                operand: inner,
                ..
            }
            | Expr::Unary {
                op: UnaryOp::Deref | UnaryOp::AddressOf,
                operand: inner,
            } => lookup.expr_targets(module, *inner, offset),
            Expr::Cast { target: Some(ty), .. } | Expr::New { ty, .. } | Expr::TypeDeclaration(ty) => {
                lookup.type_targets(module, ty, block, offset)
            }
            Expr::TypeAccess { ty, member } => {
                let types = lookup.type_targets(module, ty, block, offset);
                types.iter().flat_map(|t| lookup.member_targets(t, Some(member))).collect()
            }
            Expr::AnonymousClass { class, .. } => symbol(*class),
            Expr::FunctionLiteral { method, .. } => symbol(*method),
            Expr::Token(KeywordId::This) => lookup
                .enclosing_class(module, block)
                .map(Target::Symbol)
                .into_iter()
                .collect(),
            Expr::Token(KeywordId::Super) => match lookup.enclosing_class(module, block) {
                Some(class) => lookup.base_classes(&class).into_iter().map(Target::Symbol).collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        })
    }

    // ------------------------------------------------------------------------
    // UFCS
    // ------------------------------------------------------------------------

    fn ufcs_key(&self, candidate: &Candidate) -> Option<String> {
        let node = candidate.node();
        match node.kind {
            NodeKind::ClassLike(_) | NodeKind::Enum => Some(node.name.clone()),
            _ => declared_type(candidate).as_ref().and_then(ufcs::type_key),
        }
    }

    /// Cached free functions named `name` whose first parameter is keyed `key`.
    fn ufcs_functions(&self, key: &str, name: &str) -> Vec<Candidate> {
        let found: Vec<(String, NodeId)> = self
            .cache
            .ufcs()
            .candidates(key, Some(name))
            .map(|m| (m.module.clone(), m.node))
            .collect();
        found
            .into_iter()
            .filter_map(|(module, node)| Some(Candidate::new(&self.cache.get(&module)?, node, 0)))
            .collect()
    }
}

/// Declared type of a variable, function, enum value or alias; `auto` variables use their initializer's type.
pub(super) fn declared_type(candidate: &Candidate) -> Option<TypeDecl> {
    let node = candidate.node();
    if let Some(ty) = &node.ty {
        return Some(ty.clone());
    }
    match &node.kind {
        NodeKind::Variable(data) => data.initializer.and_then(|init| type_of(&candidate.module.tree, init)),
        _ => None,
    }
}

fn literal_type_key(expr: &Expr) -> Option<&'static str> {
    match expr {
        Expr::Literal(Literal::String(_)) => Some("string"),
        Expr::Literal(Literal::Int(_)) => Some("int"),
        Expr::Literal(Literal::Float(_)) => Some("double"),
        Expr::Literal(Literal::Char(_)) => Some("char"),
        _ => None,
    }
}
