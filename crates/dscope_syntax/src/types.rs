//! Type declarations: the syntactic shape of a D type expression.
//!
//! A [`TypeDecl`] is an owned tree. Wrappers (pointer, array, delegate, type constructor) own their base, and
//! dot-qualified chains own their inner (left-hand) part, so following `base()`/`inner()` links always terminates
//! after at most [`TypeDecl::depth`] steps.
//!
//! ## Notes
//! - Expression-derived declarations ([`TypeDecl::Expression`], [`TypeDecl::Typeof`], static array lengths,
//!   template value arguments) hold an [`ExprId`] into the owning [`crate::ast::SyntaxTree`].
//! - Rendering lives in [`crate::printer`] because it needs the expression arena.

use dscope_core::lang::keywords::KeywordId;

use crate::ast::{ExprId, Ident};

/// Argument position that accepts either a type or an expression (`typeid(..)`, `__traits(..)`, template args).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeOrExpr {
    Type(TypeDecl),
    Expr(ExprId),
}

/// Key of an array declaration suffix.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayKey {
    /// `T[]`
    Dynamic,
    /// `T[N]`
    Static(ExprId),
    /// `V[K]`
    Assoc(Box<TypeDecl>),
    /// `T[a..b]` (tuple slice)
    Slice(ExprId, ExprId),
}

/// Parameter of a delegate/function pointer type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterDecl {
    pub name: Option<Ident>,
    pub ty: Option<TypeDecl>,
    pub storage: Vec<KeywordId>,
    pub default: Option<ExprId>,
    pub variadic: bool,
}

/// Argument of `typeof(...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeofArg {
    Expr(ExprId),
    /// `typeof(return)`
    Return,
}

/// The closed set of type declaration shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    /// Built-in scalar, or the token type of a keyword expression (`this`, `null`, ...).
    Basic(KeywordId),
    Identifier(Ident),
    /// `name!(args)` or `name!arg`
    TemplateInstance { name: Ident, args: Vec<TypeOrExpr> },
    /// `inner.member`
    Qualified {
        inner: Box<TypeDecl>,
        member: Box<TypeDecl>,
    },
    /// Leading-dot module scope lookup: `.name`
    ModuleScope(Box<TypeDecl>),
    Pointer(Box<TypeDecl>),
    Array {
        base: Option<Box<TypeDecl>>,
        key: ArrayKey,
    },
    /// `R delegate(params)` / `R function(params)`
    Delegate {
        return_type: Box<TypeDecl>,
        parameters: Vec<ParameterDecl>,
        is_function: bool,
    },
    /// `const(T)`, `immutable(T)`, `shared(T)`, `inout(T)`, or a prefix qualifier.
    Modified { modifier: KeywordId, base: Box<TypeDecl> },
    Typeof(TypeofArg),
    /// Type that is only known through an expression (identifiers, literals, indexing, ...).
    Expression {
        expr: ExprId,
        inner: Option<Box<TypeDecl>>,
    },
    /// `...` parameter marker.
    Variadic(Option<Box<TypeDecl>>),
}

impl TypeDecl {
    pub fn ident(name: impl Into<Ident>) -> Self {
        TypeDecl::Identifier(name.into())
    }

    pub fn pointer(base: TypeDecl) -> Self {
        TypeDecl::Pointer(Box::new(base))
    }

    pub fn dynamic_array(base: TypeDecl) -> Self {
        TypeDecl::Array {
            base: Some(Box::new(base)),
            key: ArrayKey::Dynamic,
        }
    }

    pub fn qualified(inner: TypeDecl, member: TypeDecl) -> Self {
        TypeDecl::Qualified {
            inner: Box::new(inner),
            member: Box::new(member),
        }
    }

    /// The base of a wrapper declaration (pointer, array, delegate return, type constructor, variadic).
    pub fn base(&self) -> Option<&TypeDecl> {
        match self {
            TypeDecl::Pointer(base) | TypeDecl::Modified { base, .. } => Some(base),
            TypeDecl::Array { base, .. } | TypeDecl::Variadic(base) => base.as_deref(),
            TypeDecl::Delegate { return_type, .. } => Some(return_type),
            _ => None,
        }
    }

    /// The left-hand part of a qualified or expression-derived declaration.
    pub fn inner(&self) -> Option<&TypeDecl> {
        match self {
            TypeDecl::Qualified { inner, .. } => Some(inner),
            TypeDecl::ModuleScope(inner) => Some(inner),
            TypeDecl::Expression { inner, .. } => inner.as_deref(),
            _ => None,
        }
    }

    /// Follow `base()` links to the innermost declaration.
    pub fn most_basic(&self) -> &TypeDecl {
        let mut current = self;
        while let Some(base) = current.base() {
            current = base;
        }
        current
    }

    /// Strip type constructors (`const(T)` -> `T`).
    pub fn unqualified(&self) -> &TypeDecl {
        let mut current = self;
        while let TypeDecl::Modified { base, .. } = current {
            current = base;
        }
        current
    }

    /// Length of the longest `base()`/`inner()` chain starting here (a single declaration has depth 1).
    pub fn depth(&self) -> usize {
        let via_base = self.base().map_or(0, TypeDecl::depth);
        let via_inner = self.inner().map_or(0, TypeDecl::depth);
        let via_member = match self {
            TypeDecl::Qualified { member, .. } => member.depth(),
            _ => 0,
        };
        1 + via_base.max(via_inner).max(via_member)
    }

    /// The last identifier of the declaration (`a.b!(c)` -> `b`), if it names one.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDecl::Identifier(name) | TypeDecl::TemplateInstance { name, .. } => Some(name),
            TypeDecl::Qualified { member, .. } => member.name(),
            TypeDecl::ModuleScope(inner) => inner.name(),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDecl::Array { .. })
    }

    /// Name parts of a plain dotted identifier chain (`a.b.c` -> `["a", "b", "c"]`).
    ///
    /// Returns `None` if the chain contains anything but identifiers/template instances.
    pub fn identifier_chain(&self) -> Option<Vec<&str>> {
        match self {
            TypeDecl::Identifier(name) | TypeDecl::TemplateInstance { name, .. } => Some(vec![name.as_str()]),
            TypeDecl::Qualified { inner, member } => {
                let mut parts = inner.identifier_chain()?;
                parts.extend(member.identifier_chain()?);
                Some(parts)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_basic_follows_wrappers() {
        let ty = TypeDecl::dynamic_array(TypeDecl::pointer(TypeDecl::Basic(KeywordId::Int)));
        assert_eq!(ty.most_basic(), &TypeDecl::Basic(KeywordId::Int));
        assert_eq!(ty.depth(), 3);
    }

    #[test]
    fn test_identifier_chain() {
        let ty = TypeDecl::qualified(
            TypeDecl::qualified(TypeDecl::ident("std"), TypeDecl::ident("stdio")),
            TypeDecl::ident("File"),
        );
        assert_eq!(ty.identifier_chain(), Some(vec!["std", "stdio", "File"]));
        assert_eq!(ty.name(), Some("File"));
        assert!(TypeDecl::pointer(ty).identifier_chain().is_none());
    }

    #[test]
    fn test_unqualified_strips_constructors() {
        let ty = TypeDecl::Modified {
            modifier: KeywordId::Const,
            base: Box::new(TypeDecl::Modified {
                modifier: KeywordId::Shared,
                base: Box::new(TypeDecl::ident("S")),
            }),
        };
        assert_eq!(ty.unqualified(), &TypeDecl::ident("S"));
    }
}
