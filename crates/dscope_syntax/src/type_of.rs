//! Expression type representation.
//!
//! [`type_of`] derives the syntactic type shape of an expression from its operands. It does not evaluate anything
//! and never looks outside the tree: identifiers come back as expression-derived declarations for the resolver to
//! interpret.
//!
//! ## Notes
//! - Comparison, identity, membership and logical operators always yield `bool`.
//! - Arithmetic, shift, bitwise and power operators keep the left operand's representation.
//! - `a ~ b` wraps the left type in a dynamic array unless it already is an array.

use dscope_core::lang::keywords::KeywordId;

use crate::ast::{Attribute, ExprId, NodeKind, SyntaxTree};
use crate::expressions::{BinaryOp, Expr, Member, UnaryOp};
use crate::types::{ArrayKey, ParameterDecl, TypeDecl};

/// Statically derived type declaration of `id`, or `None` if the syntax alone does not determine one.
///
/// Recursion follows operand handles, which always point to earlier allocations, so this terminates.
pub fn type_of(tree: &SyntaxTree, id: ExprId) -> Option<TypeDecl> {
    let expression_derived = |inner: Option<TypeDecl>| {
        Some(TypeDecl::Expression {
            expr: id,
            inner: inner.map(Box::new),
        })
    };

    match &tree.expr(id).node {
        Expr::Binary { op, left, .. } => {
            if op.yields_bool() {
                return Some(TypeDecl::Basic(KeywordId::Bool));
            }
            let left = type_of(tree, *left);
            if *op == BinaryOp::Cat {
                return match left {
                    Some(ty) if ty.is_array() => Some(ty),
                    other => Some(TypeDecl::Array {
                        base: other.map(Box::new),
                        key: ArrayKey::Dynamic,
                    }),
                };
            }
            left
        }
        Expr::Assign { right, .. } => type_of(tree, *right),
        Expr::Conditional { if_true, .. } => type_of(tree, *if_true),
        Expr::Unary { op, operand } => match op {
            UnaryOp::AddressOf | UnaryOp::Deref => expression_derived(type_of(tree, *operand)),
            UnaryOp::Delete => None,
            _ => type_of(tree, *operand),
        },
        Expr::Cast { target, operand, .. } => target.clone().or_else(|| type_of(tree, *operand)),
        Expr::New { ty, .. } => Some(ty.clone()),
        Expr::AnonymousClass { .. } | Expr::TypeAccess { .. } => expression_derived(None),

        Expr::Access { base, member } => match member {
            Member::Name(member) => match type_of(tree, *base) {
                Some(inner) => Some(TypeDecl::qualified(inner, member.clone())),
                None => Some(member.clone()),
            },
            Member::New(new) => type_of(tree, *new),
        },
        Expr::Call { callee: base, .. } | Expr::PostIncrement(base) | Expr::PostDecrement(base) => {
            type_of(tree, *base)
        }
        Expr::Index { base, .. } | Expr::Slice { base, .. } => expression_derived(type_of(tree, *base)),

        Expr::Identifier(_) | Expr::Literal(_) => expression_derived(None),
        Expr::Token(keyword) => Some(TypeDecl::Basic(*keyword)),
        Expr::Dollar => Some(TypeDecl::ident("size_t")),
        Expr::TypeDeclaration(ty) => Some(ty.clone()),

        Expr::ArrayLiteral(_) | Expr::StructInitializer(_) => expression_derived(None),
        Expr::AssocArrayLiteral(_) => Some(TypeDecl::Array {
            base: None,
            key: ArrayKey::Dynamic,
        }),
        Expr::FunctionLiteral { token, method, .. } => {
            let node = tree.node(*method);
            let parameters = node.method().map_or_else(Vec::new, |data| {
                data.parameters
                    .iter()
                    .map(|&parameter| parameter_decl(tree, parameter))
                    .collect()
            });
            Some(TypeDecl::Delegate {
                return_type: Box::new(node.ty.clone().unwrap_or(TypeDecl::Basic(KeywordId::Auto))),
                parameters,
                is_function: *token == Some(KeywordId::Function),
            })
        }
        Expr::VoidInitializer => Some(TypeDecl::Basic(KeywordId::Void)),

        Expr::Assert(_) | Expr::Is(_) => Some(TypeDecl::Basic(KeywordId::Bool)),
        Expr::Mixin(_) => None,
        Expr::Import(_) => Some(TypeDecl::ident("string")),
        Expr::Typeid(_) => Some(TypeDecl::qualified(TypeDecl::ident("object"), TypeDecl::ident("TypeInfo"))),
        Expr::Traits { keyword, .. } => {
            if keyword.starts_with("is") || keyword.starts_with("has") {
                Some(TypeDecl::Basic(KeywordId::Bool))
            } else {
                Some(TypeDecl::ident("object"))
            }
        }
        Expr::Paren(inner) => type_of(tree, *inner),
        Expr::Comma(_) | Expr::Error => None,
    }
}

fn parameter_decl(tree: &SyntaxTree, id: crate::ast::NodeId) -> ParameterDecl {
    let node = tree.node(id);
    let default = match &node.kind {
        NodeKind::Variable(data) => data.initializer,
        _ => None,
    };
    ParameterDecl {
        name: (!node.name.is_empty()).then(|| node.name.clone()),
        ty: node.ty.clone(),
        storage: node
            .attributes
            .iter()
            .filter_map(|attr| match attr {
                Attribute::Keyword(id) => Some(*id),
                _ => None,
            })
            .collect(),
        default,
        variadic: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    /// Type of the initializer of the single `auto v = ...;` declaration in `source`.
    fn initializer_type(source: &str) -> Option<TypeDecl> {
        let parsed = parse_source(source);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let tree = &parsed.tree;
        let v = tree.children_named(tree.root, "v").next().expect("v");
        let NodeKind::Variable(data) = &tree.node(v).kind else {
            panic!("expected variable");
        };
        type_of(tree, data.initializer.expect("initializer"))
    }

    #[test]
    fn test_comparisons_are_bool() {
        for op in ["==", "!=", "<", "<=", ">", ">=", "is", "!is", "in", "!in", "&&", "||"] {
            let source = format!("auto v = a {op} b;");
            assert_eq!(initializer_type(&source), Some(TypeDecl::Basic(KeywordId::Bool)), "{op}");
        }
    }

    #[test]
    fn test_arithmetic_keeps_left_type() {
        assert_eq!(
            initializer_type("auto v = cast(long) a + b;"),
            Some(TypeDecl::Basic(KeywordId::Long))
        );
        assert_eq!(
            initializer_type("auto v = cast(uint) a << 2;"),
            Some(TypeDecl::Basic(KeywordId::Uint))
        );
    }

    #[test]
    fn test_concatenation_wraps_non_arrays() {
        assert_eq!(
            initializer_type("auto v = cast(int) a ~ b;"),
            Some(TypeDecl::dynamic_array(TypeDecl::Basic(KeywordId::Int)))
        );
        let string_array = TypeDecl::dynamic_array(TypeDecl::ident("string"));
        assert_eq!(
            initializer_type("auto v = cast(string[]) a ~ b;"),
            Some(string_array)
        );
    }

    #[test]
    fn test_member_access_qualifies_base_type() {
        assert_eq!(
            initializer_type("auto v = (new Foo).bar;"),
            Some(TypeDecl::qualified(TypeDecl::ident("Foo"), TypeDecl::ident("bar")))
        );
    }

    #[test]
    fn test_keyword_and_meta_expressions() {
        assert_eq!(initializer_type("auto v = null;"), Some(TypeDecl::Basic(KeywordId::Null)));
        assert_eq!(initializer_type("auto v = import(\"a.txt\");"), Some(TypeDecl::ident("string")));
        assert_eq!(
            initializer_type("auto v = __traits(isArithmetic, int);"),
            Some(TypeDecl::Basic(KeywordId::Bool))
        );
        assert_eq!(initializer_type("auto v = mixin(\"1\");"), None);
    }

    #[test]
    fn test_function_literal_is_delegate() {
        match initializer_type("auto v = function int(int x) { return x; };") {
            Some(TypeDecl::Delegate {
                is_function,
                parameters,
                return_type,
            }) => {
                assert!(is_function);
                assert_eq!(parameters.len(), 1);
                assert_eq!(parameters[0].name.as_deref(), Some("x"));
                assert_eq!(*return_type, TypeDecl::Basic(KeywordId::Int));
            }
            other => panic!("expected delegate type, got {other:?}"),
        }
    }
}
