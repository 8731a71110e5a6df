//! Constant folding, limited to literal leaves.
//!
//! [`evaluate`] recognises literals, `true`/`false`/`null` and parenthesised forms of those. Everything else
//! (operators, identifiers, calls, `mixin`) is reported as non-constant with `None`.

use std::fmt;

use dscope_core::lang::keywords::KeywordId;

use crate::ast::{ExprId, SyntaxTree};
use crate::expressions::{Expr, Literal};

/// A compile-time value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Long(i64),
    /// Integer literals above `i64::MAX`.
    ULong(u64),
    Double(f64),
    String(String),
    Char(char),
    Null,
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Long(n) => write!(f, "{n}"),
            ConstValue::ULong(n) => write!(f, "{n}"),
            ConstValue::Double(d) => write!(f, "{d}"),
            ConstValue::String(s) => write!(f, "{s:?}"),
            ConstValue::Char(c) => write!(f, "{c:?}"),
            ConstValue::Null => f.write_str("null"),
        }
    }
}

/// Evaluate `id` if it is a constant leaf.
pub fn evaluate(tree: &SyntaxTree, id: ExprId) -> Option<ConstValue> {
    match &tree.expr(id).node {
        Expr::Literal(literal) => Some(match literal {
            Literal::Int(n) => i64::try_from(*n).map_or(ConstValue::ULong(*n), ConstValue::Long),
            Literal::Float(d) => ConstValue::Double(*d),
            Literal::String(s) => ConstValue::String(s.clone()),
            Literal::Char(c) => ConstValue::Char(*c),
        }),
        Expr::Token(KeywordId::True) => Some(ConstValue::Bool(true)),
        Expr::Token(KeywordId::False) => Some(ConstValue::Bool(false)),
        Expr::Token(KeywordId::Null) => Some(ConstValue::Null),
        Expr::Paren(inner) => evaluate(tree, *inner),
        _ => None,
    }
}

/// Lenient boolean conversion: numbers are true when non-zero, strings when they spell `true`.
pub fn to_bool(value: &ConstValue) -> bool {
    match value {
        ConstValue::Bool(b) => *b,
        ConstValue::Long(n) => *n != 0,
        ConstValue::ULong(n) => *n != 0,
        ConstValue::Double(d) => *d != 0.0,
        ConstValue::String(s) => s.trim().eq_ignore_ascii_case("true"),
        ConstValue::Char(_) | ConstValue::Null => false,
    }
}

/// Lenient integer conversion; unconvertible values become `0`. Doubles round to nearest.
pub fn to_long(value: &ConstValue) -> i64 {
    match value {
        ConstValue::Bool(b) => i64::from(*b),
        ConstValue::Long(n) => *n,
        ConstValue::ULong(n) => i64::try_from(*n).unwrap_or(0),
        ConstValue::Double(d) if d.is_finite() && d.abs() < i64::MAX as f64 => d.round() as i64,
        ConstValue::Double(_) => 0,
        ConstValue::String(s) => s.trim().parse().unwrap_or(0),
        ConstValue::Char(c) => i64::from(u32::from(*c)),
        ConstValue::Null => 0,
    }
}

/// Lenient floating point conversion; unconvertible values become `0.0`.
pub fn to_double(value: &ConstValue) -> f64 {
    match value {
        ConstValue::Bool(b) => f64::from(u8::from(*b)),
        ConstValue::Long(n) => *n as f64,
        ConstValue::ULong(n) => *n as f64,
        ConstValue::Double(d) => *d,
        ConstValue::String(s) => s.trim().parse().unwrap_or(0.0),
        ConstValue::Char(_) | ConstValue::Null => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::parse_source;

    fn evaluate_initializer(source: &str) -> Option<ConstValue> {
        let parsed = parse_source(source);
        let tree = &parsed.tree;
        let v = tree.children_named(tree.root, "v").next().expect("v");
        let NodeKind::Variable(data) = &tree.node(v).kind else {
            panic!("expected variable");
        };
        evaluate(tree, data.initializer.expect("initializer"))
    }

    #[test]
    fn test_literal_leaves() {
        assert_eq!(evaluate_initializer("auto v = 42;"), Some(ConstValue::Long(42)));
        assert_eq!(evaluate_initializer("auto v = ((true));"), Some(ConstValue::Bool(true)));
        assert_eq!(evaluate_initializer("auto v = null;"), Some(ConstValue::Null));
        assert_eq!(
            evaluate_initializer("auto v = \"text\";"),
            Some(ConstValue::String("text".to_string()))
        );
    }

    #[test]
    fn test_non_constant_forms() {
        assert_eq!(evaluate_initializer("auto v = 1 + 2;"), None);
        assert_eq!(evaluate_initializer("auto v = x;"), None);
        assert_eq!(evaluate_initializer("auto v = mixin(\"1\");"), None);
    }

    #[test]
    fn test_lenient_conversions() {
        assert!(to_bool(&ConstValue::Long(3)));
        assert!(!to_bool(&ConstValue::String("no".into())));
        assert_eq!(to_long(&ConstValue::Double(2.6)), 3);
        assert_eq!(to_long(&ConstValue::String(" 17 ".into())), 17);
        assert_eq!(to_long(&ConstValue::Double(f64::NAN)), 0);
        assert_eq!(to_double(&ConstValue::Bool(true)), 1.0);
        assert_eq!(to_double(&ConstValue::String("x".into())), 0.0);
    }
}
