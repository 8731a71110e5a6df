//! Expression model.
//!
//! [`Expr`] is a closed sum over every expression form the parser produces. Operands are [`ExprId`] handles into
//! the owning tree's expression arena; operands are always allocated before the expression that uses them, so
//! structural recursion over an expression terminates.

use dscope_core::lang::keywords::KeywordId;
use dscope_core::lang::operators::OperatorId;

use crate::ast::{ExprId, Ident, NodeId};
use crate::types::{TypeDecl, TypeOrExpr};

// ============================================================================
// Operators
// ============================================================================

/// Infix operators (assignment excluded, see [`Expr::Assign`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    OrOr,
    AndAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    Is,
    NotIs,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Cat,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::OrOr => "||",
            BinaryOp::AndAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Is => "is",
            BinaryOp::NotIs => "!is",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "!in",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Cat => "~",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^^",
        }
    }

    /// Map an operator token to the infix operator it spells, if any.
    pub fn from_operator(id: OperatorId) -> Option<Self> {
        Some(match id {
            OperatorId::PipePipe => BinaryOp::OrOr,
            OperatorId::AmpAmp => BinaryOp::AndAnd,
            OperatorId::Pipe => BinaryOp::BitOr,
            OperatorId::Caret => BinaryOp::BitXor,
            OperatorId::Amp => BinaryOp::BitAnd,
            OperatorId::EqEq => BinaryOp::Eq,
            OperatorId::NotEq => BinaryOp::NotEq,
            OperatorId::Lt => BinaryOp::Lt,
            OperatorId::LtEq => BinaryOp::LtEq,
            OperatorId::Gt => BinaryOp::Gt,
            OperatorId::GtEq => BinaryOp::GtEq,
            OperatorId::Shl => BinaryOp::Shl,
            OperatorId::Shr => BinaryOp::Shr,
            OperatorId::UShr => BinaryOp::UShr,
            OperatorId::Plus => BinaryOp::Add,
            OperatorId::Minus => BinaryOp::Sub,
            OperatorId::Tilde => BinaryOp::Cat,
            OperatorId::Star => BinaryOp::Mul,
            OperatorId::Slash => BinaryOp::Div,
            OperatorId::Percent => BinaryOp::Mod,
            OperatorId::CaretCaret => BinaryOp::Pow,
            _ => return None,
        })
    }

    /// Comparison, identity, membership and logical operators; their result is always `bool`.
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::OrOr
                | BinaryOp::AndAnd
                | BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Is
                | BinaryOp::NotIs
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::In
                | BinaryOp::NotIn
        )
    }

    /// Word operators print with surrounding spaces (`a !is b`); symbol operators print tight (`2+2`).
    pub fn is_word(self) -> bool {
        matches!(self, BinaryOp::Is | BinaryOp::NotIs | BinaryOp::In | BinaryOp::NotIn)
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    AddressOf,
    Deref,
    PreIncrement,
    PreDecrement,
    Negate,
    Plus,
    Not,
    Complement,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::PreIncrement => "++",
            UnaryOp::PreDecrement => "--",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::Complement => "~",
            UnaryOp::Delete => "delete ",
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u64),
    Float(f64),
    String(String),
    Char(char),
}

/// Right-hand side of a member access.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// `a.b`, `a.b!(T)`
    Name(TypeDecl),
    /// `outer.new Inner(...)`
    New(ExprId),
}

/// `is(Type Identifier : Spec)` / `is(Type == Spec)`
#[derive(Debug, Clone, PartialEq)]
pub struct IsExpr {
    pub ty: TypeDecl,
    pub alias: Option<Ident>,
    pub relation: Option<IsRelation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsRelation {
    /// `true` for `==`, `false` for `:`.
    pub exact: bool,
    pub specialization: IsSpecialization,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IsSpecialization {
    Type(TypeDecl),
    /// `class`, `struct`, `function`, `return`, ...
    Keyword(KeywordId),
}

/// The closed set of expression forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Ident),
    Literal(Literal),
    /// Keyword expressions: `this`, `super`, `null`, `true`, `false`, `__FILE__`, `__LINE__`, ...
    Token(KeywordId),
    /// `$` inside an index or slice.
    Dollar,
    /// A type in expression position: template instances, `.name`, `int.max`.
    TypeDeclaration(TypeDecl),

    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Assign {
        op: OperatorId,
        left: ExprId,
        right: ExprId,
    },
    Conditional {
        condition: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    /// `(Type).member`
    TypeAccess { ty: TypeDecl, member: Ident },
    New {
        new_args: Vec<ExprId>,
        ty: TypeDecl,
        args: Vec<ExprId>,
    },
    /// `new class(args) Base { ... }`; the body is a class-like node.
    AnonymousClass {
        new_args: Vec<ExprId>,
        args: Vec<ExprId>,
        class: NodeId,
    },
    Cast {
        target: Option<TypeDecl>,
        qualifiers: Vec<KeywordId>,
        operand: ExprId,
    },

    Access { base: ExprId, member: Member },
    PostIncrement(ExprId),
    PostDecrement(ExprId),
    Call { callee: ExprId, args: Vec<ExprId> },
    Index { base: ExprId, args: Vec<ExprId> },
    /// `a[]` (range `None`) or `a[x..y]`.
    Slice {
        base: ExprId,
        range: Option<(ExprId, ExprId)>,
    },

    ArrayLiteral(Vec<ExprId>),
    AssocArrayLiteral(Vec<(ExprId, ExprId)>),
    /// `{a: 1, b: 2}` initializer.
    StructInitializer(Vec<(Option<Ident>, ExprId)>),
    /// `function`/`delegate` literal or lambda; the body is a method node.
    FunctionLiteral {
        token: Option<KeywordId>,
        method: NodeId,
        /// Result of a `=> expr` body; `None` for a `{ ... }` body.
        body: Option<ExprId>,
    },
    VoidInitializer,

    Assert(Vec<ExprId>),
    Mixin(ExprId),
    Import(ExprId),
    Typeid(TypeOrExpr),
    Is(IsExpr),
    Traits { keyword: Ident, args: Vec<TypeOrExpr> },
    Paren(ExprId),
    Comma(Vec<ExprId>),

    /// Placeholder left where an expression failed to parse.
    Error,
}

impl Expr {
    /// Direct operand handles, in source order.
    pub fn operands(&self) -> Vec<ExprId> {
        match self {
            Expr::Binary { left, right, .. } | Expr::Assign { left, right, .. } => vec![*left, *right],
            Expr::Conditional {
                condition,
                if_true,
                if_false,
            } => vec![*condition, *if_true, *if_false],
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => vec![*operand],
            Expr::New { new_args, args, .. } | Expr::AnonymousClass { new_args, args, .. } => {
                new_args.iter().chain(args).copied().collect()
            }
            Expr::Access { base, member } => match member {
                Member::Name(_) => vec![*base],
                Member::New(new) => vec![*base, *new],
            },
            Expr::PostIncrement(base) | Expr::PostDecrement(base) => vec![*base],
            Expr::Call { callee: base, args } | Expr::Index { base, args } => {
                std::iter::once(*base).chain(args.iter().copied()).collect()
            }
            Expr::Slice { base, range } => {
                let mut out = vec![*base];
                if let Some((from, to)) = range {
                    out.extend([*from, *to]);
                }
                out
            }
            Expr::ArrayLiteral(items) | Expr::Assert(items) | Expr::Comma(items) => items.clone(),
            Expr::AssocArrayLiteral(pairs) => pairs.iter().flat_map(|(k, v)| [*k, *v]).collect(),
            Expr::StructInitializer(fields) => fields.iter().map(|(_, value)| *value).collect(),
            Expr::Mixin(inner) | Expr::Import(inner) | Expr::Paren(inner) => vec![*inner],
            Expr::Typeid(TypeOrExpr::Expr(inner)) => vec![*inner],
            Expr::Traits { args, .. } => args
                .iter()
                .filter_map(|arg| match arg {
                    TypeOrExpr::Expr(e) => Some(*e),
                    TypeOrExpr::Type(_) => None,
                })
                .collect(),
            Expr::Identifier(_)
            | Expr::Literal(_)
            | Expr::Token(_)
            | Expr::Dollar
            | Expr::TypeDeclaration(_)
            | Expr::TypeAccess { .. }
            | Expr::FunctionLiteral { .. }
            | Expr::VoidInitializer
            | Expr::Typeid(TypeOrExpr::Type(_))
            | Expr::Is(_)
            | Expr::Error => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_core::lang::operators;

    #[test]
    fn test_binary_op_spellings_match_registry() {
        for info in operators::OPERATORS {
            if let Some(op) = BinaryOp::from_operator(info.id) {
                assert_eq!(op.as_str(), info.spelling);
            }
        }
    }

    #[test]
    fn test_bool_yielding_operators() {
        assert!(BinaryOp::NotIn.yields_bool());
        assert!(BinaryOp::AndAnd.yields_bool());
        assert!(!BinaryOp::Cat.yields_bool());
        assert!(!BinaryOp::Shl.yields_bool());
    }
}
