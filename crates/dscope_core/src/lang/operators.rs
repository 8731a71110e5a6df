//! Operator vocabulary.
//!
//! This module defines the canonical symbol-operator set of D. Word operators (`is`, `in`, `new`, `cast`, ...) are
//! keywords and live in [`crate::lang::keywords`].
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - Precedence is owned by the parser's descent ladder; this table only records spelling and category.
//! - Several spellings are both prefix and infix (`&`, `*`, `-`, `+`, `~`); the parser decides by position.
//!
//! ## Examples
//! ```rust
//! use dscope_core::lang::operators::{self, OperatorCategory, OperatorId};
//!
//! assert_eq!(operators::from_str(">>>="), Some(OperatorId::UShrEq));
//! assert_eq!(operators::category(OperatorId::TildeEq), OperatorCategory::Assignment);
//! ```

/// Broad grouping for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCategory {
    Arithmetic,
    /// `++` and `--`, both prefix and postfix.
    Step,
    Bitwise,
    Logical,
    Comparison,
    Assignment,
}

/// Stable identifier for every operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorId {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    CaretCaret,
    Tilde,

    // Increment / decrement
    PlusPlus,
    MinusMinus,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    UShr,

    // Logical
    AmpAmp,
    PipePipe,
    Bang,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    CaretCaretEq,
    TildeEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    UShrEq,
}

/// Metadata for an operator.
#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub id: OperatorId,
    pub spelling: &'static str,
    pub category: OperatorCategory,
}

/// Registry of all operators, in [`OperatorId`] order.
pub const OPERATORS: &[OperatorInfo] = &[
    op(OperatorId::Plus, "+", OperatorCategory::Arithmetic),
    op(OperatorId::Minus, "-", OperatorCategory::Arithmetic),
    op(OperatorId::Star, "*", OperatorCategory::Arithmetic),
    op(OperatorId::Slash, "/", OperatorCategory::Arithmetic),
    op(OperatorId::Percent, "%", OperatorCategory::Arithmetic),
    op(OperatorId::CaretCaret, "^^", OperatorCategory::Arithmetic),
    op(OperatorId::Tilde, "~", OperatorCategory::Arithmetic),
    op(OperatorId::PlusPlus, "++", OperatorCategory::Step),
    op(OperatorId::MinusMinus, "--", OperatorCategory::Step),
    op(OperatorId::Amp, "&", OperatorCategory::Bitwise),
    op(OperatorId::Pipe, "|", OperatorCategory::Bitwise),
    op(OperatorId::Caret, "^", OperatorCategory::Bitwise),
    op(OperatorId::Shl, "<<", OperatorCategory::Bitwise),
    op(OperatorId::Shr, ">>", OperatorCategory::Bitwise),
    op(OperatorId::UShr, ">>>", OperatorCategory::Bitwise),
    op(OperatorId::AmpAmp, "&&", OperatorCategory::Logical),
    op(OperatorId::PipePipe, "||", OperatorCategory::Logical),
    op(OperatorId::Bang, "!", OperatorCategory::Logical),
    op(OperatorId::EqEq, "==", OperatorCategory::Comparison),
    op(OperatorId::NotEq, "!=", OperatorCategory::Comparison),
    op(OperatorId::Lt, "<", OperatorCategory::Comparison),
    op(OperatorId::LtEq, "<=", OperatorCategory::Comparison),
    op(OperatorId::Gt, ">", OperatorCategory::Comparison),
    op(OperatorId::GtEq, ">=", OperatorCategory::Comparison),
    op(OperatorId::Eq, "=", OperatorCategory::Assignment),
    op(OperatorId::PlusEq, "+=", OperatorCategory::Assignment),
    op(OperatorId::MinusEq, "-=", OperatorCategory::Assignment),
    op(OperatorId::StarEq, "*=", OperatorCategory::Assignment),
    op(OperatorId::SlashEq, "/=", OperatorCategory::Assignment),
    op(OperatorId::PercentEq, "%=", OperatorCategory::Assignment),
    op(OperatorId::CaretCaretEq, "^^=", OperatorCategory::Assignment),
    op(OperatorId::TildeEq, "~=", OperatorCategory::Assignment),
    op(OperatorId::AmpEq, "&=", OperatorCategory::Assignment),
    op(OperatorId::PipeEq, "|=", OperatorCategory::Assignment),
    op(OperatorId::CaretEq, "^=", OperatorCategory::Assignment),
    op(OperatorId::ShlEq, "<<=", OperatorCategory::Assignment),
    op(OperatorId::ShrEq, ">>=", OperatorCategory::Assignment),
    op(OperatorId::UShrEq, ">>>=", OperatorCategory::Assignment),
];

/// Return the full metadata entry for an operator.
pub fn info_for(id: OperatorId) -> &'static OperatorInfo {
    &OPERATORS[id as usize]
}

/// Return the source spelling of an operator.
pub fn as_str(id: OperatorId) -> &'static str {
    info_for(id).spelling
}

/// Return the category of an operator.
pub fn category(id: OperatorId) -> OperatorCategory {
    info_for(id).category
}

/// Resolve an operator spelling to its identifier.
///
/// ## Returns
/// - `Some(OperatorId)` if the spelling exists in [`OPERATORS`].
/// - `None` otherwise.
pub fn from_str(spelling: &str) -> Option<OperatorId> {
    OPERATORS.iter().find(|o| o.spelling == spelling).map(|o| o.id)
}

/// Check whether an operator is an assignment (`=` or a compound assignment).
pub fn is_assignment(id: OperatorId) -> bool {
    category(id) == OperatorCategory::Assignment
}

// --- helpers -----------------------------------------------------------------

const fn op(id: OperatorId, spelling: &'static str, category: OperatorCategory) -> OperatorInfo {
    OperatorInfo { id, spelling, category }
}
