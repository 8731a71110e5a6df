//! D language vocabulary registries.
//!
//! Callers work with **stable IDs** (e.g. `KeywordId`, `OperatorId`) and look up spellings/metadata via the
//! registry tables instead of comparing strings.
//!
//! ## Notes
//! - Registries are **pure**: no AST types, no IO, no side effects.
//! - The lexer/parser enforce syntax; registries provide spellings and metadata for diagnostics, printing and
//!   highlighting.
//!
//! ## Examples
//! ```rust
//! use dscope_core::lang::keywords::{self, KeywordId};
//!
//! assert_eq!(keywords::from_str("foreach_reverse"), Some(KeywordId::ForeachReverse));
//! assert_eq!(keywords::as_str(KeywordId::Immutable), "immutable");
//! ```

pub mod keywords;
pub mod operators;
pub mod punctuation;
