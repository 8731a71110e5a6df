//! Syntax frontend for the D language: lexer, parser, arena AST, expression typing, diagnostics.
//!
//! The crate is built for interactive tooling. Lexing and parsing never fail as a whole: both produce their output
//! plus a list of structured errors, and a file with local syntax errors still yields a usable tree.
//!
//! ## Notes
//! - This crate is "syntax-only": it does not resolve names across modules. See the `dscope` crate for the module
//!   cache and resolver.
//! - Vocabulary identity (keywords/operators/punctuation) comes from `dscope_core::lang` registries.
//! - Nodes and expressions live in arenas owned by [`ast::SyntaxTree`] and are addressed by stable handles.
//!
//! ## Examples
//! ```rust
//! use dscope_syntax::parser;
//!
//! let parsed = parser::parse_source("module m; int x = 2+2;");
//! assert!(parsed.errors.is_empty());
//! assert_eq!(parsed.tree.module_name.as_deref(), Some("m"));
//! assert_eq!(parsed.tree.children(parsed.tree.root).len(), 1);
//! ```

pub mod ast;
pub mod context;
pub mod diagnostics;
pub mod eval;
pub mod expressions;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token_helpers;
pub mod type_of;
pub mod types;
