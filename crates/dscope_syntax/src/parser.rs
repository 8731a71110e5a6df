//! Parser for the D programming language
//!
//! Converts a token stream into an arena-backed [`SyntaxTree`]. The parser is built for source that is being
//! edited: it never gives up on a file, records every problem as a [`CompileError`], and recovers at statement and
//! declaration boundaries so the rest of the module still yields a usable tree.
//!
//! ## Examples
//!
//! ```rust
//! use dscope_syntax::{lexer, parser};
//!
//! let lexed = lexer::lex("class A { int x; void foo(int y) { } }");
//! let parsed = parser::parse(&lexed.tokens);
//! assert!(parsed.errors.is_empty());
//! let class = parsed.tree.children(parsed.tree.root)[0];
//! assert_eq!(parsed.tree.node(class).name, "A");
//! assert_eq!(parsed.tree.children(class).len(), 2);
//! ```

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::expressions::{BinaryOp, Expr, IsExpr, IsRelation, IsSpecialization, Literal, Member, UnaryOp};
use crate::lexer::{Comment, Lookahead, Token, TokenKind, TokenStream};
use crate::types::{ArrayKey, ParameterDecl, TypeDecl, TypeOrExpr, TypeofArg};
use dscope_core::lang::keywords::{self, KeywordCategory, KeywordId};
use dscope_core::lang::operators::{self, OperatorId};
use dscope_core::lang::punctuation::PunctuationId;
use la_arena::ArenaMap;

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/decl.rs");
include!("parser/types.rs");
include!("parser/stmts.rs");
include!("parser/expr.rs");
include!("parser/util.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
