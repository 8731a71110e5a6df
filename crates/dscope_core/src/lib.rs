//! Canonical D language vocabulary shared by the dscope lexer, parser and analysis engine.
//!
//! This crate is intentionally small and dependency-free. It holds the registries that map token spellings to stable
//! identifiers so that no other crate needs stringly-typed keyword or operator checks.
//!
//! ## Notes
//!
//! - **No IO**, no global state, and no AST types.
//! - Registries are const tables ordered by identifier; lookups by id are plain indexing.

pub mod lang;
