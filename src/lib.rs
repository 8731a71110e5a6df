#![forbid(unsafe_code)]
//! Incremental parsing and symbol resolution for D source code
//!
//! dscope keeps a project-wide cache of parsed modules and answers the questions an editor asks while the user
//! types: what is visible here, where is this defined, what does this call take, which types are unknown. The
//! lexer, parser and AST live in [`dscope_syntax`]; this crate owns everything that needs more than one file.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Locks**: poisoned locks are recovered with `PoisonError::into_inner`; a panicking reader never takes the
//!   cache down with it.
//!
//! ## Modules
//!
//! - `cache` - module cache, UFCS index and bulk directory scan
//! - `resolver` - scope chain, member lookup, completion and go-to-definition
//! - `semantic` - unresolved type references
//! - `session` - per-document debounced background parsing
//! - `outline` - folding ranges and navigation lists
//! - `commenting` - comment, uncomment and import-insertion edits

pub mod cache;
pub mod cli;
pub mod commenting;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod outline;
pub mod resolver;
pub mod semantic;
pub mod session;

pub use dscope_syntax::{ast, lexer, parser};

pub use cache::{ModuleCache, ModuleEntry};
pub use config::AnalysisConfig;
pub use diagnostics::{ErrorList, ErrorRecord, Origin, Severity};
pub use errors::{AnalysisError, AnalysisResult};
pub use resolver::{CompletionItem, DefinitionLocation, Resolution};
pub use session::{DocumentSession, SessionSnapshot};
