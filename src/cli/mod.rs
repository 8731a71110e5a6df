//! CLI for the dscope analysis engine
//!
//! ## Commands
//!
//! - `lex <file>` - Print tokens and classified comments
//! - `parse <file>` - Print the module outline, imports and diagnostics
//! - `check <file>...` - Render diagnostics with source context
//! - `scan <dir>...` - Bulk-parse library directories and write the parse log
//! - `resolve <file> --offset N` - Print the definitions of the symbol at an offset
//! - `complete <file> --offset N` - List the symbols visible at an offset
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::errors::AnalysisError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<AnalysisError> for CliError {
    fn from(error: AnalysisError) -> Self {
        CliError::failure(format!("Error: {error}"))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Incremental parsing and symbol resolution for D source code
#[derive(Parser, Debug)]
#[command(name = "dscope")]
#[command(version = VERSION)]
#[command(about = "Incremental parsing and symbol resolution for D source code", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print tokens and comments
    Lex {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the module outline, imports and diagnostics
    Parse {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse files and render their diagnostics
    Check {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Bulk-parse library directories
    Scan {
        #[arg(value_name = "DIR", required = true)]
        dirs: Vec<PathBuf>,
        /// Directory the parse log is written to
        #[arg(long = "log-dir", value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },

    /// Print the definitions of the symbol at a byte offset
    Resolve {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Byte offset of the caret
        #[arg(long)]
        offset: usize,
        /// Library directory to scan first (repeatable)
        #[arg(short = 'I', long = "import", value_name = "DIR")]
        imports: Vec<PathBuf>,
    },

    /// List the symbols visible at a byte offset
    Complete {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Byte offset of the caret
        #[arg(long)]
        offset: usize,
        /// Library directory to scan first (repeatable)
        #[arg(short = 'I', long = "import", value_name = "DIR")]
        imports: Vec<PathBuf>,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Lex { file } => commands::lex_file(&file),
        Command::Parse { file, json } => commands::parse_file(&file, json),
        Command::Check { files } => commands::check_files(&files),
        Command::Scan { dirs, log_dir } => commands::scan_dirs(&dirs, log_dir),
        Command::Resolve { file, offset, imports } => commands::resolve_at(&file, offset, &imports),
        Command::Complete { file, offset, imports } => commands::complete_at(&file, offset, &imports),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_check() {
        let cli = Cli::try_parse_from(["dscope", "check", "a.d", "b.d"]).unwrap();
        if let Command::Check { files } = cli.command {
            assert_eq!(files, [PathBuf::from("a.d"), PathBuf::from("b.d")]);
        } else {
            panic!("Expected Check command");
        }
        assert!(Cli::try_parse_from(["dscope", "check"]).is_err());
    }

    #[test]
    fn test_cli_parse_json_flag() {
        let cli = Cli::try_parse_from(["dscope", "parse", "app.d", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Parse { json: true, .. }));
    }

    #[test]
    fn test_cli_parse_scan() {
        let cli = Cli::try_parse_from(["dscope", "scan", "/usr/include/d", "--log-dir", "logs"]).unwrap();
        if let Command::Scan { dirs, log_dir } = cli.command {
            assert_eq!(dirs.len(), 1);
            assert_eq!(log_dir, Some(PathBuf::from("logs")));
        } else {
            panic!("Expected Scan command");
        }
    }

    #[test]
    fn test_cli_parse_resolve_with_imports() {
        let cli = Cli::try_parse_from(["dscope", "resolve", "app.d", "--offset", "42", "-I", "lib", "-I", "vendor"])
            .unwrap();
        if let Command::Resolve { offset, imports, .. } = cli.command {
            assert_eq!(offset, 42);
            assert_eq!(imports, [PathBuf::from("lib"), PathBuf::from("vendor")]);
        } else {
            panic!("Expected Resolve command");
        }
        assert!(Cli::try_parse_from(["dscope", "complete", "app.d"]).is_err());
    }
}
