//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dscope_syntax::ast::{NodeId, SyntaxTree};
use dscope_syntax::diagnostics::ErrorKind;
use dscope_syntax::lexer::{self, TokenKind};
use dscope_syntax::printer::render_declaration;
use serde_json::json;

use super::{CliError, CliResult, ExitCode};
use crate::cache::scan::BulkScanner;
use crate::cache::{ModuleCache, ModuleEntry};
use crate::config::AnalysisConfig;
use crate::diagnostics::render_report;
use crate::errors::read_source;
use crate::{resolver, semantic};

// ============================================================================
// Helpers
// ============================================================================

fn load(path: &Path) -> CliResult<ModuleEntry> {
    let source = read_source(path)?;
    let fallback = path.file_stem().and_then(|s| s.to_str()).unwrap_or("main");
    Ok(ModuleEntry::parse(fallback, Some(path.to_path_buf()), source))
}

/// Cache holding the scanned import directories plus `file`.
fn prepare(file: &Path, imports: &[PathBuf]) -> CliResult<(Arc<ModuleCache>, Arc<ModuleEntry>)> {
    let config = AnalysisConfig::new().with_import_paths(imports.iter().cloned());
    let cache = Arc::new(ModuleCache::new(Arc::new(config)));
    if !imports.is_empty() {
        let report = BulkScanner::new(Arc::clone(&cache)).run();
        for failure in &report.failures {
            tracing::warn!(path = %failure.path.display(), errors = failure.errors.len(), "library file has errors");
        }
    }
    let entry = cache.replace_module(load(file)?);
    Ok((cache, entry))
}

fn check_offset(entry: &ModuleEntry, offset: usize) -> CliResult<()> {
    if offset > entry.source.len() {
        return Err(CliError::failure(format!(
            "Error: offset {offset} is past the end of {} ({} bytes)",
            entry.display_name(),
            entry.source.len()
        )));
    }
    Ok(())
}

/// Declarations of `block` as indented outline lines.
fn outline(tree: &SyntaxTree, block: NodeId, depth: usize, out: &mut Vec<String>) {
    for &child in tree.children(block) {
        let node = tree.node(child);
        let line = tree.location(node.span.start).line;
        out.push(format!("{}{line}: {}", "  ".repeat(depth), render_declaration(tree, child)));
        outline(tree, child, depth + 1, out);
    }
}

fn outline_json(tree: &SyntaxTree, block: NodeId) -> serde_json::Value {
    let children: Vec<serde_json::Value> = tree
        .children(block)
        .iter()
        .map(|&child| {
            let node = tree.node(child);
            let location = tree.location(node.span.start);
            json!({
                "kind": node.kind.label(),
                "name": node.name,
                "line": location.line,
                "column": location.column,
                "members": outline_json(tree, child),
            })
        })
        .collect();
    serde_json::Value::Array(children)
}

// ============================================================================
// Commands
// ============================================================================

/// Tokenize and display tokens and comments.
pub fn lex_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;
    let lexed = lexer::lex(&source);
    let lines = dscope_syntax::ast::LineIndex::new(&source);

    for token in &lexed.tokens {
        let location = lines.location(token.span.start);
        let text = source.get(token.span.start..token.span.end).unwrap_or_default();
        match &token.kind {
            TokenKind::Eof => println!("{}:{}\tEof", location.line, location.column),
            kind => println!("{}:{}\t{kind:?}\t{text}", location.line, location.column),
        }
    }
    for comment in &lexed.comments {
        let location = lines.location(comment.span.start);
        let doc = if comment.is_doc { " doc" } else { "" };
        println!("{}:{}\t{:?}{doc} comment", location.line, location.column, comment.kind);
    }

    let name = path.display().to_string();
    for error in &lexed.errors {
        eprintln!("{}", render_report(&name, &source, error));
    }
    Ok(if lexed.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Parse and display the module outline.
pub fn parse_file(path: &Path, as_json: bool) -> CliResult<ExitCode> {
    let entry = load(path)?;
    let tree = &entry.tree;

    if as_json {
        let imports: Vec<serde_json::Value> = tree
            .imports()
            .iter()
            .map(|i| {
                json!({
                    "module": i.module,
                    "alias": i.alias,
                    "public": i.is_public,
                    "static": i.is_static,
                    "bindings": i.bindings.iter().map(|b| json!({"name": b.name, "alias": b.alias})).collect::<Vec<_>>(),
                })
            })
            .collect();
        let errors: Vec<serde_json::Value> = entry
            .error_list()
            .iter()
            .map(|r| {
                json!({
                    "message": r.message,
                    "line": r.location.line,
                    "column": r.location.column,
                    "severity": r.severity.to_string(),
                })
            })
            .collect();
        let value = json!({
            "module": entry.name,
            "imports": imports,
            "declarations": outline_json(tree, tree.root),
            "errors": errors,
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::failure(format!("Error: cannot serialize outline: {e}")))?;
        println!("{text}");
    } else {
        println!("module {}", entry.name);
        for import in tree.imports() {
            let visibility = if import.is_public { "public " } else { "" };
            println!("import {visibility}{}", import.module);
        }
        let mut lines = Vec::new();
        outline(tree, tree.root, 0, &mut lines);
        for line in lines {
            println!("{line}");
        }
        for record in &entry.error_list() {
            eprintln!("{record}");
        }
    }

    Ok(if entry.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Parse files and render every diagnostic.
///
/// Unsupported constructs are reported but do not fail the check.
pub fn check_files(paths: &[PathBuf]) -> CliResult<ExitCode> {
    let mut failed = 0usize;
    for path in paths {
        let entry = load(path)?;
        let name = path.display().to_string();
        let mut broken = false;
        for error in &entry.errors {
            eprintln!("{}", render_report(&name, &entry.source, error));
            broken |= error.kind != ErrorKind::Unimplemented;
        }
        if broken {
            failed += 1;
        } else {
            println!("✓ {name}");
        }
    }
    if failed > 0 {
        return Err(CliError::failure(format!("{failed} file(s) with syntax errors")));
    }
    Ok(ExitCode::SUCCESS)
}

/// Bulk-scan directories and summarize.
pub fn scan_dirs(dirs: &[PathBuf], log_dir: Option<PathBuf>) -> CliResult<ExitCode> {
    let mut config = AnalysisConfig::new().with_import_paths(dirs.iter().cloned());
    if let Some(dir) = log_dir {
        config = config.with_diagnostics_dir(dir);
    }
    let cache = Arc::new(ModuleCache::new(Arc::new(config)));
    let report = BulkScanner::new(cache).run();

    println!(
        "Parsed {} module(s) in {} ms",
        report.parsed.len(),
        report.elapsed.as_millis()
    );
    for failure in &report.failures {
        println!("{}: {} error(s)", failure.path.display(), failure.errors.len());
    }
    if let Some(log) = &report.log_path {
        println!("Parse log written to {}", log.display());
    }
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print every definition the symbol at `offset` resolves to.
pub fn resolve_at(file: &Path, offset: usize, imports: &[PathBuf]) -> CliResult<ExitCode> {
    let (cache, entry) = prepare(file, imports)?;
    check_offset(&entry, offset)?;
    let locations = resolver::goto_definition(&cache, &entry, offset);
    if locations.is_empty() {
        println!("no symbol found");
        return Ok(ExitCode::FAILURE);
    }
    for location in locations {
        println!("{location}");
    }
    if let Some(unresolved) = semantic::scan_type_references(&cache, &entry) {
        for u in unresolved {
            tracing::debug!(name = %u.name, line = u.location.line, "unresolved type");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print the completion list at `offset`.
pub fn complete_at(file: &Path, offset: usize, imports: &[PathBuf]) -> CliResult<ExitCode> {
    let (cache, entry) = prepare(file, imports)?;
    check_offset(&entry, offset)?;
    for item in resolver::completion_candidates(&cache, &entry, offset) {
        println!("{}\t{}\t{}", item.name, item.kind, item.module);
    }
    for signature in resolver::method_insight(&cache, &entry, offset) {
        println!("({signature})");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    #[test]
    fn test_outline_lines() {
        let tree = parse_source("class A {\n    int x;\n}\nvoid f() {}").tree;
        let mut lines = Vec::new();
        outline(&tree, tree.root, 0, &mut lines);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1: "));
        assert!(lines[1].starts_with("  2: "));
        assert!(lines[2].starts_with("4: "));
    }

    #[test]
    fn test_outline_json_nests_members() {
        let tree = parse_source("struct P { int x; }").tree;
        let value = outline_json(&tree, tree.root);
        assert_eq!(value[0]["kind"], "struct");
        assert_eq!(value[0]["members"][0]["name"], "x");
    }
}
