//! One cached module: its source, tree and parse errors.

use std::path::{Path, PathBuf};

use dscope_syntax::ast::SyntaxTree;
use dscope_syntax::diagnostics::CompileError;
use dscope_syntax::parser;

use crate::diagnostics::ErrorList;

/// Immutable result of parsing one module. Updates replace the whole entry.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    /// Cache key: the declared module name or the name derived from the file path
    pub name: String,
    pub path: Option<PathBuf>,
    pub source: String,
    pub tree: SyntaxTree,
    pub errors: Vec<CompileError>,
}

impl ModuleEntry {
    /// Parse `source`. The declared `module` name wins over `fallback_name`.
    #[tracing::instrument(skip_all, fields(module = fallback_name))]
    pub fn parse(fallback_name: &str, path: Option<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let parsed = parser::parse_source(&source);
        let name = parsed.tree.effective_module_name(fallback_name).to_string();
        Self {
            name,
            path,
            source,
            tree: parsed.tree,
            errors: parsed.errors,
        }
    }

    pub fn error_list(&self) -> ErrorList {
        ErrorList::from_parse(self.path.clone(), &self.tree.line_index, &self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Display path for reports: the file path, or the module name for in-memory sources.
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .map(Path::display)
            .map_or_else(|| self.name.clone(), |p| p.to_string())
    }
}

/// Derive a module name from a file's location under a scanned root.
///
/// `root/std/stdio.d` -> `std.stdio`, and `root/std/container/package.d` -> `std.container`.
pub fn module_name_for_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let without_ext = relative.with_extension("");
    let mut parts: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect();
    if parts.len() > 1 && parts.last().is_some_and(|last| last == "package") {
        parts.pop();
    }
    if parts.is_empty() || !parts.iter().all(|p| is_identifier(p)) {
        return None;
    }
    Some(parts.join("."))
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_') && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_name_wins() {
        let entry = ModuleEntry::parse("fallback", None, "module app.core; int x;");
        assert_eq!(entry.name, "app.core");
        let entry = ModuleEntry::parse("fallback", None, "int x;");
        assert_eq!(entry.name, "fallback");
    }

    #[test]
    fn test_module_name_for_path() {
        let root = Path::new("/lib");
        assert_eq!(
            module_name_for_path(root, Path::new("/lib/std/stdio.d")).as_deref(),
            Some("std.stdio")
        );
        assert_eq!(
            module_name_for_path(root, Path::new("/lib/std/container/package.d")).as_deref(),
            Some("std.container")
        );
        assert_eq!(module_name_for_path(root, Path::new("/lib/object.di")).as_deref(), Some("object"));
        assert_eq!(module_name_for_path(root, Path::new("/lib/bad-name.d")), None);
    }
}
