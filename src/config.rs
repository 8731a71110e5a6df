//! Analysis configuration.
//!
//! One explicitly constructed object per cache; nothing here is process-global, so tests can run several
//! independent caches side by side.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration read by the module cache, bulk scanner, resolver and document sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Library directories to bulk-parse
    pub import_paths: Vec<PathBuf>,
    /// File extensions (without dot) treated as D sources
    pub source_extensions: Vec<String>,
    /// Where the bulk-scan parse log is written; no log when unset
    pub diagnostics_dir: Option<PathBuf>,
    /// Prefix of the parse log file name
    pub cache_label: String,
    /// Run the post-parse type reference scan
    pub semantic_highlighting: bool,
    pub code_completion: bool,
    pub method_insight: bool,
    /// Quiet period after the last edit before a document is re-parsed
    pub debounce: Duration,
    /// How often a document session checks for new edits while debouncing
    pub poll_interval: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            import_paths: Vec::new(),
            source_extensions: vec!["d".to_string(), "di".to_string()],
            diagnostics_dir: None,
            cache_label: "D2".to_string(),
            semantic_highlighting: true,
            code_completion: true,
            method_insight: true,
            debounce: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl AnalysisConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the library directories to bulk-parse
    pub fn with_import_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.import_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.source_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the directory the parse log is written to
    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    pub fn with_cache_label(mut self, label: impl Into<String>) -> Self {
        self.cache_label = label.into();
        self
    }

    pub fn with_semantic_highlighting(mut self, enabled: bool) -> Self {
        self.semantic_highlighting = enabled;
        self
    }

    pub fn with_code_completion(mut self, enabled: bool) -> Self {
        self.code_completion = enabled;
        self
    }

    pub fn with_method_insight(mut self, enabled: bool) -> Self {
        self.method_insight = enabled;
        self
    }

    /// Set the quiet period before re-parsing an edited document
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Return `true` if `path` has one of the configured source extensions.
    pub fn is_source_file(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|known| known == ext))
    }

    /// File name of the bulk-scan log: `<label>.GlobalParseLog.log`.
    pub fn parse_log_name(&self) -> String {
        format!("{}.GlobalParseLog.log", self.cache_label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert!(config.semantic_highlighting);
        assert!(config.import_paths.is_empty());
        assert_eq!(config.parse_log_name(), "D2.GlobalParseLog.log");
    }

    #[test]
    fn test_builder_chain() {
        let config = AnalysisConfig::new()
            .with_import_paths(["/usr/include/d"])
            .with_diagnostics_dir("/tmp/logs")
            .with_semantic_highlighting(false)
            .with_debounce(Duration::from_millis(20));
        assert_eq!(config.import_paths, vec![PathBuf::from("/usr/include/d")]);
        assert_eq!(config.diagnostics_dir.as_deref(), Some(Path::new("/tmp/logs")));
        assert!(!config.semantic_highlighting);
        assert_eq!(config.debounce, Duration::from_millis(20));
    }

    #[test]
    fn test_source_extensions() {
        let config = AnalysisConfig::default();
        assert!(config.is_source_file(Path::new("std/stdio.d")));
        assert!(config.is_source_file(Path::new("core/memory.di")));
        assert!(!config.is_source_file(Path::new("README.md")));
        assert!(!config.is_source_file(Path::new("Makefile")));
    }
}
