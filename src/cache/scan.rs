//! Bulk scan of library directories.
//!
//! Every source file under the configured import paths is parsed and cached. One bad file never stops the batch:
//! read failures and parse errors are collected per file, logged, and written to the parse log.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use walkdir::WalkDir;

use super::{ModuleCache, ModuleEntry, module_name_for_path};
use crate::diagnostics::ErrorList;
use crate::errors::{AnalysisError, AnalysisResult, read_source};

/// Errors of one file that did not scan cleanly.
#[derive(Debug, Clone)]
pub struct FileErrors {
    pub path: PathBuf,
    /// Set when the file was read and parsed (and is cached despite its errors)
    pub module: Option<String>,
    pub errors: ErrorList,
}

/// Outcome of a bulk scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Names of modules cached by this scan, in scan order
    pub parsed: Vec<String>,
    pub failures: Vec<FileErrors>,
    pub elapsed: Duration,
    /// Where the parse log was written
    pub log_path: Option<PathBuf>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BulkScanner {
    cache: Arc<ModuleCache>,
    roots: Vec<PathBuf>,
}

impl BulkScanner {
    /// Scanner over the cache's configured import paths.
    pub fn new(cache: Arc<ModuleCache>) -> Self {
        let roots = cache.config().import_paths.clone();
        Self { cache, roots }
    }

    /// Scan `roots` instead of the configured import paths.
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Run the scan on the current thread.
    ///
    /// Re-running is safe: each module name keeps the last version written.
    #[tracing::instrument(skip_all, fields(roots = self.roots.len()))]
    pub fn run(&self) -> ScanReport {
        let _guard = self.cache.begin_bulk_parse();
        self.scan()
    }

    /// Run the scan on tokio's blocking pool. [`ModuleCache::is_parsing`] is already true when this returns.
    pub fn spawn(self) -> AnalysisResult<JoinHandle<ScanReport>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| AnalysisError::NoRuntime)?;
        let guard = self.cache.begin_bulk_parse();
        Ok(runtime.spawn_blocking(move || {
            let report = self.scan();
            drop(guard);
            report
        }))
    }

    fn scan(&self) -> ScanReport {
        let started = Instant::now();
        let config = self.cache.config();
        let mut report = ScanReport::default();

        for root in &self.roots {
            for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                        tracing::warn!(path = %path.display(), error = %e, "cannot walk directory entry");
                        let source = e.into_io_error().unwrap_or_else(|| std::io::Error::other("directory loop"));
                        report.failures.push(system_failure(path.clone(), AnalysisError::io(path, source)));
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !config.is_source_file(entry.path()) {
                    continue;
                }
                self.scan_file(root, entry.path(), &mut report);
            }
        }

        report.elapsed = started.elapsed();
        report.log_path = self.write_parse_log(&report);
        tracing::info!(
            parsed = report.parsed.len(),
            failures = report.failures.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "bulk scan finished"
        );
        report
    }

    fn scan_file(&self, root: &Path, path: &Path, report: &mut ScanReport) {
        let source = match read_source(path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable source");
                report.failures.push(system_failure(path.to_path_buf(), e));
                return;
            }
        };
        let Some(fallback) = module_name_for_path(root, path) else {
            let e = AnalysisError::InvalidModuleName(path.display().to_string());
            tracing::warn!(path = %path.display(), "no module name derivable");
            report.failures.push(system_failure(path.to_path_buf(), e));
            return;
        };

        let entry = ModuleEntry::parse(&fallback, Some(path.to_path_buf()), source);
        if entry.has_errors() {
            tracing::warn!(path = %path.display(), errors = entry.errors.len(), "source has syntax errors");
            report.failures.push(FileErrors {
                path: path.to_path_buf(),
                module: Some(entry.name.clone()),
                errors: entry.error_list(),
            });
        }
        report.parsed.push(entry.name.clone());
        self.cache.replace_module(entry);
    }

    /// Best-effort human-readable log; failures to write it are logged and otherwise ignored.
    fn write_parse_log(&self, report: &ScanReport) -> Option<PathBuf> {
        let config = self.cache.config();
        let dir = config.diagnostics_dir.as_ref()?;
        let path = dir.join(config.parse_log_name());
        let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, format_parse_log(report)));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot write parse log");
                None
            }
        }
    }
}

fn system_failure(path: PathBuf, error: AnalysisError) -> FileErrors {
    let mut errors = ErrorList::new(Some(path.clone()));
    errors.push_system(&error);
    FileErrors {
        path,
        module: None,
        errors,
    }
}

/// Text of the parse log: a summary line, then every error grouped by file.
pub fn format_parse_log(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Parsed {} modules in {} ms; {} file(s) with errors",
        report.parsed.len(),
        report.elapsed.as_millis(),
        report.failures.len()
    );
    for failure in &report.failures {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- {}", failure.path.display());
        for record in &failure.errors {
            let _ = writeln!(
                out,
                "{}:{} {}: {}",
                record.location.line, record.location.column, record.severity, record.message
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dscope_scan_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_scan_derives_names_and_writes_log() {
        let root = scratch_dir("names");
        std::fs::create_dir_all(root.join("pkg/sub")).unwrap();
        std::fs::write(root.join("pkg/a.d"), "int a;").unwrap();
        std::fs::write(root.join("pkg/sub/package.d"), "int s;").unwrap();
        std::fs::write(root.join("pkg/named.d"), "module custom.name; int n;").unwrap();
        std::fs::write(root.join("notes.txt"), "not a source").unwrap();

        let logs = root.join("logs");
        let config = AnalysisConfig::new()
            .with_import_paths([root.clone()])
            .with_diagnostics_dir(&logs);
        let cache = Arc::new(ModuleCache::new(Arc::new(config)));
        let report = BulkScanner::new(Arc::clone(&cache)).run();

        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(cache.module_names(), ["custom.name", "pkg.a", "pkg.sub"]);
        let log = std::fs::read_to_string(logs.join("D2.GlobalParseLog.log")).unwrap();
        assert!(log.starts_with("Parsed 3 modules"), "{log}");
        assert!(!cache.is_parsing());

        // A second run replaces entries instead of adding more
        let again = BulkScanner::new(Arc::clone(&cache)).run();
        assert_eq!(again.parsed.len(), 3);
        assert_eq!(cache.len(), 3);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_root_is_a_system_failure() {
        let config = AnalysisConfig::new().with_import_paths(["/definitely/not/here/dscope"]);
        let cache = Arc::new(ModuleCache::new(Arc::new(config)));
        let report = BulkScanner::new(cache).run();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].errors.has_errors());
    }
}
