//! Engine-level failures.
//!
//! Syntax problems are never errors at this level: they are values collected in [`crate::diagnostics::ErrorList`].
//! [`AnalysisError`] covers the system side (file access, bad module names, missing runtime).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("'{0}' is not a valid module name")]
    InvalidModuleName(String),

    #[error("background work needs a running tokio runtime")]
    NoRuntime,
}

impl AnalysisError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Read a source file, rejecting directories.
pub fn read_source(path: &std::path::Path) -> AnalysisResult<String> {
    let metadata = std::fs::metadata(path).map_err(|e| AnalysisError::io(path, e))?;
    if !metadata.is_file() {
        return Err(AnalysisError::NotAFile(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))
}
