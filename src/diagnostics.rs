//! Error list and report rendering.
//!
//! [`ErrorList`] is what an error-list view consumes: one per file, enumerable, ordered by the time each record was
//! produced. [`render_report`] turns a single syntax error into a miette report with source context for the CLI.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use dscope_syntax::ast::{CodeLocation, LineIndex, Span};
use dscope_syntax::diagnostics::{CompileError, ErrorKind};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, SourceCode, SourceSpan};

use crate::errors::AnalysisError;

// ============================================================================
// Error list
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// Which stage produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Parser,
    Semantic,
    System,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Parser => write!(f, "parser"),
            Origin::Semantic => write!(f, "semantic"),
            Origin::System => write!(f, "system"),
        }
    }
}

/// One entry of an error list.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub message: String,
    /// 1-based line/column of `span.start`
    pub location: CodeLocation,
    pub span: Span,
    pub severity: Severity,
    pub origin: Origin,
    pub timestamp: SystemTime,
    pub file: Option<PathBuf>,
}

impl ErrorRecord {
    /// Record for a lex/parse error. Unsupported constructs are warnings: the file is partially understood, not
    /// broken.
    pub fn from_compile_error(error: &CompileError, lines: &LineIndex, file: Option<PathBuf>) -> Self {
        let severity = match error.kind {
            ErrorKind::Lex | ErrorKind::Syntax => Severity::Error,
            ErrorKind::Unimplemented => Severity::Warning,
        };
        Self {
            message: error.message.clone(),
            location: lines.location(error.span.start),
            span: error.span,
            severity,
            origin: Origin::Parser,
            timestamp: SystemTime::now(),
            file,
        }
    }

    pub fn semantic(message: impl Into<String>, span: Span, lines: &LineIndex, file: Option<PathBuf>) -> Self {
        Self {
            message: message.into(),
            location: lines.location(span.start),
            span,
            severity: Severity::Warning,
            origin: Origin::Semantic,
            timestamp: SystemTime::now(),
            file,
        }
    }

    pub fn system(error: &AnalysisError, file: Option<PathBuf>) -> Self {
        Self {
            message: error.to_string(),
            location: CodeLocation::new(1, 1),
            span: Span::default(),
            severity: Severity::Error,
            origin: Origin::System,
            timestamp: SystemTime::now(),
            file,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file.display())?;
        }
        write!(
            f,
            "{}:{}: {} ({}): {}",
            self.location.line, self.location.column, self.severity, self.origin, self.message
        )
    }
}

/// Per-file error list, ordered by timestamp; records with equal stamps keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorList {
    pub file: Option<PathBuf>,
    records: Vec<ErrorRecord>,
}

impl ErrorList {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file,
            records: Vec::new(),
        }
    }

    /// List holding every error of one parse, in source order.
    pub fn from_parse(file: Option<PathBuf>, lines: &LineIndex, errors: &[CompileError]) -> Self {
        let mut list = Self::new(file);
        for error in errors {
            let record = ErrorRecord::from_compile_error(error, lines, list.file.clone());
            list.push(record);
        }
        list
    }

    pub fn push(&mut self, record: ErrorRecord) {
        let position = self.records.partition_point(|r| r.timestamp <= record.timestamp);
        self.records.insert(position, record);
    }

    pub fn push_system(&mut self, error: &AnalysisError) {
        let record = ErrorRecord::system(error, self.file.clone());
        self.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ErrorRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|r| r.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records.iter().filter(|r| r.severity == severity).count()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ErrorRecord;
    type IntoIter = std::slice::Iter<'a, ErrorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Report rendering
// ============================================================================

/// A [`CompileError`] bound to its source, in the shape miette renders.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct SourceReport {
    message: String,
    kind: ErrorKind,
    source_code: NamedSource<String>,
    span: SourceSpan,
    help: Option<String>,
}

impl Diagnostic for SourceReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.kind {
            ErrorKind::Unimplemented => miette::Severity::Warning,
            ErrorKind::Lex | ErrorKind::Syntax => miette::Severity::Error,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help.as_ref().map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.kind.to_string()), self.span);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Render `error` with source context, notes and hints.
pub fn render_report(file_name: &str, source: &str, error: &CompileError) -> String {
    let start = error.span.start.min(source.len());
    let end = error.span.end.clamp(start, source.len());

    let mut extra: Vec<String> = error.notes.iter().map(|n| format!("note: {n}")).collect();
    extra.extend(error.hints.iter().cloned());
    let report = SourceReport {
        message: error.message.clone(),
        kind: error.kind,
        source_code: NamedSource::new(file_name, source.to_string()),
        span: SourceSpan::from((start, end - start)),
        help: (!extra.is_empty()).then(|| extra.join("\n")),
    };

    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    if handler.render_report(&mut out, &report).is_err() {
        // Fall back to the one-line form
        let location = LineIndex::new(source).location(start);
        out = format!("{file_name}:{}:{}: {error}", location.line, location.column);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscope_syntax::parser::parse_source;

    #[test]
    fn test_error_list_from_parse() {
        let source = "int x = ;\nvoid f() { asm { mov EAX, 1; } }\nint y;";
        let parsed = parse_source(source);
        let list = ErrorList::from_parse(Some(PathBuf::from("a.d")), &parsed.tree.line_index, &parsed.errors);
        assert_eq!(list.len(), 2);
        assert_eq!(list.count(Severity::Error), 1);
        assert_eq!(list.count(Severity::Warning), 1);
        let records: Vec<_> = list.iter().collect();
        assert_eq!(records[0].location.line, 1);
        assert_eq!(records[1].location.line, 2);
        assert!(records.iter().all(|r| r.origin == Origin::Parser));
        assert!(records.iter().all(|r| r.file.as_deref() == Some(std::path::Path::new("a.d"))));
    }

    #[test]
    fn test_error_list_orders_by_timestamp() {
        let lines = LineIndex::new("x");
        let mut list = ErrorList::new(None);
        let mut late = ErrorRecord::semantic("late", Span::new(0, 1), &lines, None);
        late.timestamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(20);
        let mut early = ErrorRecord::semantic("early", Span::new(0, 1), &lines, None);
        early.timestamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(10);
        let mut also_late = late.clone();
        also_late.message = "also late".to_string();
        list.push(late);
        list.push(early);
        list.push(also_late);
        let messages: Vec<_> = list.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["early", "late", "also late"]);
    }

    #[test]
    fn test_system_records_are_errors() {
        let mut list = ErrorList::new(None);
        list.push_system(&AnalysisError::NotAFile(PathBuf::from("lib")));
        assert!(list.has_errors());
        let record = list.iter().next().expect("record");
        assert_eq!(record.origin, Origin::System);
        assert_eq!(record.message, "'lib' is not a file");
    }

    #[test]
    fn test_render_report_mentions_code_and_location() {
        let source = "module m;\nint x = ;\n";
        let parsed = parse_source(source);
        let error = parsed.errors.first().expect("error");
        let report = render_report("m.d", source, error);
        assert!(report.contains("dscope::syntax"), "{report}");
        assert!(report.contains("m.d:2"), "{report}");
    }
}
