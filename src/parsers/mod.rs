//! Report parsers turning build output into raw diagnostic records.
//!
//! Each parser implements the `ReportParser` trait, producing `RawField`
//! records from one report file. Line parsers match compiler logs line by
//! line against the dialect pattern; the tree parser walks a structured
//! analyzer report. Parsers never validate or deduplicate, and keep no
//! state between reports.

pub mod line;
pub mod plist;
pub mod tree;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::errors::IngestError;
use crate::host::RuleCatalog;
use crate::models::diagnostic::RawField;
use crate::models::dialect::ParserKind;
use crate::models::report::ReportSource;
use crate::models::run::RecordError;

pub use line::LineParser;
pub use tree::TreeParser;

/// Result of parsing one report file.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub records: Vec<RawField>,
    /// Entries skipped because they could not be turned into a record.
    pub errors: Vec<RecordError>,
}

/// Trait for pluggable report parsers.
pub trait ReportParser: Send + Sync {
    /// Parse one report into raw records.
    ///
    /// A returned error skips the whole report; entry-level problems go
    /// into `ParseOutput::errors` instead.
    fn parse(&self, source: &ReportSource) -> Result<ParseOutput, IngestError>;

    /// Short parser name for logs.
    fn name(&self) -> &str;
}

/// Select the parser for a dialect's parser kind.
pub fn parser_for<'a>(
    kind: ParserKind,
    catalog: &'a dyn RuleCatalog,
    repository: &str,
) -> Box<dyn ReportParser + 'a> {
    match kind {
        ParserKind::Line => Box::new(LineParser::new()),
        ParserKind::Tree => Box::new(TreeParser::new(catalog, repository)),
    }
}

/// Read a report file. `Ok(None)` means the file exists but is empty.
pub(crate) fn read_report(path: &Path) -> Result<Option<Vec<u8>>, IngestError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IngestError::ReportNotFound {
            path: path.to_path_buf(),
        },
        _ => IngestError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if bytes.is_empty() {
        tracing::warn!(path = %path.display(), "Report seems to be empty, ignoring");
        return Ok(None);
    }
    Ok(Some(bytes))
}
