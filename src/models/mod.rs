//! Domain types shared by parsers and services.

pub mod diagnostic;
pub mod dialect;
pub mod report;
pub mod run;

pub use diagnostic::{DedupKey, Diagnostic, RawField};
pub use dialect::{Dialect, DialectProfile, ParserKind, UNKNOWN_RULE_ID};
pub use report::ReportSource;
pub use run::{PublishedCounts, RecordError, ReportFailure, RunSummary};
