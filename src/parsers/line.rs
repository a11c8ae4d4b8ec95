//! Line-oriented compiler log parser.
//!
//! Decodes the report with the configured charset (a byte-order mark wins
//! over the configuration), splits it into physical lines and matches each
//! line against the dialect pattern. Lines that do not match are ignored.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::errors::IngestError;
use crate::models::report::ReportSource;
use crate::parsers::{read_report, ParseOutput, ReportParser};

/// Regex-per-line parser shared by every compiler dialect.
#[derive(Debug, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }
}

impl ReportParser for LineParser {
    fn parse(&self, source: &ReportSource) -> Result<ParseOutput, IngestError> {
        let Some(pattern) = source.pattern.as_ref() else {
            return Err(IngestError::Schema {
                path: source.path.clone(),
                reason: "no line pattern configured".to_string(),
            });
        };

        let Some(bytes) = read_report(source.path())? else {
            return Ok(ParseOutput::default());
        };

        let text = decode(&bytes, source.encoding).ok_or_else(|| IngestError::Decode {
            path: source.path.clone(),
            charset: source.charset().to_string(),
        })?;

        let records: Vec<_> = text.lines().filter_map(|line| pattern.extract(line)).collect();

        tracing::debug!(
            path = %source.path.display(),
            charset = source.charset(),
            matched = records.len(),
            "Line report parsed"
        );

        Ok(ParseOutput {
            records,
            errors: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "line"
    }
}

/// Strictly decode `bytes`. A leading byte-order mark selects the encoding
/// and is stripped. Returns `None` on any malformed sequence.
pub fn decode<'b>(bytes: &'b [u8], configured: &'static Encoding) -> Option<Cow<'b, str>> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (configured, bytes),
    };
    encoding.decode_without_bom_handling_and_without_replacement(body)
}
