//! Structured analyzer report parser.
//!
//! A report is a map with a `files` list and a `diagnostics` list. Each
//! diagnostic refers to its file by index into `files` and names its rule
//! through `issue_context`. Top-level shape problems skip the report; a
//! malformed entry is skipped on its own and reported as a `RecordError`.

use std::collections::BTreeMap;

use crate::errors::IngestError;
use crate::host::RuleCatalog;
use crate::models::diagnostic::RawField;
use crate::models::dialect::UNKNOWN_RULE_ID;
use crate::models::report::ReportSource;
use crate::models::run::RecordError;
use crate::parsers::plist::{self, PlistValue};
use crate::parsers::{read_report, ParseOutput, ReportParser};

/// Parser for scan-build style property-list reports.
pub struct TreeParser<'a> {
    catalog: &'a dyn RuleCatalog,
    repository: String,
}

impl<'a> TreeParser<'a> {
    pub fn new(catalog: &'a dyn RuleCatalog, repository: &str) -> Self {
        Self {
            catalog,
            repository: repository.to_string(),
        }
    }

    /// Rule id for an `issue_context`, falling back to the generic
    /// unknown-rule id when the catalog has no such rule.
    fn resolve_rule(&self, context: Option<&str>) -> String {
        match context {
            Some(rule) if !rule.is_empty() && self.catalog.rule_exists(&self.repository, rule) => {
                rule.to_string()
            }
            _ => {
                tracing::debug!(
                    repository = %self.repository,
                    issue_context = context.unwrap_or_default(),
                    fallback = UNKNOWN_RULE_ID,
                    "Unknown rule, using fallback id"
                );
                UNKNOWN_RULE_ID.to_string()
            }
        }
    }

    fn parse_entry(
        &self,
        entry: &PlistValue,
        files: &[String],
    ) -> Result<RawField, (&'static str, String)> {
        let entry = entry
            .as_dict()
            .ok_or_else(|| ("diagnostic", format!("expected dict, found {}", entry.kind_name())))?;

        let (filename, line) = match entry.get("location") {
            None => (None, None),
            Some(location) => resolve_location(location, files)?,
        };

        let rule_id = self.resolve_rule(entry.get("issue_context").and_then(PlistValue::as_str));
        let message = entry
            .get("description")
            .and_then(PlistValue::as_str)
            .map(str::to_string);

        Ok(RawField {
            filename,
            line,
            rule_id: Some(rule_id),
            message,
        })
    }
}

impl ReportParser for TreeParser<'_> {
    fn parse(&self, source: &ReportSource) -> Result<ParseOutput, IngestError> {
        let Some(bytes) = read_report(source.path())? else {
            return Ok(ParseOutput::default());
        };

        let schema_error = |reason: String| IngestError::Schema {
            path: source.path.clone(),
            reason,
        };

        let document = plist::parse_document(&bytes).map_err(|e| schema_error(e.to_string()))?;
        let (files, diagnostics) = report_sections(&document).map_err(schema_error)?;

        let mut output = ParseOutput::default();
        for (index, entry) in diagnostics.iter().enumerate() {
            match self.parse_entry(entry, &files) {
                Ok(record) => output.records.push(record),
                Err((field, message)) => output.errors.push(RecordError {
                    record_index: index,
                    field: field.to_string(),
                    message,
                }),
            }
        }

        tracing::debug!(
            path = %source.path.display(),
            files = files.len(),
            diagnostics = output.records.len(),
            record_errors = output.errors.len(),
            "Structured report parsed"
        );

        Ok(output)
    }

    fn name(&self) -> &str {
        "tree"
    }
}

/// Validate the top-level shape and return the resolved file list and the
/// raw diagnostic entries.
fn report_sections(document: &PlistValue) -> Result<(Vec<String>, &[PlistValue]), String> {
    let root: &BTreeMap<String, PlistValue> = document
        .as_dict()
        .ok_or_else(|| format!("expected a dict at top level, found {}", document.kind_name()))?;

    let files = root
        .get("files")
        .ok_or("missing 'files'")?
        .as_array()
        .ok_or("'files' is not an array")?
        .iter()
        .enumerate()
        .map(|(i, file)| {
            file.as_str()
                .map(|path| strip_traversal(path).to_string())
                .ok_or_else(|| format!("files[{i}] is a {}, expected string", file.kind_name()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let diagnostics = root
        .get("diagnostics")
        .ok_or("missing 'diagnostics'")?
        .as_array()
        .ok_or("'diagnostics' is not an array")?;

    Ok((files, diagnostics))
}

fn resolve_location(
    location: &PlistValue,
    files: &[String],
) -> Result<(Option<String>, Option<String>), (&'static str, String)> {
    let location = location.as_dict().ok_or_else(|| {
        ("location", format!("expected dict, found {}", location.kind_name()))
    })?;

    let line = match location.get("line") {
        None => None,
        Some(PlistValue::Integer(n)) => Some(n.to_string()),
        Some(other) => {
            return Err((
                "location.line",
                format!("expected integer, found {}", other.kind_name()),
            ))
        }
    };

    let file = match location.get("file") {
        None => None,
        Some(PlistValue::Integer(index)) => {
            let file = usize::try_from(*index)
                .ok()
                .and_then(|i| files.get(i))
                .ok_or_else(|| {
                    (
                        "location.file",
                        format!("index {index} out of range for {} files", files.len()),
                    )
                })?;
            Some(file.clone())
        }
        Some(other) => {
            return Err((
                "location.file",
                format!("expected integer, found {}", other.kind_name()),
            ))
        }
    };

    Ok((file, line))
}

/// Remove leading relative-traversal segments (`../` or `..\`).
pub fn strip_traversal(path: &str) -> &str {
    let mut rest = path;
    while let Some(stripped) = rest
        .strip_prefix("../")
        .or_else(|| rest.strip_prefix("..\\"))
    {
        rest = stripped;
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectConfig, Settings};
    use crate::host::MemoryCatalog;
    use crate::models::dialect::Dialect;
    use std::fs;
    use std::path::Path;

    fn source(path: &Path) -> ReportSource {
        let settings = Settings::new().with("scanbuild.reportPath", "reports");
        let config = DialectConfig::resolve(Dialect::Scanbuild, &settings)
            .unwrap()
            .unwrap();
        ReportSource::new(path.to_path_buf(), &config)
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_rule("scanbuild", "core.NullDereference")
            .with_rule("scanbuild", "deadcode.DeadStores")
    }

    fn parse_json(doc: &str) -> Result<ParseOutput, IngestError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, doc).unwrap();
        let catalog = catalog();
        TreeParser::new(&catalog, "scanbuild").parse(&source(&path))
    }

    #[test]
    fn parse_scanbuild_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.plist");
        fs::write(
            &path,
            include_bytes!("../../tests/fixtures/scanbuild/clangsa-report.plist"),
        )
        .unwrap();

        let catalog = catalog();
        let output = TreeParser::new(&catalog, "scanbuild")
            .parse(&source(&path))
            .unwrap();

        assert_eq!(output.records.len(), 2);
        assert!(output.errors.is_empty());
        let first = &output.records[0];
        assert_eq!(first.filename.as_deref(), Some("src/main.cpp"));
        assert_eq!(first.line.as_deref(), Some("31"));
        assert_eq!(first.rule_id.as_deref(), Some("deadcode.DeadStores"));
        assert_eq!(
            first.message.as_deref(),
            Some("Value stored to 'x' is never read")
        );
        assert_eq!(
            output.records[1].rule_id.as_deref(),
            Some("core.NullDereference")
        );
    }

    #[test]
    fn unknown_rule_falls_back() {
        let output = parse_json(
            r#"{"files": ["src/a.cc", "src/b.cc"],
                "diagnostics": [{"issue_context": "X", "description": "d",
                                 "location": {"file": 1, "line": 10}}]}"#,
        )
        .unwrap();
        let record = &output.records[0];
        assert_eq!(record.rule_id.as_deref(), Some(UNKNOWN_RULE_ID));
        assert_eq!(record.filename.as_deref(), Some("src/b.cc"));
        assert_eq!(record.line.as_deref(), Some("10"));
    }

    #[test]
    fn missing_issue_context_falls_back() {
        let output = parse_json(r#"{"files": [], "diagnostics": [{"description": "d"}]}"#).unwrap();
        assert_eq!(output.records[0].rule_id.as_deref(), Some(UNKNOWN_RULE_ID));
        assert_eq!(output.records[0].filename, None);
        assert_eq!(output.records[0].line, None);
    }

    #[test]
    fn missing_files_section_is_schema_error() {
        let err = parse_json(r#"{"diagnostics": []}"#).unwrap_err();
        match err {
            IngestError::Schema { reason, .. } => assert_eq!(reason, "missing 'files'"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_string_file_is_schema_error() {
        let err = parse_json(r#"{"files": [1], "diagnostics": []}"#).unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn null_file_entry_is_schema_error() {
        let err = parse_json(
            r#"{"files": ["src/a.cc", null, "src/c.cc"],
                "diagnostics": [
                  {"issue_context": "core.NullDereference", "description": "at c",
                   "location": {"file": 2, "line": 4}},
                  {"issue_context": "core.NullDereference", "description": "at null",
                   "location": {"file": 1, "line": 4}}
                ]}"#,
        )
        .unwrap_err();
        match err {
            IngestError::Schema { reason, .. } => {
                assert_eq!(reason, "files[1] is a null, expected string")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_diagnostic_keeps_entry_indices() {
        let output = parse_json(
            r#"{"files": ["src/a.cc", "src/c.cc"],
                "diagnostics": [
                  null,
                  {"issue_context": "core.NullDereference", "description": "at c",
                   "location": {"file": 1, "line": 4}},
                  {"issue_context": "core.NullDereference", "description": "bad",
                   "location": {"file": 9, "line": 4}}
                ]}"#,
        )
        .unwrap();

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].filename.as_deref(), Some("src/c.cc"));
        assert_eq!(output.records[0].message.as_deref(), Some("at c"));
        let fields: Vec<_> = output
            .errors
            .iter()
            .map(|e| (e.record_index, e.field.as_str()))
            .collect();
        assert_eq!(fields, vec![(0, "diagnostic"), (2, "location.file")]);
    }

    #[test]
    fn top_level_array_is_schema_error() {
        let err = parse_json(r#"[1, 2]"#).unwrap_err();
        assert!(err.to_string().contains("expected a dict at top level"));
    }

    #[test]
    fn malformed_entries_become_record_errors() {
        let output = parse_json(
            r#"{"files": ["a.cc"],
                "diagnostics": [
                  "not a dict",
                  {"issue_context": "core.NullDereference", "description": "d",
                   "location": {"file": 5, "line": 1}},
                  {"issue_context": "core.NullDereference", "description": "d",
                   "location": {"file": 0, "line": "one"}},
                  {"issue_context": "core.NullDereference", "description": "ok",
                   "location": {"file": 0, "line": 2}}
                ]}"#,
        )
        .unwrap();

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].message.as_deref(), Some("ok"));
        let fields: Vec<_> = output
            .errors
            .iter()
            .map(|e| (e.record_index, e.field.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![(0, "diagnostic"), (1, "location.file"), (2, "location.line")]
        );
    }

    #[test]
    fn broken_plist_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.plist");
        fs::write(
            &path,
            include_bytes!("../../tests/fixtures/scanbuild/broken.plist"),
        )
        .unwrap();
        let catalog = catalog();
        let err = TreeParser::new(&catalog, "scanbuild")
            .parse(&source(&path))
            .unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn strip_traversal_removes_leading_segments() {
        assert_eq!(strip_traversal("../../src/a.cc"), "src/a.cc");
        assert_eq!(strip_traversal("..\\src\\a.cc"), "src\\a.cc");
        assert_eq!(strip_traversal("src/../a.cc"), "src/../a.cc");
        assert_eq!(strip_traversal("/abs/a.cc"), "/abs/a.cc");
    }
}
