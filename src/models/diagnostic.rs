//! Raw parser output and the canonical diagnostic record.

use serde::{Deserialize, Serialize};

/// Untyped field tuple produced by a parser.
///
/// Every field is optional: a regex group that did not participate, or a
/// structured entry without a location, simply leaves the field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub filename: Option<String>,
    pub line: Option<String>,
    pub rule_id: Option<String>,
    pub message: Option<String>,
}

impl RawField {
    pub fn new(
        filename: Option<&str>,
        line: Option<&str>,
        rule_id: Option<&str>,
        message: Option<&str>,
    ) -> Self {
        Self {
            filename: filename.map(str::to_string),
            line: line.map(str::to_string),
            rule_id: rule_id.map(str::to_string),
            message: message.map(str::to_string),
        }
    }
}

/// A normalized diagnostic ready for the validation gate.
///
/// `rule_id` and `message` must be non-empty for the diagnostic to be
/// reported. `file` and `line` may be absent; such a diagnostic is bound
/// to the project instead of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: Option<String>,
    /// 1-based.
    pub line: Option<u32>,
    pub rule_id: String,
    pub message: String,
}

impl Diagnostic {
    /// Whether `rule_id` and `message` are both non-empty.
    pub fn is_valid(&self) -> bool {
        !self.rule_id.is_empty() && !self.message.is_empty()
    }

    /// Whether the diagnostic points at a file.
    pub fn is_located(&self) -> bool {
        self.file.is_some()
    }
}

/// Identity of a diagnostic occurrence within one run.
///
/// Hex-encoded SHA-256 over `(file, line, rule_id, message)`; see
/// `services::fingerprint::dedup_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(pub String);

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
