//! Conversion of raw parser fields into canonical diagnostics.

use crate::models::diagnostic::{Diagnostic, RawField};

/// Build a `Diagnostic` from raw fields.
///
/// Absent or blank filenames give an unlocated diagnostic, and a line is
/// only kept alongside a file. Lines that are not a positive integer are
/// dropped. Rule ids and messages are kept verbatim; missing ones become
/// empty strings, which the validation gate then rejects.
pub fn normalize(raw: RawField) -> Diagnostic {
    let file = raw
        .filename
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    let line = match file {
        Some(_) => raw.line.as_deref().and_then(parse_line),
        None => None,
    };

    Diagnostic {
        file,
        line,
        rule_id: raw.rule_id.unwrap_or_default(),
        message: raw.message.unwrap_or_default(),
    }
}

fn parse_line(line: &str) -> Option<u32> {
    line.trim().parse::<u32>().ok().filter(|n| *n > 0)
}
