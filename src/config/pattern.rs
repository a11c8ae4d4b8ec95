//! Report patterns validated once at configuration time.
//!
//! A pattern either names all four groups (`filename`, `line`, `id`,
//! `message`; `file` is accepted for `filename`) or uses no names at all
//! and exposes at least four positional groups in that order.

use regex::{Captures, Regex};

use crate::errors::ConfigError;
use crate::models::diagnostic::RawField;

const REQUIRED_GROUPS: [&str; 3] = ["line", "id", "message"];
const FILENAME_GROUPS: [&str; 2] = ["filename", "file"];

/// How capture groups map onto `RawField` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLayout {
    /// Named groups; `filename` holds the group name used for the file.
    Named { filename: &'static str },
    /// Groups 1..=4 are filename, line, id, message.
    Positional,
}

/// A compiled line pattern with a known group layout.
#[derive(Debug, Clone)]
pub struct ReportPattern {
    regex: Regex,
    layout: GroupLayout,
}

impl ReportPattern {
    /// Compile `pattern` and check its capture groups.
    ///
    /// `key` is the property the pattern came from and only feeds error
    /// messages.
    pub fn compile(key: &str, pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            key: key.to_string(),
            source,
        })?;

        let names: Vec<&str> = regex.capture_names().flatten().collect();
        let layout = if names.is_empty() {
            // captures_len counts the implicit whole-match group
            if regex.captures_len() - 1 < 4 {
                return Err(ConfigError::MissingGroups {
                    key: key.to_string(),
                    missing: vec![format!(
                        "{} positional groups (found {})",
                        4,
                        regex.captures_len() - 1
                    )],
                });
            }
            GroupLayout::Positional
        } else {
            let mut missing = Vec::new();
            let filename = FILENAME_GROUPS.into_iter().find(|g| names.contains(g));
            if filename.is_none() {
                missing.push("filename".to_string());
            }
            for group in REQUIRED_GROUPS {
                if !names.contains(&group) {
                    missing.push(group.to_string());
                }
            }
            match filename {
                Some(filename) if missing.is_empty() => GroupLayout::Named { filename },
                _ => {
                    return Err(ConfigError::MissingGroups {
                        key: key.to_string(),
                        missing,
                    })
                }
            }
        };

        Ok(Self { regex, layout })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn layout(&self) -> GroupLayout {
        self.layout
    }

    /// Match one line. Non-matching lines yield `None`; groups that did not
    /// participate in the match yield absent fields.
    pub fn extract(&self, line: &str) -> Option<RawField> {
        let caps = self.regex.captures(line)?;
        let field = match self.layout {
            GroupLayout::Named { filename } => RawField::new(
                named(&caps, filename),
                named(&caps, "line"),
                named(&caps, "id"),
                named(&caps, "message"),
            ),
            GroupLayout::Positional => RawField::new(
                positional(&caps, 1),
                positional(&caps, 2),
                positional(&caps, 3),
                positional(&caps, 4),
            ),
        };
        Some(field)
    }
}

fn named<'h>(caps: &Captures<'h>, group: &str) -> Option<&'h str> {
    caps.name(group).map(|m| m.as_str())
}

fn positional<'h>(caps: &Captures<'h>, index: usize) -> Option<&'h str> {
    caps.get(index).map(|m| m.as_str())
}
