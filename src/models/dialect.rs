//! Report dialects and their static parsing profiles.
//!
//! Dialect variation is data: every dialect maps to a `DialectProfile`
//! holding its default pattern, charset, rule repository and metric key.
//! The parsers themselves carry no per-dialect logic.

use serde::{Deserialize, Serialize};

/// Default charset for every line-oriented dialect.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Rule identifier used when a structured report references a rule the
/// catalog does not know.
pub const UNKNOWN_RULE_ID: &str = "unknownError";

/// Which parser family handles a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// One regex match per physical line.
    Line,
    /// Nested map/array document with `files` and `diagnostics`.
    Tree,
}

/// Supported third-party report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    Gcc,
    GccNoColumn,
    Vc,
    Clang,
    Scanbuild,
}

/// Static defaults for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct DialectProfile {
    /// Property key prefix, e.g. `compiler.gcc`.
    pub key: &'static str,
    pub kind: ParserKind,
    /// Default regex; `None` for tree dialects.
    pub default_pattern: Option<&'static str>,
    pub default_charset: &'static str,
    /// Rule repository passed to the catalog and to `record_violation`.
    pub repository: &'static str,
    /// Metric the per-file and project counts are published under.
    pub metric_key: &'static str,
    /// Filename suffix used when expanding report directories.
    pub extension: Option<&'static str>,
}

const GCC_PATTERN: &str = r"^(?P<filename>(?:[A-Za-z]:)?[^:]+):(?P<line>[0-9]+):[0-9]+:\x20warning:\x20(?P<message>.*?)(?:\x20\[(?P<id>[^\]]+)\])?\s*$";

const GCC_NO_COLUMN_PATTERN: &str = r"^(?P<filename>(?:[A-Za-z]:)?[^:]+):(?P<line>[0-9]+):\x20warning:\x20(?P<message>.*?)(?:\x20\[(?P<id>[^\]]+)\])?\s*$";

const VC_PATTERN: &str = r"^(?:.*>)?(?P<filename>(?:[A-Za-z]:)?[^:(]+)\((?P<line>[0-9]+)\)\x20?:\x20warning\x20(?P<id>C[0-9]+):\x20?(?P<message>.*?)(?:\x20\[[^\]]*\])?\s*$";

const CLANG_PATTERN: &str = r"^(?P<filename>(?:[A-Za-z]:)?[^:]+):(?P<line>[0-9]+):[0-9]+:\x20warning:\x20(?P<message>.*?)\x20\[(?P<id>[^\]]+)\]\s*$";

impl Dialect {
    /// All dialects in the order runs are executed.
    pub const ALL: [Dialect; 5] = [
        Dialect::Gcc,
        Dialect::GccNoColumn,
        Dialect::Vc,
        Dialect::Clang,
        Dialect::Scanbuild,
    ];

    pub fn profile(&self) -> DialectProfile {
        match self {
            Self::Gcc => DialectProfile {
                key: "compiler.gcc",
                kind: ParserKind::Line,
                default_pattern: Some(GCC_PATTERN),
                default_charset: DEFAULT_CHARSET,
                repository: "compiler-gcc",
                metric_key: "CXX-COMPILER.GCC",
                extension: None,
            },
            Self::GccNoColumn => DialectProfile {
                key: "compiler.gcc-nocolumn",
                kind: ParserKind::Line,
                default_pattern: Some(GCC_NO_COLUMN_PATTERN),
                default_charset: DEFAULT_CHARSET,
                repository: "compiler-gcc",
                metric_key: "CXX-COMPILER.GCC",
                extension: None,
            },
            Self::Vc => DialectProfile {
                key: "compiler.vc",
                kind: ParserKind::Line,
                default_pattern: Some(VC_PATTERN),
                default_charset: DEFAULT_CHARSET,
                repository: "compiler-vc",
                metric_key: "CXX-COMPILER.VC",
                extension: None,
            },
            Self::Clang => DialectProfile {
                key: "compiler.clang",
                kind: ParserKind::Line,
                default_pattern: Some(CLANG_PATTERN),
                default_charset: DEFAULT_CHARSET,
                repository: "compiler-clang",
                metric_key: "CXX-COMPILER.CLANG",
                extension: None,
            },
            Self::Scanbuild => DialectProfile {
                key: "scanbuild",
                kind: ParserKind::Tree,
                default_pattern: None,
                default_charset: DEFAULT_CHARSET,
                repository: "scanbuild",
                metric_key: "CXX-SCANBUILD",
                extension: Some("plist"),
            },
        }
    }

    pub fn key(&self) -> &'static str {
        self.profile().key
    }

    pub fn kind(&self) -> ParserKind {
        self.profile().kind
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| format!("unknown dialect: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn captures<'a>(pattern: &str, line: &'a str) -> Option<[Option<&'a str>; 4]> {
        let re = Regex::new(pattern).unwrap();
        re.captures(line).map(|c| {
            ["filename", "line", "id", "message"].map(|g| c.name(g).map(|m| m.as_str()))
        })
    }

    #[test]
    fn dialect_display_uses_property_key() {
        assert_eq!(Dialect::Gcc.to_string(), "compiler.gcc");
        assert_eq!(Dialect::Scanbuild.to_string(), "scanbuild");
    }

    #[test]
    fn dialect_from_str_round_trips_keys() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.key().parse::<Dialect>().unwrap(), dialect);
        }
        assert!("compiler.icc".parse::<Dialect>().is_err());
    }

    #[test]
    fn dialect_serialization() {
        let json = serde_json::to_value(Dialect::GccNoColumn).unwrap();
        assert_eq!(json, "gcc_no_column");
    }

    #[test]
    fn only_scanbuild_is_tree_structured() {
        for dialect in Dialect::ALL {
            let profile = dialect.profile();
            match dialect {
                Dialect::Scanbuild => {
                    assert_eq!(profile.kind, ParserKind::Tree);
                    assert!(profile.default_pattern.is_none());
                }
                _ => {
                    assert_eq!(profile.kind, ParserKind::Line);
                    assert!(profile.default_pattern.is_some());
                }
            }
        }
    }

    #[test]
    fn gcc_pattern_splits_flag_from_message() {
        let line = "src/zipmanager.cpp:141:35: warning: conversion to 'int' from 'size_t' may alter its value [-Wconversion]";
        let [file, line_no, id, msg] = captures(GCC_PATTERN, line).unwrap();
        assert_eq!(file, Some("src/zipmanager.cpp"));
        assert_eq!(line_no, Some("141"));
        assert_eq!(id, Some("-Wconversion"));
        assert_eq!(msg, Some("conversion to 'int' from 'size_t' may alter its value"));
    }

    #[test]
    fn gcc_pattern_leaves_id_absent_without_flag() {
        let line = "src/a.c:3:1: warning: no newline at end of file";
        let [_, _, id, msg] = captures(GCC_PATTERN, line).unwrap();
        assert_eq!(id, None);
        assert_eq!(msg, Some("no newline at end of file"));
    }

    #[test]
    fn gcc_pattern_ignores_errors_and_notes() {
        assert!(captures(GCC_PATTERN, "src/a.c:3:1: error: expected ';'").is_none());
        assert!(captures(GCC_PATTERN, "src/a.c:3:1: note: declared here").is_none());
    }

    #[test]
    fn gcc_no_column_pattern_matches_line_only_locations() {
        let line = "lib/util.c:88: warning: unused variable 'x' [-Wunused-variable]";
        let [file, line_no, id, _] = captures(GCC_NO_COLUMN_PATTERN, line).unwrap();
        assert_eq!(file, Some("lib/util.c"));
        assert_eq!(line_no, Some("88"));
        assert_eq!(id, Some("-Wunused-variable"));
    }

    #[test]
    fn vc_pattern_handles_msbuild_prefix_and_project_suffix() {
        let line = r"1>c:\work\zip\zipmanager.cpp(1213): warning C4267: 'argument' : conversion from 'size_t' to 'int', possible loss of data [c:\work\zip\zip.vcxproj]";
        let [file, line_no, id, msg] = captures(VC_PATTERN, line).unwrap();
        assert_eq!(file, Some(r"c:\work\zip\zipmanager.cpp"));
        assert_eq!(line_no, Some("1213"));
        assert_eq!(id, Some("C4267"));
        assert_eq!(
            msg,
            Some("'argument' : conversion from 'size_t' to 'int', possible loss of data")
        );
    }

    #[test]
    fn vc_pattern_tolerates_angle_brackets_in_message() {
        let line = r"2>src\list.cpp(7): warning C4244: conversion in 'std::vector<int>'";
        let [file, _, id, msg] = captures(VC_PATTERN, line).unwrap();
        assert_eq!(file, Some(r"src\list.cpp"));
        assert_eq!(id, Some("C4244"));
        assert_eq!(msg, Some("conversion in 'std::vector<int>'"));
    }

    #[test]
    fn clang_pattern_requires_flag() {
        let line = "src/main.cpp:12:9: warning: unused variable 'count' [-Wunused-variable]";
        let [file, line_no, id, msg] = captures(CLANG_PATTERN, line).unwrap();
        assert_eq!(file, Some("src/main.cpp"));
        assert_eq!(line_no, Some("12"));
        assert_eq!(id, Some("-Wunused-variable"));
        assert_eq!(msg, Some("unused variable 'count'"));

        assert!(captures(CLANG_PATTERN, "src/main.cpp:12:9: warning: no flag here").is_none());
    }
}
