//! Ingestion configuration resolved from dotted property keys.
//!
//! Properties come from a `Settings` map, filled either from the process
//! environment (`CXX_`-prefixed variables) or programmatically. Every
//! per-dialect value falls back to the dialect's default when it is unset
//! or empty. Patterns and charsets are validated here, once, so parsers
//! never see an unusable configuration.

pub mod pattern;

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};

use crate::errors::ConfigError;
use crate::models::dialect::{Dialect, ParserKind};

pub use pattern::{GroupLayout, ReportPattern};

pub const REPORT_PATH_SUFFIX: &str = "reportPath";
pub const REGEX_SUFFIX: &str = "regex";
pub const CHARSET_SUFFIX: &str = "charset";
pub const BASE_DIR_KEY: &str = "baseDir";
pub const PARALLEL_KEY: &str = "parallel";
pub const KNOWN_RULES_KEY: &str = "knownRules";

const ENV_PREFIX: &str = "CXX_";

/// Raw property values keyed by dotted property name.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every known property from its `CXX_` environment variable.
    pub fn from_env() -> Self {
        let mut settings = Self::new();
        for key in known_keys() {
            if let Ok(value) = env::var(env_var_name(&key)) {
                settings.set(&key, value);
            }
        }
        settings
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Value of `key`, or `None` when unset or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value of `key`, or `default` when unset or blank.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "1" | "yes" | "on")
        )
    }
}

/// Property key for a dialect setting, e.g. `compiler.gcc.reportPath`.
pub fn dialect_key(dialect: Dialect, suffix: &str) -> String {
    format!("{}.{}", dialect.key(), suffix)
}

/// Every property key the resolver reads.
pub fn known_keys() -> Vec<String> {
    let mut keys = vec![
        BASE_DIR_KEY.to_string(),
        PARALLEL_KEY.to_string(),
        KNOWN_RULES_KEY.to_string(),
    ];
    for dialect in Dialect::ALL {
        for suffix in [REPORT_PATH_SUFFIX, REGEX_SUFFIX, CHARSET_SUFFIX] {
            keys.push(dialect_key(dialect, suffix));
        }
    }
    keys
}

/// Environment variable carrying a property.
///
/// `compiler.gcc.reportPath` becomes `CXX_COMPILER_GCC_REPORT_PATH`.
pub fn env_var_name(key: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '.' || c == '-' {
            name.push('_');
            prev_lower = false;
        } else if c.is_ascii_uppercase() && prev_lower {
            name.push('_');
            name.push(c);
            prev_lower = false;
        } else {
            name.push(c.to_ascii_uppercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    name
}

/// Look up an `encoding_rs` encoding by WHATWG label.
pub fn resolve_charset(key: &str, label: &str) -> Result<&'static Encoding, ConfigError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| ConfigError::UnknownCharset {
        key: key.to_string(),
        label: label.to_string(),
    })
}

/// Fully resolved settings for one dialect.
#[derive(Debug, Clone)]
pub struct DialectConfig {
    pub dialect: Dialect,
    /// Comma-separated entries of `reportPath`, in configured order.
    pub report_paths: Vec<String>,
    /// Present for line dialects only.
    pub pattern: Option<ReportPattern>,
    pub encoding: &'static Encoding,
    pub repository: String,
    pub metric_key: String,
}

impl DialectConfig {
    /// Resolve one dialect. `Ok(None)` means no report path is configured.
    pub fn resolve(dialect: Dialect, settings: &Settings) -> Result<Option<Self>, ConfigError> {
        let profile = dialect.profile();

        let Some(paths) = settings.get(&dialect_key(dialect, REPORT_PATH_SUFFIX)) else {
            return Ok(None);
        };
        let report_paths: Vec<String> = paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if report_paths.is_empty() {
            return Ok(None);
        }

        let charset_key = dialect_key(dialect, CHARSET_SUFFIX);
        let encoding = match profile.kind {
            ParserKind::Line => resolve_charset(
                &charset_key,
                settings.get_or(&charset_key, profile.default_charset),
            )?,
            ParserKind::Tree => {
                if let Some(label) = settings.get(&charset_key) {
                    tracing::debug!(key = %charset_key, label, "Charset ignored for structured reports");
                }
                UTF_8
            }
        };

        let pattern = match (profile.kind, profile.default_pattern) {
            (ParserKind::Line, Some(default)) => {
                let regex_key = dialect_key(dialect, REGEX_SUFFIX);
                let source = settings.get_or(&regex_key, default);
                Some(ReportPattern::compile(&regex_key, source)?)
            }
            _ => None,
        };

        Ok(Some(Self {
            dialect,
            report_paths,
            pattern,
            encoding,
            repository: profile.repository.to_string(),
            metric_key: profile.metric_key.to_string(),
        }))
    }

    pub fn charset(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Resolved configuration for a whole ingestion.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub base_dir: PathBuf,
    pub parallel: bool,
    /// Configured dialects only, in `Dialect::ALL` order.
    pub dialects: Vec<DialectConfig>,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&Settings::from_env())
    }

    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let current_dir = || {
            env::current_dir().map_err(|e| ConfigError::InvalidBaseDir {
                path: PathBuf::from("."),
                reason: e.to_string(),
            })
        };
        let base_dir = match settings.get(BASE_DIR_KEY) {
            Some(dir) => {
                let path = PathBuf::from(dir);
                let path = if path.is_absolute() {
                    path
                } else {
                    current_dir()?.join(path)
                };
                if !path.is_dir() {
                    return Err(ConfigError::InvalidBaseDir {
                        path,
                        reason: "not a directory".to_string(),
                    });
                }
                path
            }
            None => current_dir()?,
        };

        let mut dialects = Vec::new();
        for dialect in Dialect::ALL {
            if let Some(config) = DialectConfig::resolve(dialect, settings)? {
                dialects.push(config);
            }
        }

        Ok(Self {
            base_dir,
            parallel: settings.get_bool(PARALLEL_KEY),
            dialects,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
