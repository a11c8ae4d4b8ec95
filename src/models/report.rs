//! A single discovered report file and how to read it.

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::config::{DialectConfig, ReportPattern};
use crate::models::dialect::Dialect;

/// One report file to parse. Created by the locator from resolved
/// configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReportSource {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub encoding: &'static Encoding,
    /// Present for line dialects only.
    pub pattern: Option<ReportPattern>,
}

impl ReportSource {
    pub fn new(path: PathBuf, config: &DialectConfig) -> Self {
        Self {
            path,
            dialect: config.dialect,
            encoding: config.encoding,
            pattern: config.pattern.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn charset(&self) -> &'static str {
        self.encoding.name()
    }
}
