//! Report discovery from configured paths.
//!
//! Each comma-separated `reportPath` entry is resolved against the base
//! directory. An entry may name a file, a directory or a glob pattern.
//! Directories contribute their own files and the files of their immediate
//! subdirectories, filtered by the dialect's report extension.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DialectConfig;
use crate::errors::IngestError;
use crate::models::report::ReportSource;

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Reports found for one dialect.
#[derive(Debug, Default)]
pub struct Located {
    /// Discovery order: configured entry order, sorted within an entry,
    /// each path at most once.
    pub sources: Vec<ReportSource>,
    /// Entries that resolved to nothing.
    pub missing: Vec<PathBuf>,
}

/// Discover the report files configured for a dialect.
///
/// Returns `IngestError::NotConfigured` when the dialect has no report path
/// at all. Entries that resolve to nothing are logged and listed in
/// `Located::missing`.
pub fn locate(config: &DialectConfig, base_dir: &Path) -> Result<Located, IngestError> {
    if config.report_paths.is_empty() {
        return Err(IngestError::NotConfigured {
            dialect: config.dialect,
        });
    }

    let extension = config.dialect.profile().extension;
    let mut located = Located::default();
    let mut seen = HashSet::new();

    for entry in &config.report_paths {
        let resolved = resolve_entry(base_dir, entry);
        let found = if entry.contains(GLOB_CHARS) {
            expand_glob(&resolved, extension)
        } else if resolved.is_file() {
            vec![resolved.clone()]
        } else if resolved.is_dir() {
            expand_dir(&resolved, extension)
        } else {
            Vec::new()
        };

        if found.is_empty() {
            tracing::warn!(
                dialect = %config.dialect,
                path = %resolved.display(),
                "Report path matched no report files"
            );
            located.missing.push(resolved);
            continue;
        }

        for path in found {
            if seen.insert(path.clone()) {
                located.sources.push(ReportSource::new(path, config));
            }
        }
    }

    tracing::debug!(
        dialect = %config.dialect,
        found = located.sources.len(),
        missing = located.missing.len(),
        "Report discovery finished"
    );

    Ok(located)
}

fn resolve_entry(base_dir: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn expand_glob(pattern: &Path, extension: Option<&str>) -> Vec<PathBuf> {
    let pattern = pattern.to_string_lossy();
    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid report path pattern");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => found.push(path),
            Ok(path) if path.is_dir() => found.extend(expand_dir(&path, extension)),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Unreadable path while expanding pattern"),
        }
    }
    found.sort();
    found
}

/// Files directly in `dir` plus files one level below, sorted.
fn expand_dir(dir: &Path, extension: Option<&str>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for path in list_dir(dir) {
        if path.is_file() {
            if has_extension(&path, extension) {
                found.push(path);
            }
        } else if path.is_dir() {
            found.extend(
                list_dir(&path)
                    .into_iter()
                    .filter(|p| p.is_file() && has_extension(p, extension)),
            );
        }
    }
    found.sort();
    found
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Cannot list report directory");
            Vec::new()
        }
    }
}

fn has_extension(path: &Path, extension: Option<&str>) -> bool {
    match extension {
        None => true,
        Some(wanted) => path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.'))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::dialect::Dialect;

    fn config(dialect: Dialect, paths: &str) -> DialectConfig {
        let settings = Settings::new().with(&format!("{}.reportPath", dialect.key()), paths);
        DialectConfig::resolve(dialect, &settings).unwrap().unwrap()
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn names(located: &Located, base: &Path) -> Vec<String> {
        located
            .sources
            .iter()
            .map(|s| {
                s.path
                    .strip_prefix(base)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn unconfigured_dialect_is_silent_error() {
        let mut config = config(Dialect::Gcc, "build.log");
        config.report_paths.clear();
        let err = locate(&config, Path::new(".")).unwrap_err();
        assert!(err.is_not_configured());
    }

    #[test]
    fn relative_file_resolves_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("logs/build.log"));

        let located = locate(&config(Dialect::Gcc, "logs/build.log"), dir.path()).unwrap();
        assert_eq!(names(&located, dir.path()), vec!["logs/build.log"]);
        assert!(located.missing.is_empty());
    }

    #[test]
    fn missing_entry_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.log"));

        let located = locate(&config(Dialect::Gcc, "a.log, nope.log"), dir.path()).unwrap();
        assert_eq!(located.sources.len(), 1);
        assert_eq!(located.missing, vec![dir.path().join("nope.log")]);
    }

    #[test]
    fn glob_matches_are_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.log"));
        touch(&dir.path().join("a.log"));
        touch(&dir.path().join("c.txt"));

        let located = locate(&config(Dialect::Gcc, "*.log,a.log"), dir.path()).unwrap();
        assert_eq!(names(&located, dir.path()), vec!["a.log", "b.log"]);
    }

    #[test]
    fn scanbuild_directory_expands_session_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        touch(&reports.join("2024-01-02-100000-1-1/report-b.plist"));
        touch(&reports.join("2024-01-02-100000-1-1/report-a.plist"));
        touch(&reports.join("2024-01-02-100000-1-1/index.html"));
        touch(&reports.join("2024-01-01-090000-1-1/report-c.plist"));
        touch(&reports.join("top.plist"));
        touch(&reports.join("deep/nested/ignored.plist"));

        let located = locate(&config(Dialect::Scanbuild, "reports"), dir.path()).unwrap();
        assert_eq!(
            names(&located, dir.path()),
            vec![
                "reports/2024-01-01-090000-1-1/report-c.plist",
                "reports/2024-01-02-100000-1-1/report-a.plist",
                "reports/2024-01-02-100000-1-1/report-b.plist",
                "reports/top.plist",
            ]
        );
    }

    #[test]
    fn line_dialect_directory_takes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("logs/a.log"));
        touch(&dir.path().join("logs/b.htm"));

        let located = locate(&config(Dialect::Vc, "logs"), dir.path()).unwrap();
        assert_eq!(located.sources.len(), 2);
    }

    #[test]
    fn empty_directory_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("reports")).unwrap();

        let located = locate(&config(Dialect::Scanbuild, "reports"), dir.path()).unwrap();
        assert!(located.sources.is_empty());
        assert_eq!(located.missing.len(), 1);
    }

    #[test]
    fn sources_carry_dialect_settings() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.log"));

        let located = locate(&config(Dialect::Clang, "a.log"), dir.path()).unwrap();
        let source = &located.sources[0];
        assert_eq!(source.dialect, Dialect::Clang);
        assert!(source.pattern.is_some());
        assert_eq!(source.charset(), "UTF-8");
    }
}
