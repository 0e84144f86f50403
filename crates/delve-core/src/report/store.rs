use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::config::{OutputConfig, MAX_REPORT_NAME_CHARS};

/// Errors that can occur while reading or writing reports.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No previous report found in {0}")]
    NoReports(PathBuf),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// File-based report storage.
///
/// ```text
/// research_reports/
///   Rust_async_runtimes_20250101_093000.md
///   Rust_async_runtimes_20250102_141500.md
/// ```
pub struct ReportStore {
    directory: PathBuf,
}

impl ReportStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.directory)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes `report` under a timestamped name derived from `topic`.
    pub fn save(&self, topic: &str, report: &str) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.directory).map_err(|e| StorageError::io(&self.directory, e))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self
            .directory
            .join(format!("{}_{}.md", sanitize_topic(topic), timestamp));

        fs::write(&path, report).map_err(|e| StorageError::io(&path, e))?;
        info!(path = %path.display(), "saved report");
        Ok(path)
    }

    /// Reads a saved report.
    pub fn read(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| StorageError::io(path, e))
    }

    /// Topic of a saved report: from its filename, else from its `# ` title.
    pub fn topic_of(&self, path: &Path) -> Result<Option<String>, StorageError> {
        if let Some(topic) = infer_topic(path) {
            return Ok(Some(topic));
        }
        let report = self.read(path)?;
        Ok(report
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }

    /// The most recently modified `.md` report, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>, StorageError> {
        if !self.directory.exists() {
            return Ok(None);
        }

        let entries = fs::read_dir(&self.directory).map_err(|e| StorageError::io(&self.directory, e))?;

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.directory, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| StorageError::io(&path, e))?;
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }

        Ok(newest.map(|(_, path)| path))
    }

    /// Like [`latest`](Self::latest), but a missing report is an error.
    pub fn require_latest(&self) -> Result<PathBuf, StorageError> {
        self.latest()?
            .ok_or_else(|| StorageError::NoReports(self.directory.clone()))
    }
}

/// Filename-safe form of a topic.
///
/// Drops everything except word characters, whitespace and `-`, turns each
/// run of whitespace or `-` into one `_`, and keeps at most
/// [`MAX_REPORT_NAME_CHARS`] characters.
pub fn sanitize_topic(topic: &str) -> String {
    let mut out = String::with_capacity(topic.len());
    let mut in_gap = false;

    for c in topic.chars() {
        if c.is_whitespace() || c == '-' {
            if !in_gap {
                out.push('_');
                in_gap = true;
            }
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
            in_gap = false;
        }
    }

    out.chars().take(MAX_REPORT_NAME_CHARS).collect()
}

/// Recovers a topic from a report filename by dropping the `_<date>_<time>`
/// suffix.
pub fn infer_topic(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplitn(3, '_');
    let _time = parts.next()?;
    let _date = parts.next()?;
    let topic = parts.next()?.replace('_', " ");
    let topic = topic.trim();
    (!topic.is_empty()).then(|| topic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_topic() {
        assert_eq!(sanitize_topic("Rust: async -- runtimes?"), "Rust_async_runtimes");
        assert_eq!(sanitize_topic("  leading"), "_leading");
        assert_eq!(sanitize_topic("café & crème"), "café_crème");
    }

    #[test]
    fn test_sanitize_topic_truncates() {
        let long = "a".repeat(150);
        assert_eq!(sanitize_topic(&long).chars().count(), 100);
    }

    #[test]
    fn test_infer_topic() {
        let path = Path::new("reports/Rust_async_runtimes_20250101_093000.md");
        assert_eq!(infer_topic(path).as_deref(), Some("Rust async runtimes"));
        assert_eq!(infer_topic(Path::new("20250101_093000.md")), None);
        assert_eq!(infer_topic(Path::new("notes.md")), None);
    }
}
