//! Models describing a batch run and its per-file outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One image and the text file it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Response text written to the output file
    Success,
    /// Error message written to the output file (or writing itself failed)
    Failed,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Success => write!(f, "success"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: FileStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Characters of extracted text written on success.
    pub chars: usize,

    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub files_found: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub duration_ms: u64,

    /// Set when a shutdown signal stopped the run before every image was done.
    #[serde(default)]
    pub interrupted: bool,

    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new(files_found: usize) -> Self {
        Self {
            started_at: Utc::now(),
            files_found: files_found as u64,
            succeeded: 0,
            failed: 0,
            duration_ms: 0,
            interrupted: false,
            files: Vec::with_capacity(files_found),
        }
    }

    pub fn record(&mut self, file: FileReport) {
        match file.status {
            FileStatus::Success => self.succeeded += 1,
            FileStatus::Failed => self.failed += 1,
        }
        self.files.push(file);
    }

    pub fn processed(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status == FileStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(status: FileStatus) -> FileReport {
        FileReport {
            input: PathBuf::from("images/q1.png"),
            output: PathBuf::from("extracted/q1.txt"),
            status,
            error: (status == FileStatus::Failed).then(|| "boom".to_string()),
            chars: 0,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_record_counts() {
        let mut report = RunReport::new(3);
        report.record(file(FileStatus::Success));
        report.record(file(FileStatus::Failed));
        report.record(file(FileStatus::Success));

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.processed(), 3);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_report_serializes_status_lowercase() {
        let mut report = RunReport::new(1);
        report.record(file(FileStatus::Failed));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["files"][0]["status"], "failed");
        assert_eq!(json["files"][0]["error"], "boom");
    }
}
