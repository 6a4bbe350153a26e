use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::classifier::ClassificationMethod;
use crate::error::{BatchError, Result};

/// What happened to one candidate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Output already existed; nothing was run
    Skipped,
    /// Transcode succeeded (contact sheet and post-action were attempted)
    Transcoded,
    /// Probe, transcode, contact sheet or post-action failed
    Failed,
}

/// Per-file record of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub status: OutcomeStatus,
    /// Error message or note about a non-fatal problem
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// All outcomes of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub root: PathBuf,
    pub method: ClassificationMethod,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(root: &Path, method: ClassificationMethod) -> Self {
        Self {
            root: root.to_path_buf(),
            method,
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn transcoded(&self) -> usize {
        self.count(OutcomeStatus::Transcoded)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BatchError::io(path, std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(|e| BatchError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, status: OutcomeStatus) -> FileOutcome {
        let now = Utc::now();
        FileOutcome {
            source: PathBuf::from(name),
            output: None,
            status,
            detail: None,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_counts() {
        let mut report = BatchReport::new(Path::new("/videos"), ClassificationMethod::Fast);
        report.outcomes.push(outcome("a.mp4", OutcomeStatus::Transcoded));
        report.outcomes.push(outcome("b.mp4", OutcomeStatus::Skipped));
        report.outcomes.push(outcome("c.mp4", OutcomeStatus::Skipped));
        report.outcomes.push(outcome("d.mp4", OutcomeStatus::Failed));

        assert_eq!(report.transcoded(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[3].is_failed());
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = BatchReport::new(Path::new("/videos"), ClassificationMethod::SemiAccurate);
        report.outcomes.push(outcome("a.mp4", OutcomeStatus::Failed));
        report.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["method"], "semi-accurate");
        assert_eq!(value["outcomes"][0]["status"], "failed");
        assert_eq!(value["outcomes"][0]["source"], "a.mp4");
    }
}
