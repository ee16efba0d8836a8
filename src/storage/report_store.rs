//! Rendered PDF reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::files::{ArtifactDir, StoredFile};
use super::StorageError;

pub struct ReportStore {
    files: ArtifactDir,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self {
            files: ArtifactDir::new(dir, "report", "pdf")?,
        })
    }

    pub fn dir(&self) -> &Path {
        self.files.dir()
    }

    /// Returns the new report's file name.
    pub fn save(&self, pdf: &[u8], at: DateTime<Utc>) -> Result<String, StorageError> {
        let filename = self.files.write_new(at, pdf)?;
        tracing::info!(file = %filename, bytes = pdf.len(), "PDF report saved");
        Ok(filename)
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        self.files.read(filename)
    }

    pub fn list(&self, limit: usize) -> Result<Vec<StoredFile>, StorageError> {
        self.files.list(limit)
    }

    pub fn count(&self) -> usize {
        self.files.count()
    }

    pub fn delete(&self, filename: &str) -> Result<(), StorageError> {
        self.files.delete(filename)
    }

    pub fn enforce_retention(&self, keep: usize) -> Result<usize, StorageError> {
        self.files.enforce_retention(keep)
    }
}

pub fn download_url(filename: &str) -> String {
    format!("/download/{filename}")
}
