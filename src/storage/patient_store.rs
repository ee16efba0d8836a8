//! One JSON file per assessed patient.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::files::{ArtifactDir, StoredFile};
use super::StorageError;
use crate::models::{ClinicalVerdict, PatientRecord};

/// On-disk shape of a patient file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientFile {
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub patient_data: PatientRecord,
    pub diagnosis: ClinicalVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientListing {
    #[serde(flatten)]
    pub file: StoredFile,
    pub diagnosis: String,
}

pub struct PatientStore {
    files: ArtifactDir,
}

impl PatientStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self {
            files: ArtifactDir::new(dir, "patient", "json")?,
        })
    }

    pub fn dir(&self) -> &std::path::Path {
        self.files.dir()
    }

    /// Persist one assessment. Returns the patient id (the file stem).
    pub fn save(
        &self,
        record: &PatientRecord,
        verdict: &ClinicalVerdict,
    ) -> Result<String, StorageError> {
        let filename = self.files.write_new_with(record.created_at, |filename| {
            let file = PatientFile {
                patient_id: patient_id_of(filename).to_string(),
                timestamp: record.created_at,
                patient_data: record.clone(),
                diagnosis: verdict.clone(),
            };
            Ok(serde_json::to_vec_pretty(&file)?)
        })?;
        let patient_id = patient_id_of(&filename).to_string();
        tracing::info!(patient_id = %patient_id, "Patient data saved");
        Ok(patient_id)
    }

    pub fn load(&self, filename: &str) -> Result<PatientFile, StorageError> {
        let bytes = self.files.read(filename)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Newest first. Unreadable files are listed with diagnosis `Unknown`.
    pub fn list(&self, limit: usize) -> Result<Vec<PatientListing>, StorageError> {
        Ok(self
            .files
            .list(limit)?
            .into_iter()
            .map(|file| {
                let diagnosis = match self.load(&file.filename) {
                    Ok(stored) => stored.diagnosis.primary_diagnosis,
                    Err(e) => {
                        tracing::warn!(
                            file = %file.filename,
                            error = %e,
                            "Unreadable patient file"
                        );
                        "Unknown".to_string()
                    }
                };
                PatientListing { file, diagnosis }
            })
            .collect())
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

fn patient_id_of(filename: &str) -> &str {
    filename.strip_suffix(".json").unwrap_or(filename)
}
