//! File-backed persistence for assessments and reports, plus the in-memory
//! recent-history ring.

pub mod files;
pub mod history;
pub mod patient_store;
pub mod report_store;

pub use files::StoredFile;
pub use history::HistoryLog;
pub use patient_store::{PatientFile, PatientListing, PatientStore};
pub use report_store::ReportStore;

/// Listing cap for both stores.
pub const LIST_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file pattern: {0}")]
    Pattern(String),
}
