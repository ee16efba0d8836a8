#[allow(clippy::module_inception)]
pub mod orchestrator;
pub mod reconcile;
pub mod severity;

pub use orchestrator::{Assessment, Orchestrator, Stage};
pub use reconcile::reconcile;
pub use severity::{score_vitals, VitalsSeverity};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Invalid patient record: non-finite {0}")]
    InvalidRecord(String),
}
