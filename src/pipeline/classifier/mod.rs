pub mod adapter;
pub mod forest;

pub use adapter::{ClassifierAdapter, ClassifierOutput, ClassifierStatus, LabelProbability};
pub use forest::Forest;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Cannot read model artifact {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Model artifact is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported model format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Model labels {found:?} do not match taxonomy {expected:?}")]
    LabelMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model references unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Model contains no trees")]
    EmptyForest,

    #[error("Tree {0} has no nodes")]
    EmptyTree(usize),

    #[error("Tree {tree}, node {node}: {detail}")]
    InvalidNode {
        tree: usize,
        node: usize,
        detail: String,
    },
}
