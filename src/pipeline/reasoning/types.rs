use serde::Serialize;

use crate::models::{MlValidation, Severity, TreatmentPlan, Urgency};

/// Structured judgment returned by the reasoning service. Either fully
/// populated or not produced at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningOutput {
    /// Present only when the service explicitly named a diagnosis.
    pub diagnosis: Option<String>,
    pub severity: Severity,
    pub urgency: Urgency,
    pub red_flags: Vec<String>,
    pub clinical_reasoning: String,
    pub differentials: Vec<String>,
    pub treatment_plan: TreatmentPlan,
    pub patient_explanation: Option<String>,
    /// Optional agreement fields. A bad value is dropped, never fatal.
    pub ml_validation: Option<MlValidation>,
    pub certainty: Option<f64>,
    pub override_reason: Option<String>,
}

/// Why no reasoning output was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    NotConfigured,
    Timeout,
    Connection,
    Authentication,
    QuotaExhausted,
    ServiceError { status: u16 },
    MalformedResponse,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServiceError { .. } => "service_error",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceError { status } => write!(f, "service_error ({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Result of one review attempt. Absence is a normal state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningOutcome {
    Reviewed(ReasoningOutput),
    Unavailable(UnavailableReason),
}

impl ReasoningOutcome {
    pub fn output(&self) -> Option<&ReasoningOutput> {
        match self {
            Self::Reviewed(output) => Some(output),
            Self::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("Reasoning backend not configured")]
    NotConfigured,

    #[error("Cannot connect to reasoning service at {0}")]
    Connection(String),

    #[error("Reasoning request timed out after {0}s")]
    Timeout(u64),

    #[error("Reasoning service rejected credentials (HTTP {0})")]
    Authentication(u16),

    #[error("Reasoning service quota exhausted")]
    QuotaExhausted,

    #[error("Reasoning service error (HTTP {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Failed to parse service envelope: {0}")]
    ResponseParsing(String),

    #[error("Malformed reasoning reply: {0}")]
    MalformedResponse(String),
}

impl ReasoningError {
    /// Map an HTTP status that is not a success.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(status),
            429 => Self::QuotaExhausted,
            _ => Self::ServiceError { status, body },
        }
    }

    pub fn reason(&self) -> UnavailableReason {
        match self {
            Self::NotConfigured => UnavailableReason::NotConfigured,
            Self::Connection(_) | Self::HttpClient(_) => UnavailableReason::Connection,
            Self::Timeout(_) => UnavailableReason::Timeout,
            Self::Authentication(_) => UnavailableReason::Authentication,
            Self::QuotaExhausted => UnavailableReason::QuotaExhausted,
            Self::ServiceError { status, .. } => {
                UnavailableReason::ServiceError { status: *status }
            }
            Self::ResponseParsing(_) | Self::MalformedResponse(_) => {
                UnavailableReason::MalformedResponse
            }
        }
    }
}

/// LLM client abstraction (allows mocking).
pub trait LlmClient: Send + Sync {
    /// Backend name for logs and the status endpoint.
    fn backend(&self) -> &'static str;

    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, ReasoningError>;

    fn list_models(&self) -> Result<Vec<String>, ReasoningError>;

    fn is_model_available(&self, model: &str) -> Result<bool, ReasoningError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.contains(model)))
    }
}
