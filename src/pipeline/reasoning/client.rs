//! Reasoning Client: one reviewed judgment per request, or a reason why not.

use std::sync::Arc;
use std::time::Duration;

use super::parser::parse_review;
use super::prompt::{build_review_prompt, REVIEW_SYSTEM_PROMPT};
use super::types::{LlmClient, ReasoningOutcome};
use crate::models::PatientRecord;
use crate::pipeline::classifier::ClassifierOutput;
use crate::pipeline::features::FeatureVector;

pub const DEFAULT_REASONING_TIMEOUT_SECS: u64 = 15;

/// Pick the first available model matching a preference, in preference
/// order. Falls back to the first available model.
pub fn select_model(available: &[String], preferences: &[String]) -> Option<String> {
    preferences
        .iter()
        .find_map(|pref| available.iter().find(|m| m.contains(pref.as_str())))
        .or_else(|| available.first())
        .cloned()
}

pub struct ReasoningClient {
    llm: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl ReasoningClient {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            llm,
            model: model.into(),
            timeout,
        }
    }

    /// Resolve the model against what the backend advertises. When the
    /// listing fails the first preference is used as-is.
    pub fn with_preferred_model(
        llm: Arc<dyn LlmClient>,
        preferences: &[String],
        timeout: Duration,
    ) -> Option<Self> {
        let model = match llm.list_models() {
            Ok(available) => select_model(&available, preferences),
            Err(e) => {
                tracing::warn!(
                    backend = llm.backend(),
                    error = %e,
                    "Cannot list models, using first preference"
                );
                preferences.first().cloned()
            }
        }?;
        tracing::info!(backend = llm.backend(), model = %model, "Reasoning model selected");
        Some(Self::new(llm, model, timeout))
    }

    pub fn backend(&self) -> &'static str {
        self.llm.backend()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Deadline the orchestrator should enforce around [`Self::review`].
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One call, no retry. Every failure becomes `Unavailable`.
    pub fn review(
        &self,
        record: &PatientRecord,
        features: &FeatureVector,
        classifier: &ClassifierOutput,
    ) -> ReasoningOutcome {
        let prompt = build_review_prompt(record, features, classifier);
        let started = std::time::Instant::now();

        let result = self
            .llm
            .generate(&self.model, &prompt, REVIEW_SYSTEM_PROMPT)
            .and_then(|reply| parse_review(&reply));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(output) => {
                tracing::info!(
                    backend = self.backend(),
                    model = %self.model,
                    elapsed_ms,
                    severity = %output.severity,
                    "Reasoning review complete"
                );
                ReasoningOutcome::Reviewed(output)
            }
            Err(e) => {
                let reason = e.reason();
                tracing::warn!(
                    backend = self.backend(),
                    model = %self.model,
                    elapsed_ms,
                    reason = %reason,
                    error = %e,
                    "Reasoning unavailable"
                );
                ReasoningOutcome::Unavailable(reason)
            }
        }
    }
}
