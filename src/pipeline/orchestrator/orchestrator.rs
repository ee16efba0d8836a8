//! Hybrid Orchestrator: featurize → classify → review → reconcile.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use super::reconcile::reconcile;
use super::severity::{score_vitals, VitalsSeverity};
use super::OrchestratorError;
use crate::clinical_config::ClinicalConfig;
use crate::models::{ClinicalVerdict, PatientRecord};
use crate::pipeline::classifier::{ClassifierAdapter, ClassifierError, ClassifierOutput};
use crate::pipeline::features::{derive, FeatureVector};
use crate::pipeline::reasoning::{ReasoningClient, ReasoningOutcome, UnavailableReason};

/// States visited by one assessment, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Featurize,
    Classify,
    ReasoningAttempted,
    ReasoningSkipped,
    Reconciled,
    Done,
}

/// Everything one run produced. The verdict is the authoritative part; the
/// rest is kept for logging and the report.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub request_id: Uuid,
    pub features: FeatureVector,
    pub classifier: ClassifierOutput,
    pub vitals: VitalsSeverity,
    pub reasoning: ReasoningOutcome,
    pub verdict: ClinicalVerdict,
    pub stages: Vec<Stage>,
    pub elapsed_ms: u64,
}

pub struct Orchestrator {
    config: Arc<ClinicalConfig>,
    classifier: Arc<ClassifierAdapter>,
    reasoning: Option<Arc<ReasoningClient>>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<ClinicalConfig>,
        classifier: Arc<ClassifierAdapter>,
        reasoning: Option<Arc<ReasoningClient>>,
    ) -> Self {
        Self {
            config,
            classifier,
            reasoning,
        }
    }

    pub fn classifier(&self) -> &ClassifierAdapter {
        &self.classifier
    }

    pub fn reasoning(&self) -> Option<&ReasoningClient> {
        self.reasoning.as_deref()
    }

    pub fn config(&self) -> &ClinicalConfig {
        &self.config
    }

    /// Run the full pipeline for one record. Blocking: call from a
    /// blocking context.
    pub fn assess(&self, record: &PatientRecord) -> Result<Assessment, OrchestratorError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("assess", request_id = %request_id);
        let _guard = span.enter();
        let started = Instant::now();
        let mut stages = vec![Stage::Start];

        let invalid = record.non_finite_fields();
        if !invalid.is_empty() {
            tracing::warn!(fields = ?invalid, "Rejecting record with non-finite values");
            return Err(OrchestratorError::InvalidRecord(invalid.join(", ")));
        }

        stages.push(Stage::Featurize);
        let features = derive(record, &self.config.thresholds);

        stages.push(Stage::Classify);
        let classifier = self.classifier.classify(&features).map_err(|e| match e {
            ClassifierError::Unavailable(reason) => {
                OrchestratorError::ClassifierUnavailable(reason)
            }
            other => OrchestratorError::ClassifierUnavailable(other.to_string()),
        })?;
        tracing::info!(
            primary = %classifier.primary_label,
            probability = classifier.primary_probability,
            confidence = %classifier.confidence,
            "Classified"
        );

        let reasoning = match &self.reasoning {
            Some(client) => {
                stages.push(Stage::ReasoningAttempted);
                review_with_deadline(client, record, &features, &classifier)
            }
            None => ReasoningOutcome::Unavailable(UnavailableReason::NotConfigured),
        };
        if let ReasoningOutcome::Unavailable(reason) = &reasoning {
            tracing::info!(reason = %reason, "Reasoning skipped");
            stages.push(Stage::ReasoningSkipped);
        }

        let flags = *features.flags();
        let vitals = score_vitals(record, &flags, &self.config.severity);
        let verdict = reconcile(&classifier, reasoning.output(), &flags, &vitals, &self.config);
        stages.push(Stage::Reconciled);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            diagnosis = %verdict.primary_diagnosis,
            severity = %verdict.severity,
            urgency = %verdict.urgency,
            source = %verdict.provenance,
            escalated = verdict.escalated,
            elapsed_ms,
            "Assessment complete"
        );
        stages.push(Stage::Done);

        Ok(Assessment {
            request_id,
            features,
            classifier,
            vitals,
            reasoning,
            verdict,
            stages,
            elapsed_ms,
        })
    }
}

/// Run the review on a worker thread and stop waiting at the client's
/// deadline. A late worker finishes into a dropped channel and writes
/// nothing.
fn review_with_deadline(
    client: &Arc<ReasoningClient>,
    record: &PatientRecord,
    features: &FeatureVector,
    classifier: &ClassifierOutput,
) -> ReasoningOutcome {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(client);
    let record = record.clone();
    let features = features.clone();
    let classifier = classifier.clone();

    let spawned = std::thread::Builder::new()
        .name("reasoning-review".into())
        .spawn(move || {
            let outcome = worker.review(&record, &features, &classifier);
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Cannot spawn reasoning worker");
        return ReasoningOutcome::Unavailable(UnavailableReason::Connection);
    }

    match rx.recv_timeout(client.timeout()) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(
                timeout_ms = client.timeout().as_millis() as u64,
                "Reasoning deadline exceeded"
            );
            ReasoningOutcome::Unavailable(UnavailableReason::Timeout)
        }
        Err(RecvTimeoutError::Disconnected) => {
            tracing::error!("Reasoning worker exited without a result");
            ReasoningOutcome::Unavailable(UnavailableReason::MalformedResponse)
        }
    }
}
