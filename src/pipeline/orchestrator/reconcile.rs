//! Pure merge of classifier output, optional reasoning output and vitals
//! severity into one verdict.
//!
//! The reasoning service's severity and urgency are authoritative unless
//! enough critical vitals disagree upward. Reconciliation may raise
//! severity, never lower it.

use super::severity::{score_in_band, VitalsSeverity};
use crate::clinical_config::{ClinicalConfig, RecommendationTable, SeverityRules};
use crate::models::{ClinicalVerdict, Provenance, Severity, TreatmentPlan, Urgency};
use crate::pipeline::classifier::ClassifierOutput;
use crate::pipeline::features::ClinicalFlags;
use crate::pipeline::reasoning::ReasoningOutput;

/// Classifier alternatives at or above this probability are listed as
/// differentials when no reasoning output supplies them.
const DIFFERENTIAL_MIN_PROBABILITY: f64 = 0.10;

pub fn reconcile(
    classifier: &ClassifierOutput,
    reasoning: Option<&ReasoningOutput>,
    flags: &ClinicalFlags,
    vitals: &VitalsSeverity,
    config: &ClinicalConfig,
) -> ClinicalVerdict {
    match reasoning {
        None => model_only(classifier, flags, vitals, &config.recommendations),
        Some(review) => with_review(classifier, review, flags, vitals, &config.severity),
    }
}

fn model_only(
    classifier: &ClassifierOutput,
    flags: &ClinicalFlags,
    vitals: &VitalsSeverity,
    table: &RecommendationTable,
) -> ClinicalVerdict {
    let severity = vitals.severity;
    ClinicalVerdict {
        primary_diagnosis: classifier.primary_label.clone(),
        model_diagnosis: classifier.primary_label.clone(),
        model_probability: classifier.primary_probability,
        confidence_level: classifier.confidence,
        severity,
        severity_score: score_in_band(vitals.score, severity),
        urgency: severity.default_urgency(),
        reasoning: summary(classifier, vitals),
        treatment_plan: recommended_plan(&classifier.primary_label, severity, flags, table),
        differentials: classifier_differentials(classifier),
        red_flags: vitals.critical_findings(),
        risk_factors: vitals.findings(),
        patient_explanation: None,
        ml_validation: None,
        certainty: None,
        override_reason: None,
        provenance: Provenance::ModelOnly,
        escalated: false,
        report_file: None,
    }
}

fn with_review(
    classifier: &ClassifierOutput,
    review: &ReasoningOutput,
    flags: &ClinicalFlags,
    vitals: &VitalsSeverity,
    rules: &SeverityRules,
) -> ClinicalVerdict {
    let (severity, urgency, escalated) =
        escalate(review.severity, review.urgency, flags, vitals, rules);
    if escalated {
        tracing::info!(
            reviewed = %review.severity,
            vitals = %vitals.severity,
            critical_flags = flags.critical_count(),
            "Severity escalated by vitals"
        );
    }

    let primary_diagnosis = review
        .diagnosis
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| classifier.primary_label.clone());

    let differentials = if review.differentials.is_empty() {
        classifier_differentials(classifier)
    } else {
        review.differentials.clone()
    };
    let mut red_flags = vitals.critical_findings();
    push_unique(&mut red_flags, &review.red_flags);

    ClinicalVerdict {
        primary_diagnosis,
        model_diagnosis: classifier.primary_label.clone(),
        model_probability: classifier.primary_probability,
        confidence_level: classifier.confidence,
        severity,
        severity_score: score_in_band(vitals.score, severity),
        urgency,
        reasoning: review.clinical_reasoning.clone(),
        treatment_plan: review.treatment_plan.clone(),
        differentials,
        red_flags,
        risk_factors: vitals.findings(),
        patient_explanation: review.patient_explanation.clone(),
        ml_validation: review.ml_validation,
        certainty: review.certainty,
        override_reason: review.override_reason.clone(),
        provenance: Provenance::ModelWithReasoning,
        escalated,
        report_file: None,
    }
}

/// Apply the escalation rule. Returns `(severity, urgency, escalated)`.
///
/// Urgency never falls below what the final severity implies, so a
/// `critical` review paired with `routine` urgency comes out `emergency`.
pub fn escalate(
    reviewed_severity: Severity,
    reviewed_urgency: Urgency,
    flags: &ClinicalFlags,
    vitals: &VitalsSeverity,
    rules: &SeverityRules,
) -> (Severity, Urgency, bool) {
    let escalated = flags.critical_count() >= rules.escalation_min_flags
        && vitals.severity > reviewed_severity;
    let severity = if escalated {
        vitals.severity.max(reviewed_severity)
    } else {
        reviewed_severity
    };
    let urgency = reviewed_urgency.max(severity.default_urgency());
    (severity, urgency, escalated)
}

/// Rule-based plan for a verdict nobody reviewed: tests for the label and
/// the abnormal vitals, then care scaled to severity.
fn recommended_plan(
    label: &str,
    severity: Severity,
    flags: &ClinicalFlags,
    table: &RecommendationTable,
) -> TreatmentPlan {
    let for_label = table.for_label(label);

    let mut tests = table.baseline_tests.clone();
    if let Some(r) = for_label {
        push_unique(&mut tests, &r.tests);
    }
    if flags.severe_hypoxia {
        push_unique(&mut tests, std::slice::from_ref(&table.severe_hypoxia_test));
    }
    if flags.hypotension {
        push_unique(&mut tests, std::slice::from_ref(&table.hypotension_test));
    }

    let mut plan = TreatmentPlan::new();
    if severity >= table.escalated_care_from {
        plan.insert("immediate_interventions", table.escalated_care.join("; "));
    }
    plan.insert("diagnostic_tests", tests.join("; "));
    if let Some(r) = for_label.filter(|r| !r.treatments.is_empty()) {
        plan.insert("treatment", r.treatments.join("; "));
    }
    plan.insert("monitoring", table.supportive_care.join("; "));
    plan
}

/// Append items not already present, ignoring case and surrounding space.
fn push_unique(into: &mut Vec<String>, items: &[String]) {
    for item in items {
        let key = item.trim();
        if !into.iter().any(|existing| existing.trim().eq_ignore_ascii_case(key)) {
            into.push(key.to_string());
        }
    }
}

fn classifier_differentials(classifier: &ClassifierOutput) -> Vec<String> {
    classifier
        .alternatives(DIFFERENTIAL_MIN_PROBABILITY)
        .into_iter()
        .map(|lp| format!("{} ({:.1}%)", lp.label, lp.probability * 100.0))
        .collect()
}

/// Deterministic stand-in for the reasoning text on classifier-only verdicts.
fn summary(classifier: &ClassifierOutput, vitals: &VitalsSeverity) -> String {
    let findings = vitals.findings();
    let findings = if findings.is_empty() {
        "no abnormal vital signs".to_string()
    } else {
        findings.join("; ")
    };
    format!(
        "Classifier-only assessment: {} ({:.1}% probability, {} confidence). \
         Vitals severity score {:.1}/10 ({}) based on {}. \
         Clinical review by the reasoning service was not available.",
        classifier.primary_label,
        classifier.primary_probability * 100.0,
        classifier.confidence,
        vitals.score,
        vitals.severity,
        findings,
    )
}
