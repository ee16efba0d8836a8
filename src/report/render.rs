//! Report Renderer: verdict + record → report sections.
//!
//! Pure. The only timestamp in a bundle is the record's own `created_at`,
//! so rendering the same inputs twice yields identical bundles.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    ClinicalVerdict, ConfidenceLevel, MlValidation, PatientRecord, Provenance, Severity, Urgency,
};

pub const REPORT_TITLE: &str = "MediPatient Clinical Assessment Report";

pub const DISCLAIMER: &str = "This report was generated by an automated decision-support system. \
     It is not a diagnosis. A qualified clinician must review every finding before acting on it.";

pub const PLAN_FALLBACK: &str = "No treatment plan was produced by the reasoning service. \
     Manage according to local protocols and clinical judgement.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisSummary {
    pub primary_diagnosis: String,
    pub model_diagnosis: String,
    pub model_probability: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    pub severity_score: f64,
    pub urgency: Urgency,
    pub source: Provenance,
    pub escalated: bool,
    /// Present only when the reasoning service judged the classifier.
    pub ml_validation: Option<MlValidation>,
    pub certainty: Option<f64>,
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoapNote {
    pub subjective: Vec<String>,
    pub objective: Vec<String>,
    pub assessment: Vec<String>,
    pub plan: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentItem {
    pub aspect: String,
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientSummary {
    pub age: f64,
    pub gender: String,
    pub symptoms: Vec<String>,
    pub medical_history: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    pub severity: Severity,
    pub severity_score: f64,
    pub risk_factors: Vec<String>,
    pub red_flags: Vec<String>,
    pub differentials: Vec<String>,
    /// One line on whether the reasoning service agreed with the classifier.
    pub model_agreement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBundle {
    pub title: String,
    pub assessed_at: DateTime<Utc>,
    pub diagnosis_summary: DiagnosisSummary,
    pub soap_note: SoapNote,
    pub treatment_plan: Vec<TreatmentItem>,
    pub patient_summary: PatientSummary,
    pub risk_analysis: RiskAnalysis,
    pub clinical_reasoning: String,
    pub disclaimer: String,
}

/// `immediate_interventions` → `Immediate interventions`.
pub fn aspect_label(aspect: &str) -> String {
    let spaced = aspect.replace(|c: char| c == '_' || c == '-', " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn urgency_advice(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Routine => "Arrange a routine appointment with your doctor.",
        Urgency::Urgent => "Please see a doctor today.",
        Urgency::Emergency => "Seek emergency care immediately.",
    }
}

/// `Reasoning service rated the classifier label Incorrect (certainty 80%): ...`
fn model_agreement(verdict: &ClinicalVerdict) -> Option<String> {
    let validation = verdict.ml_validation?;
    let mut line = format!(
        "Reasoning service rated the classifier label {} as {validation}",
        verdict.model_diagnosis
    );
    if let Some(certainty) = verdict.certainty {
        line.push_str(&format!(" (certainty {:.0}%)", certainty * 100.0));
    }
    if let Some(reason) = &verdict.override_reason {
        line.push_str(&format!(": {reason}"));
    }
    Some(line)
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none reported".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render(verdict: &ClinicalVerdict, record: &PatientRecord) -> ReportBundle {
    let v = &record.vitals;
    let symptoms = record.symptom_descriptions();

    let subjective = vec![
        format!("Presenting symptoms: {}", list_or_none(&symptoms)),
        format!("Pain score: {}/10", record.pain_score),
        format!("Medical history: {}", list_or_none(&record.medical_history)),
        format!("Current medications: {}", list_or_none(&record.medications)),
        format!("Allergies: {}", list_or_none(&record.allergies)),
    ];

    let objective = vec![
        format!("Age: {} years, gender: {}", record.age, record.gender),
        format!("Temperature: {} °C", v.temperature),
        format!("Heart rate: {} bpm", v.heart_rate),
        format!("Blood pressure: {}/{} mmHg", v.systolic_bp, v.diastolic_bp),
        format!("Respiratory rate: {} /min", v.respiratory_rate),
        format!("Oxygen saturation: {}%", v.oxygen_saturation),
    ];

    let mut assessment = vec![
        format!("Primary diagnosis: {}", verdict.primary_diagnosis),
        format!(
            "Classifier: {} ({:.1}%, {} confidence)",
            verdict.model_diagnosis,
            verdict.model_probability * 100.0,
            verdict.confidence_level
        ),
        format!(
            "Severity: {} ({:.1}/10), urgency: {}",
            verdict.severity, verdict.severity_score, verdict.urgency
        ),
        format!("Source: {}", verdict.provenance),
    ];
    if verdict.escalated {
        assessment.push("Severity raised on the basis of critical vital signs.".to_string());
    }
    let agreement = model_agreement(verdict);
    if let Some(line) = &agreement {
        assessment.push(line.clone());
    }

    let treatment_plan: Vec<TreatmentItem> = verdict
        .treatment_plan
        .iter()
        .map(|(aspect, text)| TreatmentItem {
            aspect: aspect.to_string(),
            label: aspect_label(aspect),
            text: text.to_string(),
        })
        .collect();

    let plan = if treatment_plan.is_empty() {
        vec![PLAN_FALLBACK.to_string()]
    } else {
        treatment_plan
            .iter()
            .map(|item| format!("{}: {}", item.label, item.text))
            .collect()
    };

    let explanation = verdict.patient_explanation.clone().unwrap_or_else(|| {
        format!(
            "Your assessment points to {} with {} severity. {}",
            verdict.primary_diagnosis,
            verdict.severity,
            urgency_advice(verdict.urgency)
        )
    });

    ReportBundle {
        title: REPORT_TITLE.to_string(),
        assessed_at: record.created_at,
        diagnosis_summary: DiagnosisSummary {
            primary_diagnosis: verdict.primary_diagnosis.clone(),
            model_diagnosis: verdict.model_diagnosis.clone(),
            model_probability: verdict.model_probability,
            confidence_level: verdict.confidence_level,
            severity: verdict.severity,
            severity_score: verdict.severity_score,
            urgency: verdict.urgency,
            source: verdict.provenance,
            escalated: verdict.escalated,
            ml_validation: verdict.ml_validation,
            certainty: verdict.certainty,
            override_reason: verdict.override_reason.clone(),
        },
        soap_note: SoapNote {
            subjective,
            objective,
            assessment,
            plan,
        },
        treatment_plan,
        patient_summary: PatientSummary {
            age: record.age,
            gender: record.gender.to_string(),
            symptoms,
            medical_history: record.medical_history.clone(),
            medications: record.medications.clone(),
            allergies: record.allergies.clone(),
            explanation,
        },
        risk_analysis: RiskAnalysis {
            severity: verdict.severity,
            severity_score: verdict.severity_score,
            risk_factors: verdict.risk_factors.clone(),
            red_flags: verdict.red_flags.clone(),
            differentials: verdict.differentials.clone(),
            model_agreement: agreement,
        },
        clinical_reasoning: verdict.reasoning.clone(),
        disclaimer: DISCLAIMER.to_string(),
    }
}
