use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::enums::{ConfidenceLevel, MlValidation, Provenance, Severity, Urgency};
use super::patient::PatientRecord;

// ═══════════════════════════════════════════════════════════
// Treatment plan
// ═══════════════════════════════════════════════════════════

/// Treatment aspect (e.g. `medications`, `monitoring`) to prose, in the
/// order the aspects were written. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreatmentPlan(Vec<(String, String)>);

impl TreatmentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the prose of an existing aspect in place, else appends.
    pub fn insert(&mut self, aspect: impl Into<String>, prose: impl Into<String>) {
        let aspect = aspect.into();
        let prose = prose.into();
        match self.0.iter_mut().find(|(a, _)| *a == aspect) {
            Some(entry) => entry.1 = prose,
            None => self.0.push((aspect, prose)),
        }
    }

    pub fn get(&self, aspect: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(a, _)| a == aspect)
            .map(|(_, prose)| prose.as_str())
    }

    pub fn contains_key(&self, aspect: &str) -> bool {
        self.get(aspect).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, p)| (a.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for TreatmentPlan {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut plan = Self::new();
        for (aspect, prose) in iter {
            plan.insert(aspect, prose);
        }
        plan
    }
}

impl<const N: usize> From<[(String, String); N]> for TreatmentPlan {
    fn from(entries: [(String, String); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl Serialize for TreatmentPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (aspect, prose) in &self.0 {
            map.serialize_entry(aspect, prose)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TreatmentPlan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlanVisitor;

        impl<'de> Visitor<'de> for PlanVisitor {
            type Value = TreatmentPlan;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of treatment aspect to text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut plan = TreatmentPlan::new();
                while let Some((aspect, prose)) = access.next_entry::<String, String>()? {
                    plan.insert(aspect, prose);
                }
                Ok(plan)
            }
        }

        deserializer.deserialize_map(PlanVisitor)
    }
}

// ═══════════════════════════════════════════════════════════
// Verdict
// ═══════════════════════════════════════════════════════════

/// The single authoritative output of one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalVerdict {
    pub primary_diagnosis: String,
    /// What the classifier alone concluded, kept for the report even when
    /// the reasoning service named a different diagnosis.
    pub model_diagnosis: String,
    pub model_probability: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    /// 0–10, always inside `severity.score_band()`.
    pub severity_score: f64,
    pub urgency: Urgency,
    pub reasoning: String,
    pub treatment_plan: TreatmentPlan,
    pub differentials: Vec<String>,
    pub red_flags: Vec<String>,
    pub risk_factors: Vec<String>,
    pub patient_explanation: Option<String>,
    /// How the reasoning service judged the classifier's label.
    #[serde(default)]
    pub ml_validation: Option<MlValidation>,
    /// Reasoning service's own certainty, 0–1.
    #[serde(default)]
    pub certainty: Option<f64>,
    #[serde(default)]
    pub override_reason: Option<String>,
    pub provenance: Provenance,
    /// Vitals overrode a lower severity from the reasoning service.
    pub escalated: bool,
    /// File name of the rendered report, once one exists.
    pub report_file: Option<String>,
}

impl ClinicalVerdict {
    /// Same verdict with the report artifact attached.
    pub fn with_report(self, file_name: impl Into<String>) -> Self {
        Self {
            report_file: Some(file_name.into()),
            ..self
        }
    }

    pub fn reasoning_reviewed(&self) -> bool {
        self.provenance == Provenance::ModelWithReasoning
    }
}

/// One completed assessment, as kept in the in-memory history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub patient_id: Option<String>,
    pub record: PatientRecord,
    pub verdict: ClinicalVerdict,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn model_only_verdict() -> ClinicalVerdict {
        ClinicalVerdict {
            primary_diagnosis: "Sepsis".into(),
            model_diagnosis: "Sepsis".into(),
            model_probability: 0.77,
            confidence_level: ConfidenceLevel::High,
            severity: Severity::Critical,
            severity_score: 10.0,
            urgency: Urgency::Emergency,
            reasoning: "Classifier-only assessment.".into(),
            treatment_plan: TreatmentPlan::new(),
            differentials: vec!["Respiratory".into()],
            red_flags: vec!["Hypotension (SBP 85 mmHg)".into()],
            risk_factors: vec!["Age 65 or older".into()],
            patient_explanation: None,
            ml_validation: None,
            certainty: None,
            override_reason: None,
            provenance: Provenance::ModelOnly,
            escalated: false,
            report_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn with_report_keeps_every_other_field() {
        let verdict = model_only_verdict();
        let attached = verdict.clone().with_report("report_20260314092653.pdf");
        assert_eq!(
            attached.report_file.as_deref(),
            Some("report_20260314092653.pdf")
        );
        assert_eq!(
            ClinicalVerdict {
                report_file: None,
                ..attached
            },
            verdict
        );
    }

    #[test]
    fn plan_keeps_written_order() {
        let mut plan = TreatmentPlan::new();
        plan.insert("immediate_interventions", "IV fluids");
        plan.insert("follow_up", "ICU review");
        plan.insert("immediate_interventions", "IV fluids; oxygen");
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(
            json,
            r#"{"immediate_interventions":"IV fluids; oxygen","follow_up":"ICU review"}"#
        );

        let back: TreatmentPlan =
            serde_json::from_str(r#"{"monitoring":"Hourly","diagnostic_tests":"ECG"}"#).unwrap();
        let aspects: Vec<&str> = back.iter().map(|(aspect, _)| aspect).collect();
        assert_eq!(aspects, vec!["monitoring", "diagnostic_tests"]);
        assert_eq!(back.get("diagnostic_tests"), Some("ECG"));
    }

    #[test]
    fn verdicts_without_review_fields_still_load() {
        let mut json = serde_json::to_value(model_only_verdict()).unwrap();
        let object = json.as_object_mut().unwrap();
        object.remove("ml_validation");
        object.remove("certainty");
        object.remove("override_reason");
        let verdict: ClinicalVerdict = serde_json::from_value(json).unwrap();
        assert_eq!(verdict, model_only_verdict());
    }

    #[test]
    fn reviewed_follows_provenance() {
        let mut verdict = model_only_verdict();
        assert!(!verdict.reasoning_reviewed());
        verdict.provenance = Provenance::ModelWithReasoning;
        assert!(verdict.reasoning_reviewed());
    }
}
