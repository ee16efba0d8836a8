//! Clinical constants shared by feature derivation, the classifier label
//! order and severity reconciliation.
//!
//! Every threshold lives here once. The Feature Deriver reads
//! [`VitalThresholds`], the classifier adapter checks its artifact labels
//! against [`DISEASE_TAXONOMY`], and the orchestrator scores vitals with
//! [`SeverityRules`]. Classifier-only verdicts draw their plan from
//! [`RecommendationTable`].

use serde::Serialize;

use crate::models::Severity;

/// Disease categories in classifier label order (alphabetical, as encoded
/// when the forest was trained).
pub const DISEASE_TAXONOMY: [&str; 8] = [
    "Cardiovascular",
    "Gastrointestinal",
    "Metabolic",
    "Neurological",
    "Other",
    "Respiratory",
    "Sepsis",
    "Trauma",
];

// ═══════════════════════════════════════════════════════════
// Vital sign thresholds
// ═══════════════════════════════════════════════════════════

/// Cut-offs for the derived 0/1 clinical flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalThresholds {
    /// Hypotension when systolic is strictly below this (mmHg).
    pub hypotension_systolic: f64,
    /// ...or diastolic strictly below this (mmHg).
    pub hypotension_diastolic: f64,
    /// Tachycardia when heart rate is strictly above this (bpm).
    pub tachycardia_hr: f64,
    /// Bradycardia when heart rate is strictly below this (bpm).
    pub bradycardia_hr: f64,
    /// Hypoxia when SpO2 is strictly below this (%).
    pub hypoxia_spo2: f64,
    pub severe_hypoxia_spo2: f64,
    /// Fever at or above this temperature (°C).
    pub fever_temp: f64,
    pub high_fever_temp: f64,
    /// Tachypnea when respiratory rate is strictly above this (/min).
    pub tachypnea_rr: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            hypotension_systolic: 90.0,
            hypotension_diastolic: 60.0,
            tachycardia_hr: 100.0,
            bradycardia_hr: 60.0,
            hypoxia_spo2: 95.0,
            severe_hypoxia_spo2: 90.0,
            fever_temp: 38.0,
            high_fever_temp: 39.0,
            tachypnea_rr: 20.0,
        }
    }
}

/// Age bucket boundaries: `<5`, `5–17`, `18–64`, `≥65`.
pub const AGE_BUCKET_BOUNDS: [f64; 3] = [5.0, 18.0, 65.0];

/// Pain bucket boundaries: `0`, `1–3`, `4–6`, `7–10`.
pub const PAIN_BUCKET_BOUNDS: [f64; 3] = [1.0, 4.0, 7.0];

// ═══════════════════════════════════════════════════════════
// Severity rule table
// ═══════════════════════════════════════════════════════════

/// Points of the weighted vitals rule. The total is capped at `max_score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityRules {
    pub elderly_age: f64,
    pub young_child_age: f64,
    pub age_points: f64,
    pub severe_hypoxia_points: f64,
    pub hypoxia_points: f64,
    pub hypotension_points: f64,
    /// Heart rate above this scores `marked_tachycardia_points` instead of
    /// `tachycardia_points`.
    pub marked_tachycardia_hr: f64,
    pub marked_tachycardia_points: f64,
    pub tachycardia_points: f64,
    pub tachypnea_points: f64,
    pub high_fever_points: f64,
    pub fever_points: f64,
    pub severe_pain_score: f64,
    pub severe_pain_points: f64,
    pub confusion_points: f64,
    pub max_score: f64,
    /// Critical vitals flags needed before vitals may override the
    /// reasoning service's severity.
    pub escalation_min_flags: usize,
}

impl Default for SeverityRules {
    fn default() -> Self {
        Self {
            elderly_age: 65.0,
            young_child_age: 5.0,
            age_points: 1.0,
            severe_hypoxia_points: 6.0,
            hypoxia_points: 2.0,
            hypotension_points: 3.0,
            marked_tachycardia_hr: 120.0,
            marked_tachycardia_points: 2.0,
            tachycardia_points: 1.0,
            tachypnea_points: 1.0,
            high_fever_points: 1.0,
            fever_points: 0.5,
            severe_pain_score: 7.0,
            severe_pain_points: 1.0,
            confusion_points: 2.0,
            max_score: 10.0,
            escalation_min_flags: 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rule-based recommendations
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelRecommendations {
    pub label: String,
    pub tests: Vec<String>,
    pub treatments: Vec<String>,
}

/// Tests and treatments offered when no reasoning service reviewed the case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationTable {
    /// Ordered for every patient.
    pub baseline_tests: Vec<String>,
    /// Added when SpO2 is below the severe hypoxia threshold.
    pub severe_hypoxia_test: String,
    pub hypotension_test: String,
    pub supportive_care: Vec<String>,
    /// Severity at which `escalated_care` applies.
    pub escalated_care_from: Severity,
    pub escalated_care: Vec<String>,
    pub by_label: Vec<LabelRecommendations>,
}

impl RecommendationTable {
    pub fn for_label(&self, label: &str) -> Option<&LabelRecommendations> {
        self.by_label.iter().find(|r| r.label == label)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn label(label: &str, tests: &[&str], treatments: &[&str]) -> LabelRecommendations {
    LabelRecommendations {
        label: label.to_string(),
        tests: strings(tests),
        treatments: strings(treatments),
    }
}

impl Default for RecommendationTable {
    fn default() -> Self {
        Self {
            baseline_tests: strings(&["Complete Blood Count", "Basic Metabolic Panel"]),
            severe_hypoxia_test: "Arterial Blood Gas".to_string(),
            hypotension_test: "Central Venous Pressure Monitoring".to_string(),
            supportive_care: strings(&[
                "Monitor vital signs every 4 hours",
                "Maintain adequate hydration",
            ]),
            escalated_care_from: Severity::Severe,
            escalated_care: strings(&["Consider ICU admission", "Establish IV access"]),
            by_label: vec![
                label(
                    "Cardiovascular",
                    &["ECG", "Cardiac Enzymes", "Echocardiogram"],
                    &[
                        "Administer aspirin 325mg chewed",
                        "Start dual antiplatelet therapy",
                        "Consider reperfusion therapy (PCI/thrombolytics)",
                    ],
                ),
                label(
                    "Metabolic",
                    &["Blood Glucose", "Ketone Level", "Arterial Blood Gas"],
                    &[],
                ),
                label(
                    "Neurological",
                    &["CT Head", "MRI Brain", "Carotid Ultrasound"],
                    &[],
                ),
                label(
                    "Respiratory",
                    &["Chest X-Ray", "Sputum Culture", "Blood Culture"],
                    &[
                        "Start empirical antibiotics (e.g., ceftriaxone + azithromycin)",
                        "Administer oxygen to maintain SpO2 > 92%",
                        "Consider chest physiotherapy",
                    ],
                ),
                label(
                    "Sepsis",
                    &["Blood Culture", "Lactate Level", "Coagulation Panel"],
                    &[
                        "Administer broad-spectrum antibiotics within 1 hour",
                        "Initiate fluid resuscitation (30ml/kg crystalloid)",
                        "Consider vasopressor support if hypotensive",
                    ],
                ),
            ],
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Aggregate
// ═══════════════════════════════════════════════════════════

/// Everything clinical the pipeline is parameterised by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicalConfig {
    pub taxonomy: Vec<String>,
    pub thresholds: VitalThresholds,
    pub severity: SeverityRules,
    pub recommendations: RecommendationTable,
}

impl Default for ClinicalConfig {
    fn default() -> Self {
        Self {
            taxonomy: DISEASE_TAXONOMY.iter().map(|s| s.to_string()).collect(),
            thresholds: VitalThresholds::default(),
            severity: SeverityRules::default(),
            recommendations: RecommendationTable::default(),
        }
    }
}
