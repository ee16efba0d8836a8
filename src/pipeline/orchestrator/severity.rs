//! Weighted vitals rule: the 0–10 severity score derived from vitals alone.

use serde::Serialize;

use crate::clinical_config::SeverityRules;
use crate::models::{PatientRecord, Severity};
use crate::pipeline::features::ClinicalFlags;

/// One rule that fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub finding: String,
    pub points: f64,
    /// Backed by a flag that counts toward escalation.
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalsSeverity {
    /// Capped at `SeverityRules::max_score`.
    pub score: f64,
    pub severity: Severity,
    pub contributions: Vec<Contribution>,
}

impl VitalsSeverity {
    pub fn findings(&self) -> Vec<String> {
        self.contributions.iter().map(|c| c.finding.clone()).collect()
    }

    pub fn critical_findings(&self) -> Vec<String> {
        self.contributions
            .iter()
            .filter(|c| c.critical)
            .map(|c| c.finding.clone())
            .collect()
    }
}

pub fn score_vitals(
    record: &PatientRecord,
    flags: &ClinicalFlags,
    rules: &SeverityRules,
) -> VitalsSeverity {
    let v = &record.vitals;
    let mut contributions = Vec::new();
    let mut add = |finding: String, points: f64, critical: bool| {
        contributions.push(Contribution {
            finding,
            points,
            critical,
        });
    };

    if record.age >= rules.elderly_age {
        add(
            format!("Age {} or older", rules.elderly_age),
            rules.age_points,
            false,
        );
    } else if record.age < rules.young_child_age {
        add(
            format!("Age under {}", rules.young_child_age),
            rules.age_points,
            false,
        );
    }

    if flags.severe_hypoxia {
        add(
            format!("Severe hypoxia (SpO2 {}%)", v.oxygen_saturation),
            rules.severe_hypoxia_points,
            true,
        );
    } else if flags.hypoxia {
        add(
            format!("Hypoxia (SpO2 {}%)", v.oxygen_saturation),
            rules.hypoxia_points,
            true,
        );
    }

    if flags.hypotension {
        add(
            format!("Hypotension (BP {}/{} mmHg)", v.systolic_bp, v.diastolic_bp),
            rules.hypotension_points,
            true,
        );
    }

    if v.heart_rate > rules.marked_tachycardia_hr {
        add(
            format!("Marked tachycardia (HR {} bpm)", v.heart_rate),
            rules.marked_tachycardia_points,
            flags.tachycardia,
        );
    } else if flags.tachycardia {
        add(
            format!("Tachycardia (HR {} bpm)", v.heart_rate),
            rules.tachycardia_points,
            true,
        );
    }

    if flags.tachypnea {
        add(
            format!("Tachypnea (RR {} /min)", v.respiratory_rate),
            rules.tachypnea_points,
            true,
        );
    }

    if flags.fever_high {
        add(
            format!("High fever ({}°C)", v.temperature),
            rules.high_fever_points,
            true,
        );
    } else if flags.fever {
        add(
            format!("Fever ({}°C)", v.temperature),
            rules.fever_points,
            false,
        );
    }

    if record.pain_score >= rules.severe_pain_score {
        add(
            format!("Severe pain ({}/10)", record.pain_score),
            rules.severe_pain_points,
            false,
        );
    }

    if flags.confusion {
        add("Confusion".to_string(), rules.confusion_points, true);
    }

    let total: f64 = contributions.iter().map(|c| c.points).sum();
    let score = total.min(rules.max_score);
    VitalsSeverity {
        score,
        severity: Severity::from_score(score),
        contributions,
    }
}

/// Clamp a score into the band of `severity` so the number and the enum
/// never disagree. Non-critical bands are half-open, so their ceiling sits
/// just below the next bucket.
pub fn score_in_band(score: f64, severity: Severity) -> f64 {
    let (low, high) = severity.score_band();
    let ceiling = if severity == Severity::Critical {
        high
    } else {
        high - 0.1
    };
    score.clamp(low, ceiling)
}
