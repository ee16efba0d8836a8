use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Gender;

/// Bedside vital signs as measured at intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Beats per minute.
    pub heart_rate: f64,
    /// mmHg.
    pub systolic_bp: f64,
    /// mmHg.
    pub diastolic_bp: f64,
    /// Breaths per minute.
    pub respiratory_rate: f64,
    /// Percent, 0–100.
    pub oxygen_saturation: f64,
}

/// Boolean symptom checklist submitted with an assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomFlags {
    pub fever: bool,
    pub cough: bool,
    pub chest_pain: bool,
    pub shortness_of_breath: bool,
    pub fatigue: bool,
    pub headache: bool,
    pub nausea: bool,
    pub dizziness: bool,
    pub confusion: bool,
}

impl SymptomFlags {
    /// Every checklist key with its display label, in checklist order.
    pub const KEYS: [(&'static str, &'static str); 9] = [
        ("fever", "fever"),
        ("cough", "cough"),
        ("chest_pain", "chest pain"),
        ("shortness_of_breath", "shortness of breath"),
        ("fatigue", "fatigue"),
        ("headache", "headache"),
        ("nausea", "nausea"),
        ("dizziness", "dizziness"),
        ("confusion", "confusion"),
    ];

    /// Value of the flag with the given checklist key.
    pub fn get(&self, key: &str) -> Option<bool> {
        let value = match key {
            "fever" => self.fever,
            "cough" => self.cough,
            "chest_pain" => self.chest_pain,
            "shortness_of_breath" => self.shortness_of_breath,
            "fatigue" => self.fatigue,
            "headache" => self.headache,
            "nausea" => self.nausea,
            "dizziness" => self.dizziness,
            "confusion" => self.confusion,
            _ => return None,
        };
        Some(value)
    }

    /// Set the flag with the given checklist key. Returns false for unknown keys.
    pub fn set(&mut self, key: &str, value: bool) -> bool {
        let slot = match key {
            "fever" => &mut self.fever,
            "cough" => &mut self.cough,
            "chest_pain" => &mut self.chest_pain,
            "shortness_of_breath" => &mut self.shortness_of_breath,
            "fatigue" => &mut self.fatigue,
            "headache" => &mut self.headache,
            "nausea" => &mut self.nausea,
            "dizziness" => &mut self.dizziness,
            "confusion" => &mut self.confusion,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Display labels of the flags that are set, in checklist order.
    pub fn active_labels(&self) -> Vec<&'static str> {
        Self::KEYS
            .iter()
            .filter(|(key, _)| self.get(key).unwrap_or(false))
            .map(|(_, label)| *label)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.active_labels().len()
    }
}

/// One patient presentation. Built once per assessment request and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Years, 0–120.
    pub age: f64,
    pub gender: Gender,
    pub vitals: Vitals,
    /// 0–10.
    pub pain_score: f64,
    pub symptoms: SymptomFlags,
    /// Free-form symptom descriptions beyond the checklist.
    #[serde(default)]
    pub other_symptoms: Vec<String>,
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PatientRecord {
    /// Checklist labels followed by free-form symptoms, without duplicates.
    pub fn symptom_descriptions(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .symptoms
            .active_labels()
            .into_iter()
            .map(String::from)
            .collect();
        for extra in &self.other_symptoms {
            let trimmed = extra.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !out.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
                out.push(trimmed.to_string());
            }
        }
        out
    }

    /// Names of numeric fields that are NaN or infinite.
    pub fn non_finite_fields(&self) -> Vec<&'static str> {
        let v = &self.vitals;
        [
            ("age", self.age),
            ("temperature", v.temperature),
            ("heart_rate", v.heart_rate),
            ("systolic_bp", v.systolic_bp),
            ("diastolic_bp", v.diastolic_bp),
            ("respiratory_rate", v.respiratory_rate),
            ("oxygen_saturation", v.oxygen_saturation),
            ("pain_score", self.pain_score),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
        .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn active_labels_follow_checklist_order() {
        let flags = SymptomFlags {
            confusion: true,
            fever: true,
            ..SymptomFlags::default()
        };
        assert_eq!(flags.active_labels(), vec!["fever", "confusion"]);
        assert_eq!(flags.count(), 2);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut flags = SymptomFlags::default();
        assert!(flags.set("chest_pain", true));
        assert!(flags.chest_pain);
        assert!(!flags.set("hiccups", true));
    }

    #[test]
    fn symptom_descriptions_merge_without_duplicates() {
        let mut record = septic_shock();
        record.other_symptoms = vec!["Fever".into(), "  ".into(), "rigors".into()];
        assert_eq!(
            record.symptom_descriptions(),
            vec!["fever", "shortness of breath", "confusion", "rigors"]
        );
    }

    #[test]
    fn non_finite_fields_reported_by_name() {
        let mut record = healthy_adult();
        assert!(record.non_finite_fields().is_empty());
        record.vitals.heart_rate = f64::NAN;
        record.pain_score = f64::INFINITY;
        assert_eq!(record.non_finite_fields(), vec!["heart_rate", "pain_score"]);
    }

    #[test]
    fn symptom_flags_default_when_missing_from_json() {
        let flags: SymptomFlags = serde_json::from_str(r#"{"cough": true}"#).unwrap();
        assert!(flags.cough);
        assert!(!flags.fever);
    }
}
