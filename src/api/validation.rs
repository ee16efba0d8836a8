//! Predict payload: shape check, range check, conversion to a record.
//!
//! Every problem found is reported at once, so the dashboard can show them
//! together.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Gender, PatientRecord, SymptomFlags, Vitals};

const FIELDS: [&str; 13] = [
    "age",
    "gender",
    "temperature",
    "heartRate",
    "systolicBP",
    "diastolicBP",
    "respiratoryRate",
    "oxygenSaturation",
    "painScore",
    "symptoms",
    "medical_history",
    "medications",
    "allergies",
];

/// Accepted gender spellings with no specific value.
const UNSPECIFIED_GENDERS: [&str; 3] = ["", "other", "prefer not to say"];

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "heartRate")]
    pub heart_rate: Option<f64>,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: Option<f64>,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: Option<f64>,
    #[serde(rename = "respiratoryRate")]
    pub respiratory_rate: Option<f64>,
    #[serde(rename = "oxygenSaturation")]
    pub oxygen_saturation: Option<f64>,
    #[serde(rename = "painScore")]
    pub pain_score: Option<f64>,
    #[serde(flatten)]
    pub flags: SymptomFlags,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

/// Inclusive bounds for one numeric field.
struct Range {
    label: &'static str,
    min: f64,
    max: f64,
    unit: &'static str,
}

impl Range {
    const fn new(label: &'static str, min: f64, max: f64, unit: &'static str) -> Self {
        Self {
            label,
            min,
            max,
            unit,
        }
    }

    /// Every field is required. The returned value is only meaningful when
    /// nothing was pushed to `errors`.
    fn check(&self, value: Option<f64>, errors: &mut Vec<String>) -> f64 {
        let Some(v) = value else {
            errors.push(format!("{} is required", self.label));
            return f64::NAN;
        };
        if !(self.min..=self.max).contains(&v) {
            errors.push(format!(
                "{} must be between {}{} and {}{}",
                self.label, self.min, self.unit, self.max, self.unit
            ));
        }
        v
    }
}

const AGE: Range = Range::new("Age", 0.0, 120.0, " years");
const TEMPERATURE: Range = Range::new("Temperature", 35.0, 43.0, "°C");
const HEART_RATE: Range = Range::new("Heart rate", 40.0, 200.0, " BPM");
const SYSTOLIC: Range = Range::new("Systolic BP", 70.0, 250.0, " mmHg");
const DIASTOLIC: Range = Range::new("Diastolic BP", 40.0, 150.0, " mmHg");
const RESP_RATE: Range = Range::new("Respiratory rate", 5.0, 40.0, " breaths/min");
const SPO2: Range = Range::new("Oxygen saturation", 70.0, 100.0, "%");
const PAIN: Range = Range::new("Pain score", 0.0, 10.0, "");

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_gender(raw: Option<&str>) -> Result<Gender, String> {
    let raw = raw.unwrap_or("").trim();
    if UNSPECIFIED_GENDERS.contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(Gender::Unknown);
    }
    raw.parse().map_err(|_| {
        format!(
            "Gender must be one of: male, female, other, unknown, prefer not to say (got {raw:?})"
        )
    })
}

impl PredictRequest {
    /// Decode a request body. Unknown keys and type errors are reported as
    /// validation messages.
    pub fn from_slice(body: &[u8]) -> Result<Self, Vec<String>> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| vec![format!("Malformed JSON: {e}")])?;
        let Some(object) = value.as_object() else {
            return Err(vec!["Request body must be a JSON object".to_string()]);
        };

        let unknown: Vec<String> = object
            .keys()
            .filter(|key| {
                !FIELDS.contains(&key.as_str())
                    && !SymptomFlags::KEYS.iter().any(|(flag, _)| flag == key)
            })
            .map(|key| format!("Unknown field: {key}"))
            .collect();
        if !unknown.is_empty() {
            return Err(unknown);
        }

        serde_json::from_value(value).map_err(|e| vec![format!("Invalid field type: {e}")])
    }

    /// Range-check and build the record. Age, every vital sign and the pain
    /// score must be present; nothing is filled in.
    pub fn into_record(self, created_at: DateTime<Utc>) -> Result<PatientRecord, Vec<String>> {
        let mut errors = Vec::new();

        let age = AGE.check(self.age, &mut errors);
        let gender = parse_gender(self.gender.as_deref()).unwrap_or_else(|e| {
            errors.push(e);
            Gender::Unknown
        });
        let vitals = Vitals {
            temperature: TEMPERATURE.check(self.temperature, &mut errors),
            heart_rate: HEART_RATE.check(self.heart_rate, &mut errors),
            systolic_bp: SYSTOLIC.check(self.systolic_bp, &mut errors),
            diastolic_bp: DIASTOLIC.check(self.diastolic_bp, &mut errors),
            respiratory_rate: RESP_RATE.check(self.respiratory_rate, &mut errors),
            oxygen_saturation: SPO2.check(self.oxygen_saturation, &mut errors),
        };
        let pain_score = PAIN.check(self.pain_score, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PatientRecord {
            age,
            gender,
            vitals,
            pain_score,
            symptoms: self.flags,
            other_symptoms: clean_list(self.symptoms),
            medical_history: clean_list(self.medical_history),
            medications: clean_list(self.medications),
            allergies: clean_list(self.allergies),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient::fixtures::fixed_time;

    const VITALS: &str = r#""temperature": 37.0, "heartRate": 72, "systolicBP": 118,
        "diastolicBP": 76, "respiratoryRate": 14, "oxygenSaturation": 98, "painScore": 1"#;

    fn parse(body: &str) -> Result<PatientRecord, Vec<String>> {
        PredictRequest::from_slice(body.as_bytes())?.into_record(fixed_time())
    }

    /// `extra` is spliced into an otherwise complete adult payload.
    fn parse_with(extra: &str) -> Result<PatientRecord, Vec<String>> {
        parse(&format!("{{{VITALS}, {extra}}}"))
    }

    #[test]
    fn full_payload_becomes_record() {
        let record = parse(
            r#"{"age": 65, "gender": "Male", "temperature": 39.5, "heartRate": 115,
                "systolicBP": 85, "diastolicBP": 50, "respiratoryRate": 28,
                "oxygenSaturation": 88, "painScore": 8, "fever": true, "confusion": true,
                "symptoms": [" rigors ", ""], "medical_history": ["type 2 diabetes"],
                "medications": [], "allergies": ["penicillin"]}"#,
        )
        .unwrap();
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.vitals.systolic_bp, 85.0);
        assert!(record.symptoms.fever && record.symptoms.confusion);
        assert!(!record.symptoms.cough);
        assert_eq!(record.other_symptoms, vec!["rigors"]);
        assert_eq!(record.allergies, vec!["penicillin"]);
        assert_eq!(record.created_at, fixed_time());
    }

    #[test]
    fn missing_vitals_are_rejected() {
        let errors = parse(r#"{"age": 70}"#).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Temperature is required",
                "Heart rate is required",
                "Systolic BP is required",
                "Diastolic BP is required",
                "Respiratory rate is required",
                "Oxygen saturation is required",
                "Pain score is required",
            ]
        );

        let errors = parse(
            r#"{"age": 70, "temperature": 37.0, "heartRate": 72, "systolicBP": 118,
                "diastolicBP": 76, "respiratoryRate": 14, "painScore": 1}"#,
        )
        .unwrap_err();
        assert_eq!(errors, vec!["Oxygen saturation is required"]);
    }

    #[test]
    fn null_vital_counts_as_missing() {
        let errors = parse(
            r#"{"age": 70, "temperature": 37.0, "heartRate": null, "systolicBP": 118,
                "diastolicBP": 76, "respiratoryRate": 14, "oxygenSaturation": 98,
                "painScore": 1}"#,
        )
        .unwrap_err();
        assert_eq!(errors, vec!["Heart rate is required"]);
    }

    #[test]
    fn complete_payload_without_gender_is_unknown() {
        let record = parse_with(r#""age": 30"#).unwrap();
        assert_eq!(record.vitals.heart_rate, 72.0);
        assert_eq!(record.gender, Gender::Unknown);
        assert_eq!(record.pain_score, 1.0);
    }

    #[test]
    fn unknown_keys_rejected() {
        let errors = parse_with(r#""age": 30, "bloodType": "O+", "hiccups": true"#).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&"Unknown field: bloodType".to_string()));
        assert!(errors.contains(&"Unknown field: hiccups".to_string()));
    }

    #[test]
    fn every_out_of_range_value_is_reported() {
        let errors = parse(
            r#"{"age": 130, "temperature": 45, "heartRate": 72, "systolicBP": 118,
                "diastolicBP": 76, "respiratoryRate": 14, "oxygenSaturation": 60,
                "painScore": 11}"#,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("Age must be between"));
        assert!(errors.iter().any(|e| e.starts_with("Oxygen saturation")));
    }

    #[test]
    fn age_is_required() {
        assert_eq!(parse(&format!("{{{VITALS}}}")).unwrap_err(), vec!["Age is required"]);
    }

    #[test]
    fn gender_aliases() {
        let gender = |g: &str| parse_with(&format!(r#""age": 1, "gender": "{g}""#));
        assert_eq!(gender("other").unwrap().gender, Gender::Unknown);
        assert_eq!(gender("prefer not to say").unwrap().gender, Gender::Unknown);
        assert_eq!(gender("FEMALE").unwrap().gender, Gender::Female);
        assert!(gender("robot").is_err());
    }

    #[test]
    fn wrong_types_and_shapes() {
        let errors = parse_with(r#""age": "sixty""#).unwrap_err();
        assert!(errors[0].starts_with("Invalid field type"));
        assert!(parse("[1, 2]").unwrap_err()[0].contains("JSON object"));
        assert!(parse("{not json").unwrap_err()[0].starts_with("Malformed JSON"));
    }
}
