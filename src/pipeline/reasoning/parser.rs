//! Reply parsing. Models wrap JSON inconsistently, so the object is taken
//! from the whole reply, a ```json fence, or the outermost braces, in that
//! order. Anything short of a complete judgment is rejected.

use std::fmt;
use std::str::FromStr;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use super::types::{ReasoningError, ReasoningOutput};
use crate::models::{MlValidation, Severity, TreatmentPlan, Urgency};

#[derive(Deserialize)]
struct RawReply {
    #[serde(alias = "gemini_diagnosis")]
    diagnosis: Option<String>,
    severity: Option<String>,
    urgency: Option<String>,
    clinical_reasoning: Option<String>,
    #[serde(default)]
    differentials: Option<Value>,
    #[serde(default)]
    red_flags: Option<Value>,
    #[serde(default)]
    treatment_plan: Option<Entries>,
    patient_explanation: Option<String>,
    #[serde(default)]
    ml_validation: Option<Value>,
    #[serde(default)]
    certainty: Option<Value>,
    #[serde(default)]
    override_reason: Option<Value>,
}

/// JSON object entries in document order.
struct Entries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Entries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Locate the JSON object inside a model reply.
pub(crate) fn extract_json(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let open = trimmed.find('{')?;
    let close = trimmed.rfind('}')?;
    (close > open).then(|| &trimmed[open..=close])
}

/// Parse a model reply into a complete [`ReasoningOutput`].
pub fn parse_review(reply: &str) -> Result<ReasoningOutput, ReasoningError> {
    let json = extract_json(reply)
        .ok_or_else(|| ReasoningError::MalformedResponse("No JSON object found".into()))?;
    let raw: RawReply = serde_json::from_str(json)
        .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;

    let severity = required(raw.severity, "severity")?;
    let severity = Severity::from_str(&severity)
        .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;
    let urgency = required(raw.urgency, "urgency")?;
    let urgency = Urgency::from_str(&urgency)
        .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;
    let clinical_reasoning = required(raw.clinical_reasoning, "clinical_reasoning")?;

    Ok(ReasoningOutput {
        diagnosis: non_empty(raw.diagnosis).filter(|d| !d.eq_ignore_ascii_case("null")),
        severity,
        urgency,
        red_flags: string_list(raw.red_flags),
        clinical_reasoning,
        differentials: string_list(raw.differentials),
        treatment_plan: treatment_plan(raw.treatment_plan),
        patient_explanation: non_empty(raw.patient_explanation),
        ml_validation: raw
            .ml_validation
            .as_ref()
            .and_then(value_text)
            .and_then(|v| MlValidation::from_str(&v).ok()),
        certainty: raw.certainty.as_ref().and_then(certainty),
        override_reason: raw
            .override_reason
            .as_ref()
            .and_then(value_text)
            .filter(|r| !r.eq_ignore_ascii_case("null")),
    })
}

/// A probability in [0, 1]. Numeric strings are accepted.
fn certainty(value: &Value) -> Option<f64> {
    let c = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (c.is_finite() && (0.0..=1.0).contains(&c)).then_some(c)
}

fn required(value: Option<String>, field: &str) -> Result<String, ReasoningError> {
    non_empty(value)
        .ok_or_else(|| ReasoningError::MalformedResponse(format!("missing field {field}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accepts a list of strings, a single string, or nothing.
fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(other) => value_text(&other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// List values are joined with "; ". Empty aspects are dropped.
fn treatment_plan(entries: Option<Entries>) -> TreatmentPlan {
    let mut plan = TreatmentPlan::new();
    for (aspect, value) in entries.into_iter().flat_map(|e| e.0) {
        let prose = if value.is_array() {
            string_list(Some(value)).join("; ")
        } else {
            value_text(&value).unwrap_or_default()
        };
        if !prose.is_empty() {
            plan.insert(aspect, prose);
        }
    }
    plan
}
