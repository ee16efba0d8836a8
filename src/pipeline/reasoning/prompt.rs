use std::fmt::Write as _;

use crate::models::PatientRecord;
use crate::pipeline::classifier::ClassifierOutput;
use crate::pipeline::features::FeatureVector;

pub const REVIEW_SYSTEM_PROMPT: &str = r#"
You are a board-certified emergency physician reviewing the output of a
statistical triage model. You receive measured vital signs, derived clinical
flags, reported symptoms and the model's probability distribution over broad
disease categories.

RULES:
1. Base your judgment ONLY on the data provided.
2. Be specific: name a concrete condition, not a category, when you can.
3. If the data does not support a specific diagnosis, set "diagnosis" to null.
4. severity MUST be one of: mild, moderate, severe, critical.
5. urgency MUST be one of: routine, urgent, emergency.
6. Return ONLY valid JSON. No prose outside the JSON object.
"#;

/// Build the review prompt for one patient.
pub fn build_review_prompt(
    record: &PatientRecord,
    features: &FeatureVector,
    classifier: &ClassifierOutput,
) -> String {
    let v = &record.vitals;
    let mut context = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(context, "Age: {} years", record.age);
    let _ = writeln!(context, "Gender: {}", record.gender);
    let _ = writeln!(context, "Temperature: {}°C", v.temperature);
    let _ = writeln!(context, "Heart Rate: {} bpm", v.heart_rate);
    let _ = writeln!(
        context,
        "Blood Pressure: {}/{} mmHg",
        v.systolic_bp, v.diastolic_bp
    );
    let _ = writeln!(context, "Respiratory Rate: {} /min", v.respiratory_rate);
    let _ = writeln!(context, "Oxygen Saturation: {}%", v.oxygen_saturation);
    let _ = writeln!(context, "Pain Score: {}/10", record.pain_score);

    let symptoms = record.symptom_descriptions();
    if !symptoms.is_empty() {
        let _ = writeln!(context, "Symptoms: {}", symptoms.join(", "));
    }
    for (label, items) in [
        ("Medical History", &record.medical_history),
        ("Medications", &record.medications),
        ("Allergies", &record.allergies),
    ] {
        if !items.is_empty() {
            let _ = writeln!(context, "{label}: {}", items.join(", "));
        }
    }

    let flags = features.flags().active();
    let flag_line = if flags.is_empty() {
        "none".to_string()
    } else {
        flags.join(", ")
    };

    let mut distribution = String::new();
    for lp in &classifier.distribution {
        let _ = writeln!(distribution, "- {}: {:.1}%", lp.label, lp.probability * 100.0);
    }

    format!(
        r#"<patient>
{context}</patient>

DERIVED FLAGS: {flag_line}

MODEL FINDINGS:
- Primary: {primary} ({confidence:.1}%, {level} confidence)
{distribution}
YOUR TASK:
1. Give your own diagnosis from the clinical presentation and judge whether
   the model's primary category is correct.
2. Rate severity and urgency.
3. Explain your clinical reasoning.
4. List differential diagnoses and red flags.
5. Outline a treatment plan.
6. Write a short explanation the patient can understand.

Return ONLY this JSON:
```json
{{
  "diagnosis": "specific diagnosis or null",
  "severity": "mild | moderate | severe | critical",
  "urgency": "routine | urgent | emergency",
  "clinical_reasoning": "your explanation",
  "differentials": ["dx1", "dx2"],
  "red_flags": ["flag1"],
  "treatment_plan": {{
    "immediate_interventions": ["item"],
    "medications": ["drug - dose"],
    "monitoring": ["item"],
    "follow_up": ["item"],
    "patient_education": ["item"]
  }},
  "patient_explanation": "plain-language summary",
  "ml_validation": "Correct | Partially Correct | Incorrect | Unsure",
  "certainty": 0.0,
  "override_reason": "why the model's category is wrong, or null"
}}
```"#,
        primary = classifier.primary_label,
        confidence = classifier.primary_probability * 100.0,
        level = classifier.confidence,
    )
}
