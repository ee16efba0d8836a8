//! Feature Deriver: raw vitals and symptoms to the engineered feature
//! vector the classifier was trained on.
//!
//! Pure and total. Out-of-range values pass through unmodified; a NaN
//! vital simply leaves every flag that depends on it unset.

use serde::{Deserialize, Serialize};

use crate::clinical_config::{VitalThresholds, AGE_BUCKET_BOUNDS, PAIN_BUCKET_BOUNDS};
use crate::models::enums::{str_enum, ParseEnumError};
use crate::models::PatientRecord;

str_enum!(Feature {
    Temperature => "temperature",
    HeartRate => "heartrate",
    RespRate => "resprate",
    Sbp => "sbp",
    Dbp => "dbp",
    O2Sat => "o2sat",
    Age => "anchor_age",
    PainScore => "pain_score",
    Fever => "fever",
    FeverHigh => "fever_high",
    Tachycardia => "tachycardia",
    Bradycardia => "bradycardia",
    Hypotension => "hypotension",
    Hypoxia => "hypoxia",
    SevereHypoxia => "severe_hypoxia",
    Tachypnea => "tachypnea",
    AgeBucket => "age_bucket",
    PainBucket => "pain_bucket",
    SymptomCount => "symptom_count",
    SymFever => "sym_fever",
    SymCough => "sym_cough",
    SymChestPain => "sym_chest_pain",
    SymShortnessOfBreath => "sym_shortness_of_breath",
    SymFatigue => "sym_fatigue",
    SymHeadache => "sym_headache",
    SymNausea => "sym_nausea",
    SymDizziness => "sym_dizziness",
    SymConfusion => "sym_confusion",
});

impl Feature {
    fn index(self) -> usize {
        self as usize
    }
}

/// Typed view of the derived boolean flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalFlags {
    pub fever: bool,
    pub fever_high: bool,
    pub tachycardia: bool,
    pub bradycardia: bool,
    pub hypotension: bool,
    pub hypoxia: bool,
    pub severe_hypoxia: bool,
    pub tachypnea: bool,
    /// Carried over from the symptom checklist; scored like a vital sign.
    pub confusion: bool,
}

impl ClinicalFlags {
    /// Flags strong enough to let vitals overrule the reasoning service.
    pub fn critical_count(&self) -> usize {
        [
            self.hypoxia,
            self.severe_hypoxia,
            self.hypotension,
            self.tachycardia,
            self.tachypnea,
            self.fever_high,
            self.confusion,
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Names of the flags that are set.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("fever", self.fever),
            ("fever_high", self.fever_high),
            ("tachycardia", self.tachycardia),
            ("bradycardia", self.bradycardia),
            ("hypotension", self.hypotension),
            ("hypoxia", self.hypoxia),
            ("severe_hypoxia", self.severe_hypoxia),
            ("tachypnea", self.tachypnea),
            ("confusion", self.confusion),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Read-only named feature mapping. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
    flags: ClinicalFlags,
}

impl FeatureVector {
    pub fn value(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn flags(&self) -> &ClinicalFlags {
        &self.flags
    }

    /// `(name, value)` pairs in canonical feature order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(move |f| (*f, self.value(*f)))
    }
}

fn indicator(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

fn bucket(value: f64, bounds: &[f64; 3]) -> f64 {
    bounds.iter().filter(|bound| value >= **bound).count() as f64
}

/// Derive the feature vector for a record.
pub fn derive(record: &PatientRecord, thresholds: &VitalThresholds) -> FeatureVector {
    let v = &record.vitals;
    let s = &record.symptoms;

    let flags = ClinicalFlags {
        fever: v.temperature >= thresholds.fever_temp,
        fever_high: v.temperature >= thresholds.high_fever_temp,
        tachycardia: v.heart_rate > thresholds.tachycardia_hr,
        bradycardia: v.heart_rate < thresholds.bradycardia_hr,
        hypotension: v.systolic_bp < thresholds.hypotension_systolic
            || v.diastolic_bp < thresholds.hypotension_diastolic,
        hypoxia: v.oxygen_saturation < thresholds.hypoxia_spo2,
        severe_hypoxia: v.oxygen_saturation < thresholds.severe_hypoxia_spo2,
        tachypnea: v.respiratory_rate > thresholds.tachypnea_rr,
        confusion: s.confusion,
    };

    let mut values = vec![0.0; Feature::ALL.len()];
    let mut put = |feature: Feature, value: f64| values[feature.index()] = value;

    put(Feature::Temperature, v.temperature);
    put(Feature::HeartRate, v.heart_rate);
    put(Feature::RespRate, v.respiratory_rate);
    put(Feature::Sbp, v.systolic_bp);
    put(Feature::Dbp, v.diastolic_bp);
    put(Feature::O2Sat, v.oxygen_saturation);
    put(Feature::Age, record.age);
    put(Feature::PainScore, record.pain_score);

    put(Feature::Fever, indicator(flags.fever));
    put(Feature::FeverHigh, indicator(flags.fever_high));
    put(Feature::Tachycardia, indicator(flags.tachycardia));
    put(Feature::Bradycardia, indicator(flags.bradycardia));
    put(Feature::Hypotension, indicator(flags.hypotension));
    put(Feature::Hypoxia, indicator(flags.hypoxia));
    put(Feature::SevereHypoxia, indicator(flags.severe_hypoxia));
    put(Feature::Tachypnea, indicator(flags.tachypnea));

    put(Feature::AgeBucket, bucket(record.age, &AGE_BUCKET_BOUNDS));
    put(Feature::PainBucket, bucket(record.pain_score, &PAIN_BUCKET_BOUNDS));
    put(
        Feature::SymptomCount,
        record.symptom_descriptions().len() as f64,
    );

    put(Feature::SymFever, indicator(s.fever));
    put(Feature::SymCough, indicator(s.cough));
    put(Feature::SymChestPain, indicator(s.chest_pain));
    put(Feature::SymShortnessOfBreath, indicator(s.shortness_of_breath));
    put(Feature::SymFatigue, indicator(s.fatigue));
    put(Feature::SymHeadache, indicator(s.headache));
    put(Feature::SymNausea, indicator(s.nausea));
    put(Feature::SymDizziness, indicator(s.dizziness));
    put(Feature::SymConfusion, indicator(s.confusion));

    FeatureVector { values, flags }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient::fixtures::*;
    use std::str::FromStr;

    fn derive_default(record: &PatientRecord) -> FeatureVector {
        derive(record, &VitalThresholds::default())
    }

    #[test]
    fn healthy_adult_sets_no_flags() {
        let fv = derive_default(&healthy_adult());
        assert_eq!(*fv.flags(), ClinicalFlags::default());
        assert_eq!(fv.value(Feature::AgeBucket), 2.0);
        assert_eq!(fv.value(Feature::PainBucket), 1.0);
        assert_eq!(fv.value(Feature::SymptomCount), 0.0);
        assert_eq!(fv.value(Feature::O2Sat), 99.0);
    }

    #[test]
    fn septic_shock_sets_expected_flags() {
        let fv = derive_default(&septic_shock());
        let flags = fv.flags();
        assert!(flags.fever && flags.fever_high);
        assert!(flags.tachycardia);
        assert!(!flags.bradycardia);
        assert!(flags.hypotension);
        assert!(flags.hypoxia && flags.severe_hypoxia);
        assert!(flags.tachypnea);
        assert!(flags.confusion);
        assert_eq!(flags.critical_count(), 7);
        assert_eq!(fv.value(Feature::AgeBucket), 3.0);
        assert_eq!(fv.value(Feature::PainBucket), 3.0);
        assert_eq!(fv.value(Feature::SymptomCount), 3.0);
        assert_eq!(fv.value(Feature::SymShortnessOfBreath), 1.0);
        assert_eq!(fv.value(Feature::SymCough), 0.0);
    }

    #[test]
    fn thresholds_are_strict_where_documented() {
        let mut record = healthy_adult();
        record.vitals.heart_rate = 100.0;
        record.vitals.systolic_bp = 90.0;
        record.vitals.diastolic_bp = 60.0;
        record.vitals.oxygen_saturation = 95.0;
        record.vitals.respiratory_rate = 20.0;
        record.vitals.temperature = 38.0;
        let flags = *derive_default(&record).flags();
        assert!(!flags.tachycardia);
        assert!(!flags.hypotension);
        assert!(!flags.hypoxia);
        assert!(!flags.tachypnea);
        assert!(flags.fever);
        assert!(!flags.fever_high);
    }

    #[test]
    fn diastolic_alone_triggers_hypotension() {
        let mut record = healthy_adult();
        record.vitals.diastolic_bp = 55.0;
        assert!(derive_default(&record).flags().hypotension);
    }

    #[test]
    fn bradycardia_below_sixty() {
        let mut record = healthy_adult();
        record.vitals.heart_rate = 48.0;
        let flags = *derive_default(&record).flags();
        assert!(flags.bradycardia);
        assert!(!flags.tachycardia);
    }

    #[test]
    fn age_and_pain_bucket_edges() {
        let mut record = healthy_adult();
        let ages = [
            (0.0, 0.0),
            (4.9, 0.0),
            (5.0, 1.0),
            (17.0, 1.0),
            (18.0, 2.0),
            (64.0, 2.0),
            (65.0, 3.0),
        ];
        for (age, expected) in ages {
            record.age = age;
            let bucket = derive_default(&record).value(Feature::AgeBucket);
            assert_eq!(bucket, expected, "age {age}");
        }
        let pains = [
            (0.0, 0.0),
            (1.0, 1.0),
            (3.5, 1.0),
            (4.0, 2.0),
            (6.9, 2.0),
            (7.0, 3.0),
            (10.0, 3.0),
        ];
        for (pain, expected) in pains {
            record.pain_score = pain;
            let bucket = derive_default(&record).value(Feature::PainBucket);
            assert_eq!(bucket, expected, "pain {pain}");
        }
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let mut record = healthy_adult();
        record.vitals.heart_rate = 400.0;
        record.age = 150.0;
        let fv = derive_default(&record);
        assert_eq!(fv.value(Feature::HeartRate), 400.0);
        assert_eq!(fv.value(Feature::Age), 150.0);
    }

    #[test]
    fn nan_vital_leaves_flags_unset() {
        let mut record = healthy_adult();
        record.vitals.oxygen_saturation = f64::NAN;
        let fv = derive_default(&record);
        assert!(!fv.flags().hypoxia);
        assert!(fv.value(Feature::O2Sat).is_nan());
    }

    #[test]
    fn derivation_is_deterministic() {
        for record in [healthy_adult(), septic_shock(), isolated_hypoxia(85.0)] {
            let a = derive_default(&record);
            let b = derive_default(&record);
            let bits_a: Vec<u64> = a.iter().map(|(_, v)| v.to_bits()).collect();
            let bits_b: Vec<u64> = b.iter().map(|(_, v)| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
            assert_eq!(a.flags(), b.flags());
        }
    }

    #[test]
    fn feature_names_parse_back() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_str(feature.as_str()).unwrap(), *feature);
        }
        assert!(Feature::from_str("blood_type").is_err());
    }

    #[test]
    fn free_form_symptoms_count_toward_symptom_count() {
        let mut record = healthy_adult();
        record.symptoms.cough = true;
        record.other_symptoms = vec!["rash".into()];
        assert_eq!(derive_default(&record).value(Feature::SymptomCount), 2.0);
    }

    #[test]
    fn active_flag_names() {
        let fv = derive_default(&isolated_hypoxia(85.0));
        assert_eq!(fv.flags().active(), vec!["hypoxia", "severe_hypoxia"]);
    }
}
