//! Statistical Classifier Adapter.
//!
//! Loaded once at startup. A missing or invalid artifact does not stop the
//! service: the adapter records why and every `classify` call reports it.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::forest::{Forest, ForestArtifact};
use super::ClassifierError;
use crate::models::ConfidenceLevel;
use crate::pipeline::features::FeatureVector;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

/// Ranked probability distribution over the full taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierOutput {
    pub primary_label: String,
    pub primary_probability: f64,
    /// Every taxonomy label, most probable first. Ties keep taxonomy order.
    pub distribution: Vec<LabelProbability>,
    pub confidence: ConfidenceLevel,
}

impl ClassifierOutput {
    pub(crate) fn from_probabilities(labels: &[String], probabilities: &[f64]) -> Self {
        let mut distribution: Vec<LabelProbability> = labels
            .iter()
            .zip(probabilities)
            .map(|(label, p)| LabelProbability {
                label: label.clone(),
                probability: *p,
            })
            .collect();
        // Stable sort: equal probabilities stay in declaration order.
        distribution.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let (primary_label, primary_probability) = distribution
            .first()
            .map(|lp| (lp.label.clone(), lp.probability))
            .unwrap_or_default();

        Self {
            confidence: ConfidenceLevel::from_probability(primary_probability),
            primary_label,
            primary_probability,
            distribution,
        }
    }

    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.distribution
            .iter()
            .find(|lp| lp.label == label)
            .map(|lp| lp.probability)
    }

    /// Labels after the primary whose probability reaches `min_probability`.
    pub fn alternatives(&self, min_probability: f64) -> Vec<&LabelProbability> {
        self.distribution
            .iter()
            .skip(1)
            .filter(|lp| lp.probability >= min_probability)
            .collect()
    }
}

#[derive(Debug)]
enum AdapterState {
    Loaded(Forest),
    Unavailable { reason: String },
}

/// Summary for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierStatus {
    pub available: bool,
    pub model_path: Option<String>,
    pub tree_count: usize,
    pub feature_count: usize,
    pub reason: Option<String>,
}

#[derive(Debug)]
pub struct ClassifierAdapter {
    state: AdapterState,
    model_path: Option<PathBuf>,
}

impl ClassifierAdapter {
    /// Load the artifact at `path`. Never fails: problems leave the adapter
    /// unavailable with the reason logged.
    pub fn load(path: &Path, taxonomy: &[String]) -> Self {
        let state = match read_forest(path, taxonomy) {
            Ok(forest) => {
                tracing::info!(
                    path = %path.display(),
                    trees = forest.tree_count(),
                    features = forest.feature_names().len(),
                    "Classifier loaded"
                );
                AdapterState::Loaded(forest)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Classifier unavailable");
                AdapterState::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        Self {
            state,
            model_path: Some(path.to_path_buf()),
        }
    }

    pub fn from_forest(forest: Forest) -> Self {
        Self {
            state: AdapterState::Loaded(forest),
            model_path: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: AdapterState::Unavailable {
                reason: reason.into(),
            },
            model_path: None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, AdapterState::Loaded(_))
    }

    pub fn status(&self) -> ClassifierStatus {
        let model_path = self.model_path.as_ref().map(|p| p.display().to_string());
        match &self.state {
            AdapterState::Loaded(forest) => ClassifierStatus {
                available: true,
                model_path,
                tree_count: forest.tree_count(),
                feature_count: forest.feature_names().len(),
                reason: None,
            },
            AdapterState::Unavailable { reason } => ClassifierStatus {
                available: false,
                model_path,
                tree_count: 0,
                feature_count: 0,
                reason: Some(reason.clone()),
            },
        }
    }

    /// Rank the taxonomy for one feature vector. Only fails when no model
    /// is loaded.
    pub fn classify(&self, features: &FeatureVector) -> Result<ClassifierOutput, ClassifierError> {
        match &self.state {
            AdapterState::Loaded(forest) => {
                let probabilities = forest.predict_proba(features);
                Ok(ClassifierOutput::from_probabilities(
                    forest.labels(),
                    &probabilities,
                ))
            }
            AdapterState::Unavailable { reason } => {
                Err(ClassifierError::Unavailable(reason.clone()))
            }
        }
    }
}

fn read_forest(path: &Path, taxonomy: &[String]) -> Result<Forest, ClassifierError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let artifact: ForestArtifact = serde_json::from_str(&raw)?;
    Forest::from_artifact(artifact, taxonomy)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::clinical_config::{ClinicalConfig, VitalThresholds};
    use crate::models::patient::fixtures::*;
    use crate::models::PatientRecord;
    use crate::pipeline::features::derive;

    fn classify(adapter: &ClassifierAdapter, record: &PatientRecord) -> ClassifierOutput {
        adapter
            .classify(&derive(record, &VitalThresholds::default()))
            .unwrap()
    }

    fn assert_valid_distribution(output: &ClassifierOutput) {
        let taxonomy = ClinicalConfig::default().taxonomy;
        assert_eq!(output.distribution.len(), taxonomy.len());
        let total: f64 = output.distribution.iter().map(|lp| lp.probability).sum();
        assert!((total - 1.0).abs() < 1e-6, "sum was {total}");
        assert!(output.distribution.iter().all(|lp| lp.probability >= 0.0));
        let max = output
            .distribution
            .iter()
            .map(|lp| lp.probability)
            .fold(f64::MIN, f64::max);
        assert_eq!(output.primary_probability, max);
        // First label in taxonomy order holding the max.
        let expected = taxonomy
            .iter()
            .find(|label| output.probability_of(label) == Some(max))
            .unwrap();
        assert_eq!(&output.primary_label, expected);
    }

    #[test]
    fn bundled_model_loads() {
        let adapter = bundled_adapter();
        assert!(adapter.is_available(), "{:?}", adapter.status().reason);
        let status = adapter.status();
        assert_eq!(status.tree_count, 3);
        assert!(status.reason.is_none());
    }

    #[test]
    fn septic_patient_ranks_sepsis_first() {
        let output = classify(&bundled_adapter(), &septic_shock());
        assert_valid_distribution(&output);
        assert_eq!(output.primary_label, "Sepsis");
        assert_eq!(output.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn healthy_patient_ranks_other_first() {
        let output = classify(&bundled_adapter(), &healthy_adult());
        assert_valid_distribution(&output);
        assert_eq!(output.primary_label, "Other");
        assert_eq!(output.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn distribution_is_valid_across_presentations() {
        let adapter = bundled_adapter();
        let mut record = healthy_adult();
        for (temp, hr, sbp, spo2, chest, nausea) in [
            (36.5, 55.0, 170.0, 97.0, true, false),
            (38.2, 105.0, 95.0, 92.0, false, true),
            (39.8, 130.0, 80.0, 84.0, true, true),
            (f64::NAN, 80.0, 120.0, 99.0, false, false),
        ] {
            record.vitals.temperature = temp;
            record.vitals.heart_rate = hr;
            record.vitals.systolic_bp = sbp;
            record.vitals.oxygen_saturation = spo2;
            record.symptoms.chest_pain = chest;
            record.symptoms.nausea = nausea;
            assert_valid_distribution(&classify(&adapter, &record));
        }
    }

    #[test]
    fn ties_resolve_in_taxonomy_order() {
        let labels: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let output = ClassifierOutput::from_probabilities(&labels, &[0.2, 0.4, 0.4]);
        assert_eq!(output.primary_label, "B");
        assert_eq!(output.distribution[1].label, "C");
        assert_eq!(output.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn missing_artifact_leaves_adapter_unavailable() {
        let adapter = ClassifierAdapter::load(
            Path::new("/nonexistent/model.json"),
            &ClinicalConfig::default().taxonomy,
        );
        assert!(!adapter.is_available());
        let fv = derive(&healthy_adult(), &VitalThresholds::default());
        assert!(matches!(
            adapter.classify(&fv),
            Err(ClassifierError::Unavailable(_))
        ));
        assert!(adapter.status().reason.unwrap().contains("Cannot read"));
    }

    #[test]
    fn garbage_artifact_leaves_adapter_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"not json").unwrap();
        let adapter = ClassifierAdapter::load(&path, &ClinicalConfig::default().taxonomy);
        assert!(!adapter.is_available());
    }

    #[test]
    fn alternatives_skip_primary() {
        let output = classify(&bundled_adapter(), &septic_shock());
        let alternatives = output.alternatives(0.05);
        assert!(alternatives.iter().all(|lp| lp.label != "Sepsis"));
        assert!(!alternatives.is_empty());
    }
}
