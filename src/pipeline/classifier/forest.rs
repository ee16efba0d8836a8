//! `forest-v1` model artifact: an ensemble of binary decision trees stored
//! as JSON, replacing a pickled scikit-learn random forest.
//!
//! ```json
//! { "format": "forest-v1",
//!   "feature_names": ["o2sat", "..."],
//!   "labels": ["Cardiovascular", "..."],
//!   "trees": [ { "nodes": [
//!       { "kind": "split", "feature": "o2sat", "threshold": 93.5, "left": 1, "right": 2 },
//!       { "kind": "leaf", "distribution": [0.1, 0.9] }, ... ] } ] }
//! ```
//!
//! Node 0 is the root. A split sends `value <= threshold` left. Children
//! always sit at a higher index than their parent, so traversal terminates.

use std::str::FromStr;

use serde::Deserialize;

use super::ClassifierError;
use crate::pipeline::features::{Feature, FeatureVector};

pub const FORMAT_TAG: &str = "forest-v1";

// ═══════════════════════════════════════════════════════════
// On-disk shape
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct ForestArtifact {
    pub format: String,
    pub feature_names: Vec<String>,
    pub labels: Vec<String>,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<NodeArtifact>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeArtifact {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

// ═══════════════════════════════════════════════════════════
// Validated forest
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: Feature,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Normalised to sum to 1.
    Leaf(Vec<f64>),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_for(&self, features: &FeatureVector) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features.value(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf(distribution) => return distribution,
            }
        }
    }
}

/// A loaded, validated ensemble. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Forest {
    labels: Vec<String>,
    feature_names: Vec<Feature>,
    trees: Vec<Tree>,
}

impl Forest {
    /// Validate an artifact against the expected label order.
    pub fn from_artifact(
        artifact: ForestArtifact,
        taxonomy: &[String],
    ) -> Result<Self, ClassifierError> {
        if artifact.format != FORMAT_TAG {
            return Err(ClassifierError::UnsupportedFormat(artifact.format));
        }
        if artifact.labels != taxonomy {
            return Err(ClassifierError::LabelMismatch {
                expected: taxonomy.to_vec(),
                found: artifact.labels,
            });
        }
        if artifact.trees.is_empty() {
            return Err(ClassifierError::EmptyForest);
        }

        let feature_names = artifact
            .feature_names
            .iter()
            .map(|name| {
                Feature::from_str(name).map_err(|_| ClassifierError::UnknownFeature(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let width = taxonomy.len();
        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| compile_tree(t, tree, &feature_names, width))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            labels: artifact.labels,
            feature_names,
            trees,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn feature_names(&self) -> &[Feature] {
        &self.feature_names
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the normalised leaf distributions, renormalised to sum to 1.
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let mut sums = vec![0.0; self.labels.len()];
        for tree in &self.trees {
            for (acc, p) in sums.iter_mut().zip(tree.leaf_for(features)) {
                *acc += p;
            }
        }
        normalise(&mut sums);
        sums
    }
}

fn compile_tree(
    t: usize,
    tree: TreeArtifact,
    declared: &[Feature],
    width: usize,
) -> Result<Tree, ClassifierError> {
    if tree.nodes.is_empty() {
        return Err(ClassifierError::EmptyTree(t));
    }
    let count = tree.nodes.len();
    let mut nodes = Vec::with_capacity(count);

    for (n, node) in tree.nodes.into_iter().enumerate() {
        let compiled = match node {
            NodeArtifact::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let parsed = Feature::from_str(&feature)
                    .ok()
                    .filter(|f| declared.contains(f))
                    .ok_or_else(|| ClassifierError::UnknownFeature(feature.clone()))?;
                if !threshold.is_finite() {
                    return Err(ClassifierError::InvalidNode {
                        tree: t,
                        node: n,
                        detail: "non-finite threshold".into(),
                    });
                }
                for child in [left, right] {
                    if child <= n || child >= count {
                        return Err(ClassifierError::InvalidNode {
                            tree: t,
                            node: n,
                            detail: format!("child index {child} out of order"),
                        });
                    }
                }
                Node::Split {
                    feature: parsed,
                    threshold,
                    left,
                    right,
                }
            }
            NodeArtifact::Leaf { mut distribution } => {
                if distribution.len() != width {
                    return Err(ClassifierError::InvalidNode {
                        tree: t,
                        node: n,
                        detail: format!(
                            "leaf has {} entries, expected {width}",
                            distribution.len()
                        ),
                    });
                }
                if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err(ClassifierError::InvalidNode {
                        tree: t,
                        node: n,
                        detail: "leaf probabilities must be finite and non-negative".into(),
                    });
                }
                normalise(&mut distribution);
                Node::Leaf(distribution)
            }
        };
        nodes.push(compiled);
    }

    Ok(Tree { nodes })
}

/// Scale to sum 1. An all-zero vector becomes uniform.
fn normalise(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    } else if !values.is_empty() {
        let uniform = 1.0 / values.len() as f64;
        values.iter_mut().for_each(|v| *v = uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical_config::VitalThresholds;
    use crate::models::patient::fixtures::*;
    use crate::pipeline::features::derive;

    fn labels() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    fn artifact(json: serde_json::Value) -> ForestArtifact {
        serde_json::from_value(json).unwrap()
    }

    fn o2_stump() -> serde_json::Value {
        serde_json::json!({
            "format": "forest-v1",
            "feature_names": ["o2sat"],
            "labels": ["A", "B"],
            "trees": [{ "nodes": [
                { "kind": "split", "feature": "o2sat", "threshold": 93.5, "left": 1, "right": 2 },
                { "kind": "leaf", "distribution": [1.0, 3.0] },
                { "kind": "leaf", "distribution": [0.0, 0.0] }
            ]}]
        })
    }

    #[test]
    fn split_routes_less_or_equal_left() {
        let forest = Forest::from_artifact(artifact(o2_stump()), &labels()).unwrap();
        let thresholds = VitalThresholds::default();

        let low = derive(&isolated_hypoxia(93.5), &thresholds);
        assert_eq!(forest.predict_proba(&low), vec![0.25, 0.75]);

        let high = derive(&isolated_hypoxia(99.0), &thresholds);
        assert_eq!(forest.predict_proba(&high), vec![0.5, 0.5]);
    }

    #[test]
    fn averages_across_trees() {
        let mut json = o2_stump();
        json["trees"].as_array_mut().unwrap().push(serde_json::json!({
            "nodes": [{ "kind": "leaf", "distribution": [1.0, 0.0] }]
        }));
        let forest = Forest::from_artifact(artifact(json), &labels()).unwrap();
        let fv = derive(&isolated_hypoxia(90.0), &VitalThresholds::default());
        let p = forest.predict_proba(&fv);
        assert!((p[0] - 0.625).abs() < 1e-12);
        assert!((p[1] - 0.375).abs() < 1e-12);
        assert_eq!(forest.tree_count(), 2);
    }

    #[test]
    fn rejects_wrong_format_tag() {
        let mut json = o2_stump();
        json["format"] = "sklearn-pickle".into();
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::UnsupportedFormat(_)));
    }

    #[test]
    fn rejects_label_order_mismatch() {
        let err =
            Forest::from_artifact(artifact(o2_stump()), &["B".into(), "A".into()]).unwrap_err();
        assert!(matches!(err, ClassifierError::LabelMismatch { .. }));
    }

    #[test]
    fn rejects_unknown_feature() {
        let mut json = o2_stump();
        json["feature_names"] = serde_json::json!(["o2sat", "lactate"]);
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::UnknownFeature(name) if name == "lactate"));
    }

    #[test]
    fn rejects_split_on_undeclared_feature() {
        let mut json = o2_stump();
        json["feature_names"] = serde_json::json!(["sbp"]);
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::UnknownFeature(name) if name == "o2sat"));
    }

    #[test]
    fn rejects_backward_child() {
        let mut json = o2_stump();
        json["trees"][0]["nodes"][0]["left"] = 0.into();
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidNode { tree: 0, node: 0, .. }));
    }

    #[test]
    fn rejects_child_past_end() {
        let mut json = o2_stump();
        json["trees"][0]["nodes"][0]["right"] = 7.into();
        assert!(Forest::from_artifact(artifact(json), &labels()).is_err());
    }

    #[test]
    fn rejects_leaf_width_mismatch() {
        let mut json = o2_stump();
        json["trees"][0]["nodes"][1]["distribution"] = serde_json::json!([1.0]);
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidNode { node: 1, .. }));
    }

    #[test]
    fn rejects_negative_probability() {
        let mut json = o2_stump();
        json["trees"][0]["nodes"][1]["distribution"] = serde_json::json!([-1.0, 2.0]);
        assert!(Forest::from_artifact(artifact(json), &labels()).is_err());
    }

    #[test]
    fn rejects_empty_forest() {
        let mut json = o2_stump();
        json["trees"] = serde_json::json!([]);
        let err = Forest::from_artifact(artifact(json), &labels()).unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyForest));
    }
}
