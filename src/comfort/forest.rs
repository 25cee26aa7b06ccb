//! Random-forest comfort model.
//!
//! Trees use the flat array layout exported by common tree learners: node `i`
//! is a leaf when `children_left[i] == -1`; otherwise a sample goes left when
//! `x[feature[i]] <= threshold[i]`. `value[i]` holds the class weights seen at
//! the node during training.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::{
    classifier::{ClassPrediction, ComfortModel, ModelLoadError},
    features::FEATURE_COUNT,
};

const LEAF: i64 = -1;

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn validate(&self, tree_index: usize) -> Result<(), ModelLoadError> {
        let shape_err = |msg: String| ModelLoadError::Shape(format!("tree {tree_index}: {msg}"));

        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err(shape_err("tree has no nodes".into()));
        }
        if self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
            || self.value.len() != nodes
        {
            return Err(shape_err("node arrays differ in length".into()));
        }

        for node in 0..nodes {
            let left = self.children_left[node];
            let right = self.children_right[node];

            if left == LEAF {
                let weights = self.value[node];
                let total: f64 = weights.iter().sum();
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || total <= 0.0 {
                    return Err(shape_err(format!("leaf {node} has no usable class weights")));
                }
                continue;
            }

            // Children always follow their parent, which also rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= nodes as i64 {
                    return Err(shape_err(format!("node {node} has invalid child {child}")));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature >= FEATURE_COUNT as i64 {
                return Err(shape_err(format!("node {node} splits on unknown feature {feature}")));
            }
            if self.threshold[node].is_nan() {
                return Err(shape_err(format!("node {node} has a NaN threshold")));
            }
        }

        Ok(())
    }

    /// Normalised class distribution of the leaf `sample` lands in.
    fn leaf_distribution(&self, sample: &[f64; FEATURE_COUNT]) -> Result<[f64; 2]> {
        let mut node = 0usize;
        loop {
            let left = *self
                .children_left
                .get(node)
                .ok_or_else(|| anyhow!("node {node} out of range"))?;

            if left == LEAF {
                let [a, b] = self.value[node];
                let total = a + b;
                return Ok([a / total, b / total]);
            }

            let feature = self.feature[node] as usize;
            node = if sample[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

/// Deserializes only through `RandomForest::new`, so a forest that exists
/// has always passed shape validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ForestDef")]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct ForestDef {
    trees: Vec<DecisionTree>,
}

impl TryFrom<ForestDef> for RandomForest {
    type Error = ModelLoadError;

    fn try_from(def: ForestDef) -> Result<Self, Self::Error> {
        Self::new(def.trees)
    }
}

impl RandomForest {
    pub fn new(trees: Vec<DecisionTree>) -> Result<Self, ModelLoadError> {
        Self { trees }.validated()
    }

    fn validated(self) -> Result<Self, ModelLoadError> {
        if self.trees.is_empty() {
            return Err(ModelLoadError::Shape("forest has no trees".into()));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index)?;
        }
        Ok(self)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl ComfortModel for RandomForest {
    fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<ClassPrediction> {
        if scaled.iter().any(|v| v.is_nan()) {
            return Err(anyhow!("scaled input contains NaN"));
        }

        let mut summed = [0.0f64; 2];
        for tree in &self.trees {
            let [a, b] = tree.leaf_distribution(scaled)?;
            summed[0] += a;
            summed[1] += b;
        }

        let count = self.trees.len() as f64;
        let probabilities = [summed[0] / count, summed[1] / count];
        // Ties resolve to the first class.
        let class = if probabilities[1] > probabilities[0] { 1 } else { 0 };

        Ok(ClassPrediction {
            class,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One split on `feature`: left leaf `left`, right leaf `right`.
    fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, LEAF, LEAF],
            children_right: vec![2, LEAF, LEAF],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![[10.0, 10.0], left, right],
        }
    }

    #[test]
    fn averages_normalised_leaves() {
        let forest = RandomForest::new(vec![
            stump(0, 0.0, [9.0, 1.0], [1.0, 9.0]),
            stump(2, 0.0, [3.0, 1.0], [0.0, 4.0]),
        ])
        .unwrap();

        let below = forest.predict(&[-1.0; FEATURE_COUNT]).unwrap();
        assert_eq!(below.class, 0);
        assert!((below.probabilities[0] - 0.825).abs() < 1e-12);
        assert!((below.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        let above = forest.predict(&[1.0; FEATURE_COUNT]).unwrap();
        assert_eq!(above.class, 1);
        assert!((above.probabilities[1] - 0.95).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        let forest = RandomForest::new(vec![stump(1, 0.5, [1.0, 0.0], [0.0, 1.0])]).unwrap();
        let mut sample = [0.0; FEATURE_COUNT];
        sample[1] = 0.5;
        assert_eq!(forest.predict(&sample).unwrap().class, 0);
    }

    #[test]
    fn rejects_backward_children() {
        let mut tree = stump(0, 0.0, [1.0, 0.0], [0.0, 1.0]);
        tree.children_left[0] = 0;
        assert!(matches!(
            RandomForest::new(vec![tree]),
            Err(ModelLoadError::Shape(_))
        ));
    }

    #[test]
    fn rejects_unknown_feature() {
        let tree = stump(FEATURE_COUNT as i64, 0.0, [1.0, 0.0], [0.0, 1.0]);
        assert!(RandomForest::new(vec![tree]).is_err());
    }

    #[test]
    fn deserializing_runs_shape_validation() {
        let raw = r#"{
            "trees": [{
                "children_left": [0, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.0, -2.0, -2.0],
                "value": [[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]
            }]
        }"#;
        let err = serde_json::from_str::<RandomForest>(raw).unwrap_err();
        assert!(err.to_string().contains("invalid child"));
    }

    #[test]
    fn rejects_empty_forest() {
        assert!(RandomForest::new(Vec::new()).is_err());
    }

    #[test]
    fn nan_input_is_an_invocation_failure() {
        let forest = RandomForest::new(vec![stump(0, 0.0, [1.0, 0.0], [0.0, 1.0])]).unwrap();
        let mut sample = [0.0; FEATURE_COUNT];
        sample[0] = f64::NAN;
        assert!(forest.predict(&sample).is_err());
    }
}
