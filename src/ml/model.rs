//! Trainable premium models and the choice between them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ModelError, Result};
use super::forest::{ForestParams, RandomForest};
use super::linear::{LinearRegression, PremiumModel};

/// Which model to train, with its hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    Linear,
    RandomForest(ForestParams),
}

impl Default for ModelSpec {
    fn default() -> Self {
        ModelSpec::RandomForest(ForestParams::default())
    }
}

/// A fitted model of either kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearRegression),
    RandomForest(RandomForest),
}

impl Regressor {
    pub fn fit(spec: &ModelSpec, x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        match spec {
            ModelSpec::Linear => Ok(Regressor::Linear(LinearRegression::fit(x, y)?)),
            ModelSpec::RandomForest(params) => Ok(Regressor::RandomForest(RandomForest::fit(x, y, params)?)),
        }
    }

    /// Number of input features the model expects
    pub fn n_features(&self) -> usize {
        match self {
            Regressor::Linear(model) => model.coefficients.len(),
            Regressor::RandomForest(model) => model.n_features,
        }
    }

    /// Hyper-parameters as a flat JSON map (empty for the linear model)
    pub fn params(&self) -> BTreeMap<String, Value> {
        match self {
            Regressor::Linear(_) => BTreeMap::new(),
            Regressor::RandomForest(model) => match serde_json::to_value(&model.params) {
                Ok(Value::Object(map)) => map.into_iter().collect(),
                _ => BTreeMap::new(),
            },
        }
    }

    /// Per-feature importances, when the model has them
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Regressor::Linear(_) => None,
            Regressor::RandomForest(model) => Some(&model.feature_importances),
        }
    }
}

impl From<LinearRegression> for Regressor {
    fn from(model: LinearRegression) -> Self {
        Regressor::Linear(model)
    }
}

impl From<RandomForest> for Regressor {
    fn from(model: RandomForest) -> Self {
        Regressor::RandomForest(model)
    }
}

impl PremiumModel for Regressor {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        match self {
            Regressor::Linear(model) => model.predict(features),
            Regressor::RandomForest(model) => model.predict(features),
        }
    }

    fn name(&self) -> &str {
        match self {
            Regressor::Linear(model) => model.name(),
            Regressor::RandomForest(model) => model.name(),
        }
    }
}

/// Check a feature matrix against its targets and return the row width
pub(crate) fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if x.len() != y.len() {
        return Err(ModelError::Fit(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }

    let width = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != width) {
        return Err(ModelError::FeatureCountMismatch {
            expected: width,
            found: row.len(),
        });
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_round_trip() {
        let model = Regressor::from(LinearRegression {
            intercept: 1.0,
            coefficients: vec![2.0],
        });
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains(r#""kind":"linear""#));

        let back: Regressor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
        assert_eq!(back.n_features(), 1);
        assert!(back.params().is_empty());
    }

    #[test]
    fn test_forest_params_recorded() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let spec = ModelSpec::RandomForest(ForestParams {
            n_estimators: 3,
            ..Default::default()
        });
        let model = Regressor::fit(&spec, &x, &y).unwrap();

        assert_eq!(model.name(), "RandomForest");
        let params = model.params();
        assert_eq!(params["n_estimators"], Value::from(3));
        assert_eq!(params["min_samples_leaf"], Value::from(2));
        assert_eq!(params["random_state"], Value::from(42));
        assert_eq!(model.feature_importances().map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_default_spec_is_production_forest() {
        assert_eq!(ModelSpec::default(), ModelSpec::RandomForest(ForestParams::default()));
        match ModelSpec::default() {
            ModelSpec::RandomForest(params) => {
                assert_eq!(params.n_estimators, 500);
                assert_eq!(params.min_samples_leaf, 2);
                assert_eq!(params.max_depth, None);
            }
            ModelSpec::Linear => panic!("expected a forest"),
        }
    }

    #[test]
    fn test_check_training_data() {
        assert!(matches!(check_training_data(&[], &[]), Err(ModelError::EmptyDataset)));
        assert!(matches!(check_training_data(&[vec![1.0]], &[1.0, 2.0]), Err(ModelError::Fit(_))));
        assert!(matches!(
            check_training_data(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]),
            Err(ModelError::FeatureCountMismatch { expected: 1, found: 2 })
        ));
        assert_eq!(check_training_data(&[vec![1.0, 2.0]], &[3.0]).unwrap(), 2);
    }
}
