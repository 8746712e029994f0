//! Ordinary least squares regression of the premium on the loan features

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::error::{ModelError, Result};
use super::model::check_training_data;

/// Singular values below this are treated as zero when solving
const SVD_EPSILON: f64 = 1e-12;

/// Anything that maps a feature vector to a premium estimate
pub trait PremiumModel {
    /// Predict a monthly premium from features in training order
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Short model name for reports
    fn name(&self) -> &str;

    /// Predict every row of a feature matrix
    fn predict_many(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// Linear model `y = intercept + coefficients . x`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    /// Fit by least squares. Every row of `x` must have the same width.
    pub fn fit(x: &[Vec<f64>], y: &[f64]) -> Result<Self> {
        let width = check_training_data(x, y)?;

        let parameters = width + 1;
        if x.len() <= parameters {
            return Err(ModelError::InsufficientData {
                rows: x.len(),
                parameters,
            });
        }

        // Leading column of ones carries the intercept
        let design = DMatrix::from_fn(x.len(), parameters, |r, c| if c == 0 { 1.0 } else { x[r][c - 1] });
        let target = DVector::from_column_slice(y);

        let solution = design
            .svd(true, true)
            .solve(&target, SVD_EPSILON)
            .map_err(|e| ModelError::Fit(e.to_string()))?;

        if solution.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Fit("non-finite coefficients".to_string()));
        }

        Ok(Self {
            intercept: solution[0],
            coefficients: solution.iter().skip(1).copied().collect(),
        })
    }
}

impl PremiumModel for LinearRegression {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::FeatureCountMismatch {
                expected: self.coefficients.len(),
                found: features.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    fn name(&self) -> &str {
        "LinearRegression"
    }
}
