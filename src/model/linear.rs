//! Point regressors: ordinary linear models and regression trees.

use serde::{Deserialize, Serialize};

use super::tree::RegressionTreeNode;
use crate::error::{FormcastError, Result};

/// Fitted linear model `y = X·β + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One coefficient per expected feature
    pub coefficients: Vec<f64>,
    /// Intercept term
    pub intercept: f64,
}

impl LinearModel {
    /// Predicted value for one sample.
    #[must_use]
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(b, xi)| b * xi)
            .sum::<f64>()
            + self.intercept
    }

    fn check(&self, n_features: usize) -> Result<()> {
        if self.coefficients.len() != n_features {
            return Err(FormcastError::Format(format!(
                "linear model has {} coefficients but {n_features} features",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|b| !b.is_finite()) {
            return Err(FormcastError::Format(
                "linear model parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Any point regressor an artifact can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionModel {
    /// Linear model
    Linear(LinearModel),
    /// Regression tree with mean-valued leaves
    Tree(RegressionTreeNode),
}

impl RegressionModel {
    /// Predicted value for one sample.
    #[must_use]
    pub fn predict_one(&self, x: &[f64]) -> f64 {
        match self {
            RegressionModel::Linear(model) => model.predict_one(x),
            RegressionModel::Tree(tree) => tree.predict_one(x),
        }
    }

    /// Short description for inspection output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            RegressionModel::Linear(model) => {
                format!("linear ({} coefficients)", model.coefficients.len())
            }
            RegressionModel::Tree(tree) => format!("regression tree (depth {})", tree.depth()),
        }
    }

    pub(crate) fn check(&self, n_features: usize) -> Result<()> {
        match self {
            RegressionModel::Linear(model) => model.check(n_features),
            RegressionModel::Tree(tree) => tree.check(n_features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_predict() {
        let model = LinearModel {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
        };
        assert!((model.predict_one(&[3.0, 1.0]) - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_coefficient_count_checked() {
        let model = RegressionModel::Linear(LinearModel {
            coefficients: vec![1.0, 2.0],
            intercept: 0.0,
        });
        assert!(model.check(2).is_ok());
        let err = model.check(3).unwrap_err();
        assert!(err.to_string().contains("2 coefficients"));
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let model = RegressionModel::Linear(LinearModel {
            coefficients: vec![f64::INFINITY],
            intercept: 0.0,
        });
        assert!(model.check(1).is_err());
    }

    #[test]
    fn test_describe() {
        let model = RegressionModel::Linear(LinearModel {
            coefficients: vec![1.0; 4],
            intercept: 0.0,
        });
        assert_eq!(model.describe(), "linear (4 coefficients)");
    }
}
