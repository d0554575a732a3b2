//! Split-conformal prediction intervals.
//!
//! The artifact carries absolute residuals from a held-out calibration set.
//! For miscoverage `alpha` the interval half-width is the residual of rank
//! `ceil((n + 1) * (1 - alpha))`, clamped to `n`.

use serde::{Deserialize, Serialize};

use super::linear::RegressionModel;
use crate::error::{FormcastError, Result};

/// Point regressor wrapped with calibration residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformalRegressor {
    /// Underlying point estimator
    pub model: RegressionModel,
    /// Absolute calibration residuals (sorted ascending after validation)
    pub conformity_scores: Vec<f64>,
}

impl ConformalRegressor {
    /// Half-width of the interval at miscoverage `alpha`.
    ///
    /// Scores must be sorted ascending; validation guarantees this for
    /// loaded artifacts.
    #[must_use]
    pub fn half_width(&self, alpha: f64) -> f64 {
        conformal_quantile(alpha, &self.conformity_scores)
    }

    pub(crate) fn check(&mut self, n_features: usize) -> Result<()> {
        self.model.check(n_features)?;
        if self.conformity_scores.is_empty() {
            return Err(FormcastError::Format(
                "conformal regressor has no conformity scores".to_string(),
            ));
        }
        if self
            .conformity_scores
            .iter()
            .any(|s| !s.is_finite() || *s < 0.0)
        {
            return Err(FormcastError::Format(
                "conformity scores must be finite and non-negative".to_string(),
            ));
        }
        self.conformity_scores.sort_by(f64::total_cmp);
        Ok(())
    }
}

/// Conformal quantile of ascending `scores` at miscoverage `alpha`.
///
/// ```
/// use formcast::model::conformal::conformal_quantile;
///
/// // n = 3, alpha = 0.5: rank ceil(4 * 0.5) = 2
/// assert_eq!(conformal_quantile(0.5, &[1.0, 2.0, 3.0]), 2.0);
/// ```
#[must_use]
pub fn conformal_quantile(alpha: f64, scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let n = scores.len();
    let rank = ((n as f64 + 1.0) * (1.0 - alpha)).ceil() as usize;
    if rank > n {
        log::warn!(
            "alpha {alpha} needs rank {rank} but only {n} calibration scores exist; using the largest"
        );
    }
    let idx = rank.saturating_sub(1).min(n - 1);
    scores[idx]
}
