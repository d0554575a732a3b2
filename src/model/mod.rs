//! Model artifacts and the capability interface the invoker relies on.
//!
//! Models are trained outside this crate. An artifact file holds the
//! ordered feature names the model was trained on plus one of the supported
//! model kinds. JSON is used for `.json` files, bincode for everything else.
//!
//! # Example
//!
//! ```
//! use formcast::model::{ArtifactModel, ModelArtifact, Predictor, PointPrediction};
//! use formcast::model::linear::{LinearModel, RegressionModel};
//!
//! let artifact = ModelArtifact::new(
//!     "price",
//!     vec!["carat".to_string()],
//!     ArtifactModel::Regressor {
//!         model: RegressionModel::Linear(LinearModel {
//!             coefficients: vec![4000.0],
//!             intercept: -200.0,
//!         }),
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(artifact.predict(&[1.0]).unwrap(), PointPrediction::Value(3800.0));
//! assert!(!artifact.capabilities().intervals);
//! ```

pub mod conformal;
pub mod linear;
pub mod tree;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FormcastError, ModelFault, Result};

pub use conformal::ConformalRegressor;
pub use linear::{LinearModel, RegressionModel};
pub use tree::DecisionTreeClassifier;

/// Point output of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointPrediction {
    /// Class label
    Class(String),
    /// Numeric estimate
    Value(f64),
}

impl fmt::Display for PointPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointPrediction::Class(label) => write!(f, "{label}"),
            PointPrediction::Value(x) => write!(f, "{x:.2}"),
        }
    }
}

/// Regression estimate with bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalPrediction {
    /// Point estimate
    pub estimate: f64,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

/// Optional operations a predictor supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// `predict_proba` is available
    pub probabilities: bool,
    /// `predict_with_interval` is available
    pub intervals: bool,
}

/// Everything the invoker needs from a trained model.
///
/// Rows passed in are aligned with [`expected_feature_names`](Self::expected_feature_names).
/// Optional operations default to a fault; implementations advertise what
/// they support through [`capabilities`](Self::capabilities).
pub trait Predictor: Send + Sync {
    /// Ordered feature names the model was trained on.
    fn expected_feature_names(&self) -> &[String];

    /// Point prediction for one row.
    ///
    /// # Errors
    ///
    /// Any failure inside the model.
    fn predict(&self, x: &[f64]) -> std::result::Result<PointPrediction, ModelFault>;

    /// Class probabilities for one row as `(label, probability)` pairs.
    ///
    /// # Errors
    ///
    /// Any failure inside the model, or lack of support.
    fn predict_proba(&self, _x: &[f64]) -> std::result::Result<Vec<(String, f64)>, ModelFault> {
        Err(ModelFault::new("class probabilities are not supported"))
    }

    /// Estimate with a prediction interval at miscoverage `alpha`.
    ///
    /// # Errors
    ///
    /// Any failure inside the model, or lack of support.
    fn predict_with_interval(
        &self,
        _x: &[f64],
        _alpha: f64,
    ) -> std::result::Result<IntervalPrediction, ModelFault> {
        Err(ModelFault::new("prediction intervals are not supported"))
    }

    /// Supported optional operations.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Model kinds an artifact can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactModel {
    /// CART classifier with class-count leaves
    DecisionTreeClassifier(DecisionTreeClassifier),
    /// Point regressor without intervals
    Regressor {
        /// Underlying regressor
        model: RegressionModel,
    },
    /// Point regressor with split-conformal intervals
    ConformalRegressor(ConformalRegressor),
}

impl ArtifactModel {
    /// Short kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactModel::DecisionTreeClassifier(_) => "decision_tree_classifier",
            ArtifactModel::Regressor { .. } => "regressor",
            ArtifactModel::ConformalRegressor(_) => "conformal_regressor",
        }
    }
}

/// A trained model together with its expected feature names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Human-readable name
    pub name: String,
    /// Ordered expected columns
    pub feature_names: Vec<String>,
    /// The model
    pub model: ArtifactModel,
}

impl ModelArtifact {
    /// Builds and validates an artifact.
    ///
    /// # Errors
    ///
    /// `FormcastError::Format` when the parts are inconsistent.
    pub fn new(
        name: impl Into<String>,
        feature_names: Vec<String>,
        model: ArtifactModel,
    ) -> Result<Self> {
        Self {
            name: name.into(),
            feature_names,
            model,
        }
        .validated()
    }

    /// Loads an artifact, choosing JSON for `.json` files and bincode
    /// otherwise.
    ///
    /// # Errors
    ///
    /// I/O and deserialization errors, or `FormcastError::Format` when the
    /// artifact is inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let artifact: Self = if is_json(path) {
            serde_json::from_slice(&bytes)?
        } else {
            bincode::deserialize(&bytes)?
        };
        let artifact = artifact.validated()?;
        log::info!(
            "loaded model artifact '{}' ({}) from {}: {} features",
            artifact.name,
            artifact.model.kind(),
            path.display(),
            artifact.feature_names.len()
        );
        Ok(artifact)
    }

    /// Saves the artifact in the format implied by the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = if is_json(path) {
            serde_json::to_vec_pretty(self)?
        } else {
            bincode::serialize(self)?
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Checks internal consistency and prepares conformity scores.
    ///
    /// # Errors
    ///
    /// `FormcastError::Format` describing the first inconsistency found.
    pub fn validated(mut self) -> Result<Self> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(FormcastError::Format(
                "artifact declares no feature names".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.feature_names.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(FormcastError::Format(format!(
                "duplicate feature name '{dup}'"
            )));
        }
        match &mut self.model {
            ArtifactModel::DecisionTreeClassifier(tree) => tree.check(n)?,
            ArtifactModel::Regressor { model } => model.check(n)?,
            ArtifactModel::ConformalRegressor(reg) => reg.check(n)?,
        }
        Ok(self)
    }

    /// One-line description for inspection output.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.model {
            ArtifactModel::DecisionTreeClassifier(tree) => format!(
                "decision tree classifier (depth {}, classes {:?})",
                tree.depth(),
                tree.classes
            ),
            ArtifactModel::Regressor { model } => model.describe(),
            ArtifactModel::ConformalRegressor(reg) => format!(
                "conformal {} with {} calibration scores",
                reg.model.describe(),
                reg.conformity_scores.len()
            ),
        }
    }

    fn check_width(&self, x: &[f64]) -> std::result::Result<(), ModelFault> {
        if x.len() == self.feature_names.len() {
            Ok(())
        } else {
            Err(ModelFault::new(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                x.len()
            )))
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

impl Predictor for ModelArtifact {
    fn expected_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, x: &[f64]) -> std::result::Result<PointPrediction, ModelFault> {
        self.check_width(x)?;
        Ok(match &self.model {
            ArtifactModel::DecisionTreeClassifier(tree) => {
                PointPrediction::Class(tree.predict_one(x).to_string())
            }
            ArtifactModel::Regressor { model } => PointPrediction::Value(model.predict_one(x)),
            ArtifactModel::ConformalRegressor(reg) => {
                PointPrediction::Value(reg.model.predict_one(x))
            }
        })
    }

    fn predict_proba(&self, x: &[f64]) -> std::result::Result<Vec<(String, f64)>, ModelFault> {
        self.check_width(x)?;
        match &self.model {
            ArtifactModel::DecisionTreeClassifier(tree) => Ok(tree
                .classes
                .iter()
                .cloned()
                .zip(tree.predict_proba_one(x))
                .collect()),
            _ => Err(ModelFault::new("class probabilities are not supported")),
        }
    }

    fn predict_with_interval(
        &self,
        x: &[f64],
        alpha: f64,
    ) -> std::result::Result<IntervalPrediction, ModelFault> {
        self.check_width(x)?;
        match &self.model {
            ArtifactModel::ConformalRegressor(reg) => {
                let estimate = reg.model.predict_one(x);
                let q = reg.half_width(alpha);
                Ok(IntervalPrediction {
                    estimate,
                    lower: estimate - q,
                    upper: estimate + q,
                })
            }
            _ => Err(ModelFault::new("prediction intervals are not supported")),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            probabilities: matches!(self.model, ArtifactModel::DecisionTreeClassifier(_)),
            intervals: matches!(self.model, ArtifactModel::ConformalRegressor(_)),
        }
    }
}
