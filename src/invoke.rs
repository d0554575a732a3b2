//! Model invocation boundary.
//!
//! Every call into a [`Predictor`] goes through [`predict_point`] or
//! [`predict_batch`]. Errors returned by the model and panics raised inside
//! it are both reported as [`PredictionError::ModelInvocationFailed`] with
//! the offending row attached, so one bad request never takes down a
//! serving process.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::encoder::EncodedFeatureVector;
use crate::error::{ModelFault, PredictionError};
use crate::model::Predictor;

pub use crate::model::PointPrediction;

/// Which outputs to request from the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMode {
    /// Label plus confidence from class probabilities
    Classification,
    /// Estimate plus interval at miscoverage `alpha`
    Interval {
        /// Miscoverage level in (0, 1)
        alpha: f64,
    },
    /// Bare point prediction
    Point,
}

/// Extra output beside the point estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionDetail {
    /// Classification confidence
    Confidence {
        /// Highest class probability times 100
        percent: f64,
        /// Full distribution as `(label, probability)`
        probabilities: Vec<(String, f64)>,
    },
    /// Regression interval
    Interval {
        /// Miscoverage level used
        alpha: f64,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },
    /// Nothing beyond the estimate
    None,
}

/// Uniform prediction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Class label or numeric estimate
    pub estimate: PointPrediction,
    /// Confidence or interval
    pub detail: PredictionDetail,
}

impl PredictionResult {
    /// Confidence formatted as a percentage with two decimals.
    ///
    /// ```
    /// use formcast::invoke::{PointPrediction, PredictionDetail, PredictionResult};
    ///
    /// let result = PredictionResult {
    ///     estimate: PointPrediction::Class("satisfied".to_string()),
    ///     detail: PredictionDetail::Confidence { percent: 87.5, probabilities: vec![] },
    /// };
    /// assert_eq!(result.confidence_label().as_deref(), Some("87.50%"));
    /// ```
    #[must_use]
    pub fn confidence_label(&self) -> Option<String> {
        match self.detail {
            PredictionDetail::Confidence { percent, .. } => Some(format!("{percent:.2}%")),
            _ => None,
        }
    }

    /// `(lower, upper)` when an interval was computed.
    #[must_use]
    pub fn interval(&self) -> Option<(f64, f64)> {
        match self.detail {
            PredictionDetail::Interval { lower, upper, .. } => Some((lower, upper)),
            _ => None,
        }
    }
}

/// Predicts one encoded row.
///
/// # Errors
///
/// `InvalidAlpha` for an interval request with alpha outside (0, 1),
/// `Unsupported` when the model lacks the requested capability, and
/// `ModelInvocationFailed` for any failure inside the model.
pub fn predict_point(
    model: &dyn Predictor,
    vector: &EncodedFeatureVector,
    mode: PredictionMode,
) -> Result<PredictionResult, PredictionError> {
    check_mode(model, mode)?;
    invoke(model, vector, mode)
}

/// Predicts every row of an upload, stopping at the first failure.
///
/// # Errors
///
/// See [`predict_point`].
pub fn predict_batch(
    model: &dyn Predictor,
    vectors: &[EncodedFeatureVector],
    mode: PredictionMode,
) -> Result<Vec<PredictionResult>, PredictionError> {
    check_mode(model, mode)?;
    let results = vectors
        .iter()
        .map(|vector| invoke(model, vector, mode))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("predicted {} uploaded rows", results.len());
    Ok(results)
}

fn check_mode(model: &dyn Predictor, mode: PredictionMode) -> Result<(), PredictionError> {
    let caps = model.capabilities();
    match mode {
        PredictionMode::Classification if !caps.probabilities => {
            Err(PredictionError::Unsupported("class probabilities"))
        }
        PredictionMode::Interval { alpha } => {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(PredictionError::InvalidAlpha(alpha));
            }
            if !caps.intervals {
                return Err(PredictionError::Unsupported("prediction intervals"));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn invoke(
    model: &dyn Predictor,
    vector: &EncodedFeatureVector,
    mode: PredictionMode,
) -> Result<PredictionResult, PredictionError> {
    let failed = |message: String| PredictionError::ModelInvocationFailed {
        message,
        vector: vector.to_pairs(),
    };

    if vector.columns() != model.expected_feature_names() {
        return Err(failed(
            "encoded columns differ from the model's expected feature names".to_string(),
        ));
    }

    let x = vector.values();
    let result = guarded(|| match mode {
        PredictionMode::Classification => {
            let estimate = model.predict(x)?;
            let probabilities = model.predict_proba(x)?;
            let best = probabilities
                .iter()
                .map(|(_, p)| *p)
                .fold(f64::NEG_INFINITY, f64::max);
            if !best.is_finite() {
                return Err(ModelFault::new("model returned no usable class probabilities"));
            }
            Ok(PredictionResult {
                estimate,
                detail: PredictionDetail::Confidence {
                    percent: best * 100.0,
                    probabilities,
                },
            })
        }
        PredictionMode::Interval { alpha } => {
            let interval = model.predict_with_interval(x, alpha)?;
            let ordered =
                interval.lower <= interval.estimate && interval.estimate <= interval.upper;
            if !ordered || !interval.estimate.is_finite() {
                return Err(ModelFault::new(format!(
                    "model returned an invalid interval [{}, {}] around {}",
                    interval.lower, interval.upper, interval.estimate
                )));
            }
            Ok(PredictionResult {
                estimate: PointPrediction::Value(interval.estimate),
                detail: PredictionDetail::Interval {
                    alpha,
                    lower: interval.lower,
                    upper: interval.upper,
                },
            })
        }
        PredictionMode::Point => Ok(PredictionResult {
            estimate: model.predict(x)?,
            detail: PredictionDetail::None,
        }),
    });

    match result {
        Ok(prediction) => {
            log::debug!("prediction: {:?}", prediction.estimate);
            Ok(prediction)
        }
        Err(fault) => {
            log::error!("model invocation failed: {fault}");
            Err(failed(fault.0))
        }
    }
}

/// Runs `f`, turning a panic into a fault.
fn guarded<T>(f: impl FnOnce() -> Result<T, ModelFault>) -> Result<T, ModelFault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "model panicked".to_string()
            };
            Err(ModelFault(format!("panic: {message}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReferenceFrame;
    use crate::encoder::encode;
    use crate::model::{Capabilities, IntervalPrediction};
    use crate::record::RawInputRecord;
    use crate::schema::{FieldSpec, Schema};

    /// Test double with configurable behavior.
    struct Stub {
        names: Vec<String>,
        behavior: Behavior,
    }

    enum Behavior {
        Works,
        Fails,
        Panics,
        BadInterval,
    }

    impl Stub {
        fn new(behavior: Behavior) -> Self {
            Self {
                names: vec!["carat".to_string()],
                behavior,
            }
        }
    }

    impl Predictor for Stub {
        fn expected_feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, x: &[f64]) -> Result<PointPrediction, ModelFault> {
            match self.behavior {
                Behavior::Fails => Err(ModelFault::new("booster not loaded")),
                Behavior::Panics => panic!("index out of bounds"),
                _ => Ok(PointPrediction::Value(x[0] * 100.0)),
            }
        }

        fn predict_proba(&self, _x: &[f64]) -> Result<Vec<(String, f64)>, ModelFault> {
            Ok(vec![("no".to_string(), 0.3), ("yes".to_string(), 0.7)])
        }

        fn predict_with_interval(
            &self,
            x: &[f64],
            alpha: f64,
        ) -> Result<IntervalPrediction, ModelFault> {
            let estimate = x[0] * 100.0;
            let half = 10.0 / alpha;
            match self.behavior {
                Behavior::BadInterval => Ok(IntervalPrediction {
                    estimate,
                    lower: estimate + 1.0,
                    upper: estimate + 2.0,
                }),
                _ => Ok(IntervalPrediction {
                    estimate,
                    lower: estimate - half,
                    upper: estimate + half,
                }),
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                probabilities: true,
                intervals: true,
            }
        }
    }

    fn vector(carat: f64) -> EncodedFeatureVector {
        let schema = Schema::new(vec![FieldSpec::numeric("carat")], "price");
        let frame =
            ReferenceFrame::from_reader("carat,price\n0.5,1000\n".as_bytes(), schema).unwrap();
        let record = RawInputRecord::new().with("carat", carat);
        encode(&record, &frame, &["carat".to_string()]).unwrap()
    }

    #[test]
    fn test_classification_confidence() {
        let result = predict_point(
            &Stub::new(Behavior::Works),
            &vector(1.0),
            PredictionMode::Classification,
        )
        .unwrap();
        assert_eq!(result.confidence_label().as_deref(), Some("70.00%"));
        assert!(result.interval().is_none());
    }

    #[test]
    fn test_interval_bounds_and_width() {
        let stub = Stub::new(Behavior::Works);
        let result =
            predict_point(&stub, &vector(2.0), PredictionMode::Interval { alpha: 0.1 }).unwrap();
        let (lower, upper) = result.interval().unwrap();
        assert_eq!(result.estimate, PointPrediction::Value(200.0));
        assert!(lower <= 200.0 && 200.0 <= upper);

        let wider =
            predict_point(&stub, &vector(2.0), PredictionMode::Interval { alpha: 0.05 }).unwrap();
        let (wl, wu) = wider.interval().unwrap();
        assert!(wu - wl >= upper - lower);
    }

    #[test]
    fn test_invalid_alpha() {
        let stub = Stub::new(Behavior::Works);
        for alpha in [0.0, 1.0, -0.2, f64::NAN] {
            let err =
                predict_point(&stub, &vector(1.0), PredictionMode::Interval { alpha }).unwrap_err();
            assert!(matches!(err, PredictionError::InvalidAlpha(_)), "{alpha}");
        }
    }

    #[test]
    fn test_model_error_is_reported_with_vector() {
        let err = predict_point(&Stub::new(Behavior::Fails), &vector(1.5), PredictionMode::Point)
            .unwrap_err();
        assert_eq!(
            err,
            PredictionError::ModelInvocationFailed {
                message: "booster not loaded".to_string(),
                vector: vec![("carat".to_string(), 1.5)],
            }
        );
    }

    #[test]
    fn test_model_panic_is_caught() {
        let err = predict_point(&Stub::new(Behavior::Panics), &vector(1.0), PredictionMode::Point)
            .unwrap_err();
        match err {
            PredictionError::ModelInvocationFailed { message, .. } => {
                assert!(message.contains("index out of bounds"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unordered_interval_rejected() {
        let err = predict_point(
            &Stub::new(Behavior::BadInterval),
            &vector(1.0),
            PredictionMode::Interval { alpha: 0.1 },
        )
        .unwrap_err();
        assert!(matches!(err, PredictionError::ModelInvocationFailed { .. }));
    }

    #[test]
    fn test_column_mismatch_rejected() {
        let mut stub = Stub::new(Behavior::Works);
        stub.names = vec!["depth".to_string()];
        let err = predict_point(&stub, &vector(1.0), PredictionMode::Point).unwrap_err();
        assert!(matches!(err, PredictionError::ModelInvocationFailed { .. }));
    }

    #[test]
    fn test_batch() {
        let stub = Stub::new(Behavior::Works);
        let results = predict_batch(
            &stub,
            &[vector(1.0), vector(3.0)],
            PredictionMode::Point,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].estimate, PointPrediction::Value(300.0));
    }

    #[test]
    fn test_unsupported_capability() {
        use crate::model::linear::{LinearModel, RegressionModel};
        use crate::model::{ArtifactModel, ModelArtifact};

        let artifact = ModelArtifact::new(
            "price",
            vec!["carat".to_string()],
            ArtifactModel::Regressor {
                model: RegressionModel::Linear(LinearModel {
                    coefficients: vec![1.0],
                    intercept: 0.0,
                }),
            },
        )
        .unwrap();
        let err = predict_point(
            &artifact,
            &vector(1.0),
            PredictionMode::Interval { alpha: 0.1 },
        )
        .unwrap_err();
        assert_eq!(err, PredictionError::Unsupported("prediction intervals"));
        let err = predict_point(&artifact, &vector(1.0), PredictionMode::Classification)
            .unwrap_err();
        assert_eq!(err, PredictionError::Unsupported("class probabilities"));
    }
}
