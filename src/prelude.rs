//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use formcast::prelude::*;
//! ```

pub use crate::app::{airline, diamonds, AppConfig, AppDefinition, Task};
pub use crate::data::ReferenceFrame;
pub use crate::encoder::{encode, EncodedFeatureVector, FeatureEncoder, UnknownCategoryPolicy};
pub use crate::error::{EncodingError, FormcastError, PredictionError, RecordError, Result};
pub use crate::invoke::{predict_batch, predict_point, PredictionMode, PredictionResult};
pub use crate::model::{
    ArtifactModel, LinearModel, ModelArtifact, PointPrediction, Predictor, RegressionModel,
};
pub use crate::record::{RawInputRecord, Value};
pub use crate::schema::{CategoryNormalization, FieldSpec, Schema};
