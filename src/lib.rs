//! Formcast: prediction forms over pre-trained tabular models.
//!
//! A form collects one record of feature values, the record is encoded into
//! exactly the feature row the model was trained on, and the model's answer
//! is shaped into a uniform result with either a confidence or a prediction
//! interval.
//!
//! # Quick Start
//!
//! ```
//! use formcast::prelude::*;
//!
//! let schema = Schema::new(
//!     vec![FieldSpec::categorical("class"), FieldSpec::numeric("age")],
//!     "satisfaction",
//! );
//! let csv = "class,age,satisfaction\nEco,30,no\nBusiness,52,yes\n";
//! let frame = ReferenceFrame::from_reader(csv.as_bytes(), schema).unwrap();
//!
//! let model = ModelArtifact::new(
//!     "satisfaction",
//!     vec!["age".to_string(), "class_Business".to_string(), "class_Eco".to_string()],
//!     ArtifactModel::Regressor {
//!         model: RegressionModel::Linear(LinearModel {
//!             coefficients: vec![0.0, 1.0, 0.0],
//!             intercept: 0.0,
//!         }),
//!     },
//! )
//! .unwrap();
//!
//! let record = RawInputRecord::new().with("class", " business ").with("age", 41);
//! let row = encode(&record, &frame, model.expected_feature_names()).unwrap();
//! let result = predict_point(&model, &row, PredictionMode::Point).unwrap();
//! assert_eq!(result.estimate, PointPrediction::Value(1.0));
//! ```
//!
//! # Modules
//!
//! - [`schema`]: field kinds and categorical normalization
//! - [`data`]: the reference dataset
//! - [`record`]: raw input records and CSV uploads
//! - [`encoder`]: one-hot encoding aligned to a model's columns
//! - [`model`]: model artifacts and the [`Predictor`](model::Predictor) trait
//! - [`invoke`]: the prediction boundary
//! - [`stats`]: comparisons against the reference data
//! - [`app`]: form definitions and configuration

pub mod app;
pub mod data;
pub mod encoder;
pub mod error;
pub mod invoke;
pub mod model;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod stats;

pub use error::{FormcastError, Result};
pub use model::Predictor;
