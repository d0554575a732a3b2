//! Subcommands and the state they share.

pub(crate) mod batch;
pub(crate) mod inspect;
pub(crate) mod predict;
pub(crate) mod serve;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use formcast::app::{AppConfig, AppDefinition, AppSource, ComparisonOutcome};
use formcast::data::ReferenceFrame;
use formcast::encoder::{EncodedFeatureVector, FeatureEncoder, UnknownCategoryPolicy};
use formcast::invoke::{self, PredictionMode, PredictionResult};
use formcast::model::ModelArtifact;
use formcast::record::RawInputRecord;
use formcast::{FormcastError, Predictor};
use serde::Serialize;

use crate::error::{CliError, Result};

/// Global options that pick the app, data and model.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    pub config: Option<PathBuf>,
    pub app: Option<String>,
    pub data: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub alpha: Option<f64>,
    pub strict_categories: bool,
    pub assets: Option<PathBuf>,
}

impl Settings {
    /// Config file merged with command-line overrides.
    pub(crate) fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                check_file(path)?;
                AppConfig::load(path)?
            }
            None => AppConfig::default(),
        };
        if let Some(name) = &self.app {
            config.app = AppSource::Builtin(name.clone());
        }
        if let Some(data) = &self.data {
            config.data = Some(data.clone());
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if self.alpha.is_some() {
            config.alpha = self.alpha;
        }
        if self.strict_categories {
            config.unknown_categories = UnknownCategoryPolicy::Reject;
        }
        if let Some(assets) = &self.assets {
            config.assets = Some(assets.clone());
        }
        config.check()?;
        Ok(config)
    }
}

/// Fails with a precise error when `path` is not a readable file.
pub(crate) fn check_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CliError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Loaded app, reference data and model, ready to predict.
#[derive(Debug)]
pub(crate) struct Session {
    pub app: AppDefinition,
    pub frame: ReferenceFrame,
    pub model: ModelArtifact,
    pub policy: UnknownCategoryPolicy,
    pub alpha: Option<f64>,
}

/// Everything shown for one submitted form.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Outcome {
    pub record: RawInputRecord,
    pub vector: EncodedFeatureVector,
    pub result: PredictionResult,
    pub comparisons: Vec<ComparisonOutcome>,
    pub fact: Option<String>,
}

impl Session {
    pub(crate) fn load(settings: &Settings) -> Result<Self> {
        let config = settings.resolve()?;
        let mut app = config.app.resolve()?;
        if let Some(dir) = config.asset_dir() {
            app.resolve_assets(dir);
        }

        let data_path = config.data_path()?;
        check_file(data_path)?;
        let model_path = config.model_path()?;
        check_file(model_path)?;

        let frame = ReferenceFrame::load(data_path, app.schema.clone())?;
        let model = ModelArtifact::load(model_path)?;
        app.check_model(&model)?;
        log::info!(
            "session ready: app '{}', {} reference rows, {} model features",
            app.id,
            frame.n_rows(),
            model.feature_names.len()
        );

        Ok(Self {
            app,
            frame,
            model,
            policy: config.unknown_categories,
            alpha: config.alpha,
        })
    }

    pub(crate) fn encoder(&self) -> FeatureEncoder<'_> {
        FeatureEncoder::new(&self.frame, self.model.expected_feature_names()).with_policy(self.policy)
    }

    /// Task mode with `alpha` falling back to the configured default.
    pub(crate) fn mode(&self, alpha: Option<f64>) -> PredictionMode {
        self.app.task.mode(alpha.or(self.alpha))
    }

    /// Encodes and predicts one validated record.
    pub(crate) fn predict(
        &self,
        record: &RawInputRecord,
        alpha: Option<f64>,
    ) -> Result<(EncodedFeatureVector, PredictionResult)> {
        let vector = self.encoder().encode(record)?;
        let result = invoke::predict_point(&self.model, &vector, self.mode(alpha))?;
        Ok((vector, result))
    }

    /// Parses, predicts and compares one form submission.
    ///
    /// An `alpha` entry in the form overrides the configured level.
    pub(crate) fn submit(&self, form: &HashMap<String, String>) -> Result<Outcome> {
        let alpha = parse_alpha(form.get("alpha").map(String::as_str))?;
        let record = self.app.record_from_form(&self.frame, form)?;
        let (vector, result) = self.predict(&record, alpha)?;
        let comparisons = self.app.compare(&self.frame, &record);
        Ok(Outcome {
            record,
            vector,
            result,
            comparisons,
            fact: self.app.random_fact().map(str::to_string),
        })
    }
}

/// Optional alpha from user text.
pub(crate) fn parse_alpha(raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
            FormcastError::Config(format!("alpha must be a number, got {text:?}")).into()
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use formcast::invoke::PredictionDetail;

    fn diamond_form() -> HashMap<String, String> {
        [
            ("carat", "0.25"),
            ("cut", "Ideal"),
            ("color", "E"),
            ("clarity", "VS1"),
            ("table", "57"),
            ("x", "4.0"),
            ("y", "4.1"),
            ("z", "2.5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_session_load_and_submit() {
        let (_dir, settings) = fixtures::write("diamonds");
        let session = Session::load(&settings).unwrap();
        let outcome = session.submit(&diamond_form()).unwrap();
        match outcome.result.detail {
            PredictionDetail::Interval { alpha, lower, upper } => {
                assert!((alpha - 0.10).abs() < 1e-12);
                assert!(lower <= upper);
            }
            other => panic!("unexpected detail {other:?}"),
        }
        assert!(outcome.fact.is_some());
    }

    #[test]
    fn test_form_alpha_overrides_default() {
        let (_dir, settings) = fixtures::write("diamonds");
        let session = Session::load(&settings).unwrap();
        let mut form = diamond_form();
        form.insert("alpha".to_string(), "0.05".to_string());
        let outcome = session.submit(&form).unwrap();
        assert!(matches!(
            outcome.result.detail,
            PredictionDetail::Interval { alpha, .. } if (alpha - 0.05).abs() < 1e-12
        ));
        form.insert("alpha".to_string(), "wide".to_string());
        assert!(matches!(
            session.submit(&form),
            Err(CliError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_missing_model_file() {
        let (_dir, mut settings) = fixtures::write("diamonds");
        settings.model = Some(PathBuf::from("/nonexistent/model.json"));
        assert!(matches!(
            Session::load(&settings),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_model_without_intervals_rejected() {
        let (dir, mut settings) = fixtures::write("diamonds");
        let path = dir.path().join("airline.json");
        fixtures::airline_model().save(&path).unwrap();
        settings.model = Some(path);
        assert!(matches!(
            Session::load(&settings),
            Err(CliError::ValidationFailed(ref m)) if m.contains("prediction intervals")
        ));
    }

    #[test]
    fn test_strict_categories_override() {
        let settings = Settings {
            strict_categories: true,
            alpha: Some(0.2),
            ..Settings::default()
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.unknown_categories, UnknownCategoryPolicy::Reject);
        assert_eq!(config.alpha, Some(0.2));
    }

    #[test]
    fn test_config_file_with_overrides() {
        let (dir, _settings) = fixtures::write("diamonds");
        let config_path = dir.path().join("formcast.json");
        std::fs::write(
            &config_path,
            r#"{"app": "diamonds", "data": "diamonds.csv", "model": "diamonds.json", "alpha": 0.2}"#,
        )
        .unwrap();
        let from_file = Settings {
            config: Some(config_path),
            ..Settings::default()
        };
        let session = Session::load(&from_file).unwrap();
        assert_eq!(session.alpha, Some(0.2));
        assert_eq!(session.frame.n_rows(), 4);

        let overridden = Settings {
            alpha: Some(0.3),
            ..from_file
        };
        assert_eq!(overridden.resolve().unwrap().alpha, Some(0.3));
    }

    #[test]
    fn test_insight_images_resolve_next_to_data() {
        let (dir, settings) = fixtures::write("diamonds");
        let session = Session::load(&settings).unwrap();
        assert_eq!(session.app.insights.len(), 4);
        assert_eq!(session.app.insights[0].image, dir.path().join("feature_imp.svg"));

        let elsewhere = Settings {
            assets: Some(PathBuf::from("/srv/plots")),
            ..settings
        };
        let session = Session::load(&elsewhere).unwrap();
        assert_eq!(
            session.app.insights[3].image,
            Path::new("/srv/plots/coverage_plot.svg")
        );
    }

    #[test]
    fn test_parse_alpha() {
        assert_eq!(parse_alpha(None).unwrap(), None);
        assert_eq!(parse_alpha(Some(" ")).unwrap(), None);
        assert_eq!(parse_alpha(Some("0.1")).unwrap(), Some(0.1));
        assert!(parse_alpha(Some("ten")).is_err());
    }
}
