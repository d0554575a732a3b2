//! JSON configuration for running a form.
//!
//! ```json
//! {
//!   "app": "diamonds",
//!   "data": "diamonds.csv",
//!   "model": "reg_diamond.json",
//!   "unknown_categories": "reject",
//!   "alpha": 0.05,
//!   "assets": "insights"
//! }
//! ```
//!
//! `app` is either a built-in name or an inline [`AppDefinition`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{builtin, AppDefinition, BUILTIN_APPS};
use crate::encoder::UnknownCategoryPolicy;
use crate::error::{FormcastError, Result};

/// Built-in app name or a full definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppSource {
    /// One of [`BUILTIN_APPS`]
    Builtin(String),
    /// Custom definition
    Inline(Box<AppDefinition>),
}

impl Default for AppSource {
    fn default() -> Self {
        AppSource::Builtin("airline".to_string())
    }
}

impl AppSource {
    /// Resolves and validates the definition.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` for an unknown built-in name or an invalid
    /// definition.
    pub fn resolve(&self) -> Result<AppDefinition> {
        let app = match self {
            AppSource::Builtin(name) => builtin(name).ok_or_else(|| {
                FormcastError::Config(format!(
                    "unknown app '{name}' (built-in apps: {})",
                    BUILTIN_APPS.join(", ")
                ))
            })?,
            AppSource::Inline(app) => (**app).clone(),
        };
        app.validate()?;
        Ok(app)
    }
}

/// Settings shared by every command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Form to run
    #[serde(default)]
    pub app: AppSource,
    /// Reference CSV
    #[serde(default)]
    pub data: Option<PathBuf>,
    /// Model artifact
    #[serde(default)]
    pub model: Option<PathBuf>,
    /// Handling of categories absent from the reference data
    #[serde(default)]
    pub unknown_categories: UnknownCategoryPolicy,
    /// Default miscoverage level for interval forms
    #[serde(default)]
    pub alpha: Option<f64>,
    /// Directory holding insight images
    #[serde(default)]
    pub assets: Option<PathBuf>,
}

impl AppConfig {
    /// Reads a JSON config file. Relative `data`, `model` and `assets`
    /// paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// I/O or JSON errors, or `FormcastError::Config` for an invalid alpha.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        if let Some(dir) = path.parent() {
            for slot in [&mut config.data, &mut config.model, &mut config.assets] {
                if let Some(p) = slot {
                    if p.is_relative() {
                        *p = dir.join(&*p);
                    }
                }
            }
        }
        config.check()?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validates values that serde cannot.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` when alpha lies outside (0, 1).
    pub fn check(&self) -> Result<()> {
        if let Some(alpha) = self.alpha {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(FormcastError::Config(format!(
                    "alpha must lie in (0, 1), got {alpha}"
                )));
            }
        }
        Ok(())
    }

    /// Reference CSV path.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` when none was given.
    pub fn data_path(&self) -> Result<&Path> {
        self.data
            .as_deref()
            .ok_or_else(|| FormcastError::Config("no reference data path given".to_string()))
    }

    /// Model artifact path.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` when none was given.
    pub fn model_path(&self) -> Result<&Path> {
        self.model
            .as_deref()
            .ok_or_else(|| FormcastError::Config("no model artifact path given".to_string()))
    }

    /// Directory that relative insight images are read from: `assets` when
    /// set, otherwise the directory of the reference CSV.
    pub fn asset_dir(&self) -> Option<&Path> {
        self.assets
            .as_deref()
            .or_else(|| self.data.as_deref().and_then(Path::parent))
    }
}
