//! Prediction form definitions.
//!
//! An [`AppDefinition`] describes one form end to end: the schema, the
//! widgets that collect each field, the kind of prediction shown, the
//! reference comparisons and optional trivia. Two definitions ship built in
//! ([`airline`] and [`diamonds`]); others can be loaded from JSON.

mod builtin;
pub mod config;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::data::ReferenceFrame;
use crate::error::{FormcastError, RecordError, Result};
use crate::invoke::PredictionMode;
use crate::model::Predictor;
use crate::record::{RawInputRecord, Value};
use crate::schema::{FieldKind, Schema};
use crate::stats::{self, Brackets};

pub use builtin::{airline, builtin, diamonds, BUILTIN_APPS};
pub use config::{AppConfig, AppSource};

/// Lowest star rating.
pub const RATING_MIN: u8 = 1;
/// Highest star rating.
pub const RATING_MAX: u8 = 5;

/// Where a select box gets its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    /// Distinct reference categories in order of first appearance
    Reference,
    /// A fixed ordered list
    Fixed(Vec<String>),
}

/// Initial value of a number input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberDefault {
    /// Reference minimum
    #[default]
    Min,
    /// Reference mean
    Mean,
}

/// Computation for a field the user never enters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedRule {
    /// `numerator / mean(over)` when every `over` input is positive, else 0
    RatioToMean {
        /// Field divided
        numerator: String,
        /// Fields averaged for the divisor
        over: Vec<String>,
    },
}

impl DerivedRule {
    /// Diamond total depth from its dimensions: `z / ((x + y) / 2)`.
    #[must_use]
    pub fn diamond_depth() -> Self {
        DerivedRule::RatioToMean {
            numerator: "z".to_string(),
            over: vec!["x".to_string(), "y".to_string()],
        }
    }

    /// Fields the rule reads.
    #[must_use]
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            DerivedRule::RatioToMean { numerator, over } => std::iter::once(numerator.as_str())
                .chain(over.iter().map(String::as_str))
                .collect(),
        }
    }

    /// Evaluates the rule; `None` when an input is missing.
    #[must_use]
    pub fn evaluate(&self, lookup: impl Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            DerivedRule::RatioToMean { numerator, over } => {
                let top = lookup(numerator)?;
                let parts = over
                    .iter()
                    .map(|f| lookup(f))
                    .collect::<Option<Vec<f64>>>()?;
                if parts.is_empty() || parts.iter().any(|p| *p <= 0.0) {
                    return Some(0.0);
                }
                let mean = parts.iter().sum::<f64>() / parts.len() as f64;
                Some(top / mean)
            }
        }
    }
}

/// One input control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    /// Drop-down over categories
    Select {
        /// Schema field
        field: String,
        /// Question shown to the user
        label: String,
        /// Option list
        options: OptionSource,
    },
    /// Bounded number input
    Number {
        /// Schema field
        field: String,
        /// Question shown to the user
        label: String,
        /// Increment
        step: f64,
        /// Whole numbers only (bounds truncated)
        #[serde(default)]
        integer: bool,
        /// Initial value
        #[serde(default)]
        default: NumberDefault,
    },
    /// 1 to 5 star rating
    Rating {
        /// Schema field
        field: String,
        /// Question shown to the user
        label: String,
    },
    /// Computed from other fields, not shown
    Derived {
        /// Schema field
        field: String,
        /// Computation
        rule: DerivedRule,
    },
}

impl Widget {
    /// Schema field the widget fills.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Widget::Select { field, .. }
            | Widget::Number { field, .. }
            | Widget::Rating { field, .. }
            | Widget::Derived { field, .. } => field,
        }
    }

    fn expected_kind(&self) -> FieldKind {
        match self {
            Widget::Select { .. } => FieldKind::Categorical,
            _ => FieldKind::Numeric,
        }
    }
}

/// A titled group of widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSection {
    /// Heading
    pub title: String,
    /// Short explanation under the heading
    #[serde(default)]
    pub description: String,
    /// Controls in display order
    pub widgets: Vec<Widget>,
}

/// What the form predicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Class label with confidence
    Classification {
        /// Label rendered as the favorable outcome
        #[serde(default)]
        positive_class: Option<String>,
    },
    /// Estimate with a prediction interval
    IntervalRegression {
        /// Smallest selectable alpha
        alpha_min: f64,
        /// Largest selectable alpha
        alpha_max: f64,
        /// Initial alpha
        alpha_default: f64,
        /// Slider increment
        alpha_step: f64,
    },
}

impl Task {
    /// Invocation mode, using the task's default alpha when none is given.
    #[must_use]
    pub fn mode(&self, alpha: Option<f64>) -> PredictionMode {
        match self {
            Task::Classification { .. } => PredictionMode::Classification,
            Task::IntervalRegression { alpha_default, .. } => PredictionMode::Interval {
                alpha: alpha.unwrap_or(*alpha_default),
            },
        }
    }
}

/// A "how do you compare" panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Comparison {
    /// Share of reference rows with the same category
    CategoryShare {
        /// Panel title
        title: String,
        /// Categorical field
        field: String,
    },
    /// Share of reference rows in the same numeric bracket
    Bracket {
        /// Panel title
        title: String,
        /// Numeric field
        field: String,
        /// Bins
        brackets: Brackets,
    },
}

/// Evaluated comparison panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    /// Panel title
    pub title: String,
    /// The user's category or bracket label
    pub selection: String,
    /// Percentage of reference rows sharing it
    pub percent: f64,
}

impl Comparison {
    /// Field compared.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Comparison::CategoryShare { field, .. } | Comparison::Bracket { field, .. } => field,
        }
    }

    /// Compares one record with the reference rows.
    #[must_use]
    pub fn evaluate(&self, frame: &ReferenceFrame, record: &RawInputRecord) -> Option<ComparisonOutcome> {
        let value = record.get(self.field())?;
        match self {
            Comparison::CategoryShare { title, field } => {
                let selection = frame.schema().normalize(&value.to_text());
                Some(ComparisonOutcome {
                    title: title.clone(),
                    percent: stats::category_share(frame, field, &selection),
                    selection,
                })
            }
            Comparison::Bracket {
                title,
                field,
                brackets,
            } => {
                let share = stats::bracket_share(frame, field, brackets, value.as_number()?);
                Some(ComparisonOutcome {
                    title: title.clone(),
                    selection: share.label.unwrap_or_else(|| "outside all groups".to_string()),
                    percent: share.percent,
                })
            }
        }
    }
}

/// Widget with its options and bounds resolved against reference data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum WidgetView {
    /// Drop-down
    Select {
        /// Schema field
        field: String,
        /// Question
        label: String,
        /// Options in display order
        options: Vec<String>,
    },
    /// Number input
    Number {
        /// Schema field
        field: String,
        /// Question
        label: String,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
        /// Initial value
        value: f64,
        /// Increment
        step: f64,
    },
    /// Star rating
    Rating {
        /// Schema field
        field: String,
        /// Question
        label: String,
    },
}

/// Section with resolved widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    /// Heading
    pub title: String,
    /// Explanation
    pub description: String,
    /// Visible widgets
    pub widgets: Vec<WidgetView>,
}

/// One "what can you do with this app" bullet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Bold lead-in
    pub title: String,
    /// Explanation
    pub text: String,
}

/// A figure about the model, produced outside formcast (feature importance,
/// residuals and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Tab heading
    pub title: String,
    /// Image file; relative paths are resolved by [`AppDefinition::resolve_assets`]
    pub image: PathBuf,
    /// Caption under the figure
    #[serde(default)]
    pub caption: String,
}

/// Complete description of one prediction form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDefinition {
    /// Short identifier
    pub id: String,
    /// Page title
    pub title: String,
    /// Subtitle
    #[serde(default)]
    pub tagline: String,
    /// Display name of the predicted quantity
    pub target_label: String,
    /// Prefix for numeric estimates, e.g. a currency sign
    #[serde(default)]
    pub value_prefix: String,
    /// Feature schema
    pub schema: Schema,
    /// Prediction kind
    pub task: Task,
    /// Widget groups
    pub sections: Vec<WidgetSection>,
    /// Comparison panels
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
    /// "Did you know" trivia
    #[serde(default)]
    pub facts: Vec<String>,
    /// Intro bullets
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    /// Model figures
    #[serde(default)]
    pub insights: Vec<Insight>,
}

impl AppDefinition {
    /// All widgets in display order.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.sections.iter().flat_map(|s| s.widgets.iter())
    }

    /// Checks that widgets, comparisons and the task agree with the schema.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let config = |msg: String| FormcastError::Config(format!("app '{}': {msg}", self.id));

        let mut covered: HashMap<&str, usize> = HashMap::new();
        for widget in self.widgets() {
            let spec = self
                .schema
                .field(widget.field())
                .ok_or_else(|| config(format!("widget for unknown field '{}'", widget.field())))?;
            if spec.kind != widget.expected_kind() {
                return Err(config(format!(
                    "widget for '{}' does not match its field kind",
                    spec.name
                )));
            }
            if let Widget::Derived { rule, .. } = widget {
                for input in rule.inputs() {
                    if self.schema.field(input).map(|f| f.kind) != Some(FieldKind::Numeric) {
                        return Err(config(format!(
                            "derived field '{}' reads non-numeric '{input}'",
                            spec.name
                        )));
                    }
                }
            }
            *covered.entry(widget.field()).or_default() += 1;
        }
        for spec in &self.schema.fields {
            match covered.get(spec.name.as_str()).copied() {
                Some(1) => {}
                Some(_) => return Err(config(format!("field '{}' has several widgets", spec.name))),
                None => return Err(config(format!("field '{}' has no widget", spec.name))),
            }
        }

        for comparison in &self.comparisons {
            let expected = match comparison {
                Comparison::CategoryShare { .. } => FieldKind::Categorical,
                Comparison::Bracket { .. } => FieldKind::Numeric,
            };
            if self.schema.field(comparison.field()).map(|f| f.kind) != Some(expected) {
                return Err(config(format!(
                    "comparison on '{}' needs a field of matching kind",
                    comparison.field()
                )));
            }
        }

        if let Task::IntervalRegression {
            alpha_min,
            alpha_max,
            alpha_default,
            alpha_step,
        } = self.task
        {
            let ordered = 0.0 < alpha_min && alpha_min <= alpha_default && alpha_default <= alpha_max;
            if !ordered || alpha_max >= 1.0 || alpha_step <= 0.0 {
                return Err(config(
                    "alpha bounds must satisfy 0 < min <= default <= max < 1 with a positive step"
                        .to_string(),
                ));
            }
        }

        if let Some(insight) = self.insights.iter().find(|i| i.image.as_os_str().is_empty()) {
            return Err(config(format!("insight '{}' has no image", insight.title)));
        }
        Ok(())
    }

    /// Checks that `model` offers what the task needs.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` when a capability is missing.
    pub fn check_model(&self, model: &dyn Predictor) -> Result<()> {
        let caps = model.capabilities();
        let missing = match self.task {
            Task::Classification { .. } if !caps.probabilities => Some("class probabilities"),
            Task::IntervalRegression { .. } if !caps.intervals => Some("prediction intervals"),
            _ => None,
        };
        match missing {
            Some(what) => Err(FormcastError::Config(format!(
                "app '{}' needs a model with {what}",
                self.id
            ))),
            None => Ok(()),
        }
    }

    /// Column names appended to batch output.
    #[must_use]
    pub fn result_columns(&self) -> Vec<String> {
        let target = &self.target_label;
        match self.task {
            Task::Classification { .. } => {
                vec![format!("Predicted {target}"), "Confidence".to_string()]
            }
            Task::IntervalRegression { .. } => vec![
                format!("Predicted {target}"),
                format!("Lower {target} Limit"),
                format!("Upper {target} Limit"),
            ],
        }
    }

    /// Anchors relative insight image paths at `base`.
    ///
    /// ```
    /// use std::path::Path;
    ///
    /// let mut app = formcast::app::diamonds();
    /// app.resolve_assets(Path::new("/srv/diamonds"));
    /// assert_eq!(app.insights[0].image, Path::new("/srv/diamonds/feature_imp.svg"));
    /// ```
    pub fn resolve_assets(&mut self, base: &Path) {
        for insight in &mut self.insights {
            if insight.image.is_relative() {
                insight.image = base.join(&insight.image);
            }
        }
    }

    /// A random fact, if the app has any.
    #[must_use]
    pub fn random_fact(&self) -> Option<&str> {
        self.facts
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Resolves options and bounds of every visible widget.
    #[must_use]
    pub fn sections_view(&self, frame: &ReferenceFrame) -> Vec<SectionView> {
        self.sections
            .iter()
            .map(|section| SectionView {
                title: section.title.clone(),
                description: section.description.clone(),
                widgets: section
                    .widgets
                    .iter()
                    .filter_map(|w| self.widget_view(w, frame))
                    .collect(),
            })
            .collect()
    }

    fn widget_view(&self, widget: &Widget, frame: &ReferenceFrame) -> Option<WidgetView> {
        match widget {
            Widget::Select {
                field,
                label,
                options,
            } => Some(WidgetView::Select {
                field: field.clone(),
                label: label.clone(),
                options: match options {
                    OptionSource::Reference => frame
                        .categories(field)
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    OptionSource::Fixed(list) => list.clone(),
                },
            }),
            Widget::Number {
                field,
                label,
                step,
                integer,
                default,
            } => {
                let (min, max, mean) = number_bounds(frame, field, *integer)?;
                let value = match default {
                    NumberDefault::Min => min,
                    NumberDefault::Mean => mean,
                };
                Some(WidgetView::Number {
                    field: field.clone(),
                    label: label.clone(),
                    min,
                    max,
                    value,
                    step: *step,
                })
            }
            Widget::Rating { field, label } => Some(WidgetView::Rating {
                field: field.clone(),
                label: label.clone(),
            }),
            Widget::Derived { .. } => None,
        }
    }

    /// Builds a record from submitted form fields.
    ///
    /// Extra submitted fields are ignored and derived fields are always
    /// recomputed. Numbers that do not parse are passed through as text so
    /// the encoder reports them.
    ///
    /// # Errors
    ///
    /// `MissingField` for an absent input, `OutOfRange` for a number
    /// outside its widget bounds or a rating outside 1 to 5.
    pub fn record_from_form(
        &self,
        frame: &ReferenceFrame,
        fields: &HashMap<String, String>,
    ) -> std::result::Result<RawInputRecord, RecordError> {
        let mut record = RawInputRecord::new();
        let submitted = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| RecordError::MissingField(name.to_string()))
        };

        for widget in self.widgets() {
            match widget {
                Widget::Select { field, .. } => {
                    record.set(field.clone(), submitted(field)?.as_str());
                }
                Widget::Number { field, integer, .. } => {
                    let raw = submitted(field)?;
                    let value = match raw.trim().parse::<f64>() {
                        Ok(x) if x.is_finite() => {
                            if let Some((min, max, _)) = number_bounds(frame, field, *integer) {
                                if x < min || x > max {
                                    return Err(RecordError::OutOfRange {
                                        field: field.clone(),
                                        value: x,
                                        min,
                                        max,
                                    });
                                }
                            }
                            Value::Number(x)
                        }
                        _ => Value::Text(raw.clone()),
                    };
                    record.set(field.clone(), value);
                }
                Widget::Rating { field, .. } => {
                    let raw = submitted(field)?;
                    let value = match raw.trim().parse::<f64>() {
                        Ok(x) if x.is_finite() => {
                            let (lo, hi) = (f64::from(RATING_MIN), f64::from(RATING_MAX));
                            if x.fract() != 0.0 || x < lo || x > hi {
                                return Err(RecordError::OutOfRange {
                                    field: field.clone(),
                                    value: x,
                                    min: lo,
                                    max: hi,
                                });
                            }
                            Value::Number(x)
                        }
                        _ => Value::Text(raw.clone()),
                    };
                    record.set(field.clone(), value);
                }
                Widget::Derived { .. } => {}
            }
        }

        for widget in self.widgets() {
            if let Widget::Derived { field, rule } = widget {
                let value = rule
                    .evaluate(|name| record.get(name).and_then(Value::as_number))
                    .map_or_else(|| Value::Text(String::new()), Value::Number);
                record.set(field.clone(), value);
            }
        }

        let record = record.validate(&self.schema)?;
        log::debug!("form submission for '{}' parsed into {} fields", self.id, record.len());
        Ok(record)
    }

    /// Evaluates every comparison panel for a record.
    #[must_use]
    pub fn compare(&self, frame: &ReferenceFrame, record: &RawInputRecord) -> Vec<ComparisonOutcome> {
        self.comparisons
            .iter()
            .filter_map(|c| c.evaluate(frame, record))
            .collect()
    }
}

/// `(min, max, mean)` of a number widget; integer widgets truncate bounds.
fn number_bounds(frame: &ReferenceFrame, field: &str, integer: bool) -> Option<(f64, f64, f64)> {
    let range = stats::numeric_range(frame, field)?;
    if integer {
        Some((range.min.trunc(), range.max.trunc(), range.mean.round()))
    } else {
        Some((range.min, range.max, range.mean))
    }
}
