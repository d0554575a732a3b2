//! Reference-data summaries shown next to a prediction.
//!
//! These never feed the model; they tell the user how their input compares
//! with the historical records.

use serde::{Deserialize, Serialize};

use crate::data::ReferenceFrame;
use crate::error::{FormcastError, Result};

/// Percentage of reference rows whose categorical `field` equals `value`
/// after normalization. Unknown fields give 0.
///
/// ```
/// use formcast::data::ReferenceFrame;
/// use formcast::schema::{FieldSpec, Schema};
/// use formcast::stats::category_share;
///
/// let schema = Schema::new(vec![FieldSpec::categorical("class")], "satisfaction");
/// let csv = "class,satisfaction\nEco,a\nEco,b\nBusiness,c\nEco Plus,d\n";
/// let frame = ReferenceFrame::from_reader(csv.as_bytes(), schema).unwrap();
/// assert_eq!(category_share(&frame, "class", "eco"), 50.0);
/// ```
#[must_use]
pub fn category_share(frame: &ReferenceFrame, field: &str, value: &str) -> f64 {
    let Some(column) = frame.categorical(field) else {
        return 0.0;
    };
    if column.is_empty() {
        return 0.0;
    }
    let wanted = frame.schema().normalize(value);
    let hits = column.iter().filter(|c| **c == wanted).count();
    hits as f64 / column.len() as f64 * 100.0
}

/// Left-closed bins `[edge_i, edge_{i+1})` with one label each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBrackets")]
pub struct Brackets {
    edges: Vec<f64>,
    labels: Vec<String>,
}

#[derive(Deserialize)]
struct RawBrackets {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl TryFrom<RawBrackets> for Brackets {
    type Error = FormcastError;

    fn try_from(raw: RawBrackets) -> Result<Self> {
        Self::new(raw.edges, raw.labels)
    }
}

impl Brackets {
    /// Creates brackets from strictly increasing edges.
    ///
    /// # Errors
    ///
    /// `FormcastError::Config` when there is not exactly one label per bin
    /// or the edges are not strictly increasing.
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Result<Self> {
        if edges.len() < 2 || labels.len() != edges.len() - 1 {
            return Err(FormcastError::Config(format!(
                "{} bracket edges need {} labels, got {}",
                edges.len(),
                edges.len().saturating_sub(1),
                labels.len()
            )));
        }
        if edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(FormcastError::Config(
                "bracket edges must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { edges, labels })
    }

    /// Passenger age groups.
    #[must_use]
    pub fn age() -> Self {
        Self {
            edges: vec![0.0, 18.0, 30.0, 45.0, 60.0, 75.0, 100.0],
            labels: ["Under 18", "18–30", "31–45", "46–60", "61–75", "76+"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Bin index containing `x`, if any.
    #[must_use]
    pub fn index_of(&self, x: f64) -> Option<usize> {
        self.edges
            .windows(2)
            .position(|w| w[0] <= x && x < w[1])
    }

    /// Label of the bin containing `x`, if any.
    #[must_use]
    pub fn label_for(&self, x: f64) -> Option<&str> {
        self.index_of(x).map(|i| self.labels[i].as_str())
    }

    /// Bin labels in order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Bracket of a submitted value and the share of reference rows in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketShare {
    /// Bracket label; `None` when the value falls outside every bin
    pub label: Option<String>,
    /// Percentage of reference rows in the same bracket
    pub percent: f64,
}

/// Locates `x` in `brackets` and measures how many reference values of the
/// numeric `field` share its bracket.
#[must_use]
pub fn bracket_share(
    frame: &ReferenceFrame,
    field: &str,
    brackets: &Brackets,
    x: f64,
) -> BracketShare {
    let Some(idx) = brackets.index_of(x) else {
        return BracketShare {
            label: None,
            percent: 0.0,
        };
    };
    let column = frame.numeric(field).unwrap_or_default();
    let percent = if column.is_empty() {
        0.0
    } else {
        let hits = column
            .iter()
            .filter(|v| brackets.index_of(**v) == Some(idx))
            .count();
        hits as f64 / column.len() as f64 * 100.0
    };
    BracketShare {
        label: Some(brackets.labels[idx].clone()),
        percent,
    }
}

/// Bounds and mean of a numeric reference column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
    /// Mean
    pub mean: f64,
}

impl NumericRange {
    /// True when `x` lies within `[min, max]`.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.min <= x && x <= self.max
    }
}

/// Range of a numeric reference column; `None` for unknown or categorical
/// fields.
#[must_use]
pub fn numeric_range(frame: &ReferenceFrame, field: &str) -> Option<NumericRange> {
    let column = frame.numeric(field)?;
    if column.is_empty() {
        return None;
    }
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = column.iter().sum::<f64>() / column.len() as f64;
    Some(NumericRange { min, max, mean })
}
