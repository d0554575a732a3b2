//! Reference dataset: the immutable table behind widget ranges and the
//! one-hot category space.
//!
//! Loading drops every row with a missing cell, normalizes categorical text
//! with the schema's rule, and parses numeric columns. After loading the
//! frame is read-only; encoders work on derived values and never append to
//! it.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::error::{FormcastError, Result};
use crate::record::{RawInputRecord, Value};
use crate::schema::{FieldKind, Schema};

/// Cell spellings treated as missing, matching the usual CSV NA markers.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True when a raw CSV cell denotes a missing value.
///
/// ```
/// use formcast::data::is_missing;
///
/// assert!(is_missing(" NA "));
/// assert!(is_missing(""));
/// assert!(!is_missing("0"));
/// ```
#[must_use]
pub fn is_missing(cell: &str) -> bool {
    NA_MARKERS.contains(&cell.trim())
}

/// Column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Normalized categorical text
    Categorical(Vec<String>),
    /// Parsed numeric values
    Numeric(Vec<f64>),
}

impl ColumnData {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
        }
    }

    /// True when the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, idx: usize) -> Value {
        match self {
            ColumnData::Categorical(v) => Value::Text(v[idx].clone()),
            ColumnData::Numeric(v) => Value::Number(v[idx]),
        }
    }
}

/// The historical table, target column kept apart from the features.
///
/// # Examples
///
/// ```
/// use formcast::data::ReferenceFrame;
/// use formcast::schema::{FieldSpec, Schema};
///
/// let schema = Schema::new(
///     vec![FieldSpec::categorical("class"), FieldSpec::numeric("age")],
///     "satisfaction",
/// );
/// let csv = "class,age,satisfaction\n eco ,30,satisfied\nBusiness,,neutral\n";
/// let frame = ReferenceFrame::from_reader(csv.as_bytes(), schema).expect("load");
/// assert_eq!(frame.n_rows(), 1);
/// assert_eq!(frame.categorical("class"), Some(&["Eco".to_string()][..]));
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    schema: Schema,
    columns: Vec<(String, ColumnData)>,
    target: Vec<String>,
    n_rows: usize,
}

impl ReferenceFrame {
    /// Loads a reference CSV from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a schema column is
    /// missing from the header, or no complete row remains.
    pub fn load<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let frame = Self::from_reader(file, schema)?;
        log::info!(
            "loaded reference data from {}: {} rows, {} feature columns",
            path.display(),
            frame.n_rows,
            frame.columns.len()
        );
        Ok(frame)
    }

    /// Loads a reference CSV from any reader.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_reader<R: io::Read>(reader: R, schema: Schema) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| FormcastError::missing_column(name, &headers))
        };
        let mut positions = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            positions.push(position(&spec.name)?);
        }
        let target_pos = position(&schema.target)?;

        let mut columns: Vec<(String, ColumnData)> = schema
            .fields
            .iter()
            .map(|spec| {
                let data = match spec.kind {
                    FieldKind::Categorical => ColumnData::Categorical(Vec::new()),
                    FieldKind::Numeric => ColumnData::Numeric(Vec::new()),
                };
                (spec.name.clone(), data)
            })
            .collect();
        let mut target = Vec::new();
        let mut incomplete = 0usize;
        let mut unparsed = 0usize;

        'rows: for row in reader.records() {
            let row = row?;
            if row.iter().any(is_missing) {
                incomplete += 1;
                continue;
            }

            // Parse numerics first so a bad cell drops the whole row.
            let mut numbers = Vec::new();
            for (spec, &pos) in schema.fields.iter().zip(&positions) {
                if spec.kind == FieldKind::Numeric {
                    match row[pos].trim().parse::<f64>() {
                        Ok(x) if x.is_finite() => numbers.push(x),
                        _ => {
                            unparsed += 1;
                            continue 'rows;
                        }
                    }
                }
            }

            let mut numbers = numbers.into_iter();
            for ((_, data), &pos) in columns.iter_mut().zip(&positions) {
                match data {
                    ColumnData::Categorical(v) => v.push(schema.normalize(&row[pos])),
                    ColumnData::Numeric(v) => {
                        if let Some(x) = numbers.next() {
                            v.push(x);
                        }
                    }
                }
            }
            target.push(row[target_pos].trim().to_string());
        }

        if incomplete > 0 {
            log::warn!("dropped {incomplete} reference rows with missing values");
        }
        if unparsed > 0 {
            log::warn!("dropped {unparsed} reference rows with non-numeric values in numeric columns");
        }

        let n_rows = target.len();
        if n_rows == 0 {
            return Err(FormcastError::Schema(
                "reference data has no complete rows".to_string(),
            ));
        }

        Ok(Self {
            schema,
            columns,
            target,
            n_rows,
        })
    }

    /// Schema the frame was loaded with.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Feature column names in schema order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns a feature column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    /// Returns a categorical column by name.
    #[must_use]
    pub fn categorical(&self, name: &str) -> Option<&[String]> {
        match self.column(name)? {
            ColumnData::Categorical(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Returns a numeric column by name.
    #[must_use]
    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match self.column(name)? {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Target values as read (trimmed).
    #[must_use]
    pub fn target(&self) -> &[String] {
        &self.target
    }

    /// Distinct categories in order of first appearance.
    #[must_use]
    pub fn categories(&self, name: &str) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.categorical(name)
            .unwrap_or_default()
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Distinct categories in sorted order.
    #[must_use]
    pub fn category_set(&self, name: &str) -> BTreeSet<&str> {
        self.categorical(name)
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect()
    }

    /// Row `idx` as a raw record with the target removed.
    #[must_use]
    pub fn record(&self, idx: usize) -> Option<RawInputRecord> {
        if idx >= self.n_rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(name, data)| (name.clone(), data.value(idx)))
                .collect(),
        )
    }

    /// First `n` rows as raw records (upload preview).
    #[must_use]
    pub fn head(&self, n: usize) -> Vec<RawInputRecord> {
        (0..n.min(self.n_rows))
            .filter_map(|i| self.record(i))
            .collect()
    }

    /// Descriptive statistics for every numeric column.
    #[must_use]
    pub fn describe(&self) -> Vec<ColumnStats> {
        self.columns
            .iter()
            .filter_map(|(name, data)| match data {
                ColumnData::Numeric(v) => Some(ColumnStats::from_values(name, v)),
                ColumnData::Categorical(_) => None,
            })
            .collect()
    }
}

/// Descriptive statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    /// Column name.
    pub name: String,
    /// Number of elements.
    pub count: usize,
    /// Mean value.
    pub mean: f64,
    /// Minimum value.
    pub min: f64,
    /// Median value.
    pub median: f64,
    /// Maximum value.
    pub max: f64,
}

impl ColumnStats {
    fn from_values(name: &str, values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = if count == 0 {
            0.0
        } else {
            sorted.iter().sum::<f64>() / count as f64
        };
        let median = if count == 0 {
            0.0
        } else if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        Self {
            name: name.to_string(),
            count,
            mean,
            min: sorted.first().copied().unwrap_or(0.0),
            median,
            max: sorted.last().copied().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests;
