//! Request-to-feature-vector encoding.
//!
//! Reproduces the training-time encoding of one record:
//!
//! 1. normalize categorical text with the frame's rule,
//! 2. place the record after the reference rows (on derived values only),
//! 3. one-hot expand every categorical field over the combined category space,
//! 4. keep the record's row,
//! 5. reindex to the model's expected columns, filling absent ones with 0,
//! 6. coerce to finite numbers, reporting every column that fails.
//!
//! Dummy columns are named `{field}_{category}`; the natural column order is
//! numeric fields in schema order followed by each categorical field's
//! dummies with categories sorted.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::ReferenceFrame;
use crate::error::EncodingError;
use crate::record::RawInputRecord;
use crate::schema::FieldKind;

/// What to do with a categorical value the reference data never saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// No expected dummy column fires; every dummy of the field is 0
    #[default]
    ZeroFill,
    /// Fail with [`EncodingError::UnknownCategory`]
    Reject,
}

/// Numeric row aligned to a model's expected columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedFeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl EncodedFeatureVector {
    /// Column names, identical to the expected list used for encoding.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-width vector.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs, used for diagnostics.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, f64)> {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// Name of the dummy column for `category` of `field`.
#[must_use]
pub fn dummy_column(field: &str, category: &str) -> String {
    format!("{field}_{category}")
}

/// Encoder bound to one reference frame and one expected column list.
///
/// The frame and the column list are shared read-only; every call builds
/// its own candidate row.
///
/// # Examples
///
/// ```
/// use formcast::data::ReferenceFrame;
/// use formcast::encoder::FeatureEncoder;
/// use formcast::record::RawInputRecord;
/// use formcast::schema::{FieldSpec, Schema};
///
/// let schema = Schema::new(
///     vec![FieldSpec::categorical("class"), FieldSpec::numeric("age")],
///     "satisfaction",
/// );
/// let csv = "class,age,satisfaction\nEco,30,no\nBusiness,40,yes\n";
/// let frame = ReferenceFrame::from_reader(csv.as_bytes(), schema).unwrap();
/// let expected = vec![
///     "age".to_string(),
///     "class_Business".to_string(),
///     "class_Eco".to_string(),
/// ];
///
/// let record = RawInputRecord::new().with("class", "business").with("age", 52);
/// let row = FeatureEncoder::new(&frame, &expected).encode(&record).unwrap();
/// assert_eq!(row.values(), &[52.0, 1.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct FeatureEncoder<'a> {
    frame: &'a ReferenceFrame,
    expected: &'a [String],
    policy: UnknownCategoryPolicy,
}

impl<'a> FeatureEncoder<'a> {
    /// Encoder with the default [`UnknownCategoryPolicy::ZeroFill`].
    #[must_use]
    pub fn new(frame: &'a ReferenceFrame, expected: &'a [String]) -> Self {
        Self {
            frame,
            expected,
            policy: UnknownCategoryPolicy::default(),
        }
    }

    /// Sets the unknown-category policy.
    #[must_use]
    pub fn with_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Expected columns this encoder aligns to.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        self.expected
    }

    /// Encodes one record.
    ///
    /// The record should already be validated against the frame's schema.
    /// A numeric field that is absent behaves like a missing cell and is
    /// reported as non-numeric; an absent categorical field activates no
    /// dummy.
    ///
    /// # Errors
    ///
    /// `NonNumericColumn` when an aligned value cannot be coerced to a
    /// finite number; `UnknownCategory` under the `Reject` policy.
    pub fn encode(
        &self,
        record: &RawInputRecord,
    ) -> std::result::Result<EncodedFeatureVector, EncodingError> {
        let space = self.category_space(std::slice::from_ref(record));
        let candidate = self.candidate_row(record, &space)?;
        self.align(&candidate)
    }

    /// Encodes several records appended together, as for an uploaded file.
    ///
    /// # Errors
    ///
    /// The first failing record's error.
    pub fn encode_batch(
        &self,
        records: &[RawInputRecord],
    ) -> std::result::Result<Vec<EncodedFeatureVector>, EncodingError> {
        let space = self.category_space(records);
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                self.candidate_row(record, &space)
                    .and_then(|candidate| self.align(&candidate))
                    .map_err(|e| {
                        log::warn!("encoding failed for uploaded row {i}: {e}");
                        e
                    })
            })
            .collect()
    }

    /// Category space of the reference frame extended with the records'
    /// own (normalized) values, per categorical field.
    fn category_space(&self, records: &[RawInputRecord]) -> Vec<(String, BTreeSet<String>)> {
        let schema = self.frame.schema();
        schema
            .categorical_fields()
            .map(|spec| {
                let mut levels: BTreeSet<String> = self
                    .frame
                    .category_set(&spec.name)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                for record in records {
                    if let Some(value) = record.get(&spec.name) {
                        levels.insert(schema.normalize(&value.to_text()));
                    }
                }
                (spec.name.clone(), levels)
            })
            .collect()
    }

    /// One-hot row of `record` over `space`; `None` marks a value that is
    /// not a finite number.
    fn candidate_row(
        &self,
        record: &RawInputRecord,
        space: &[(String, BTreeSet<String>)],
    ) -> std::result::Result<HashMap<String, Option<f64>>, EncodingError> {
        let schema = self.frame.schema();
        let mut row = HashMap::new();

        for spec in schema.numeric_fields() {
            let value = record.get(&spec.name).and_then(|v| v.as_number());
            row.insert(spec.name.clone(), value);
        }

        for (field, levels) in space {
            let chosen = record
                .get(field)
                .map(|v| schema.normalize(&v.to_text()));

            if let Some(value) = &chosen {
                if self.policy == UnknownCategoryPolicy::Reject
                    && !self.frame.category_set(field).contains(value.as_str())
                {
                    return Err(EncodingError::UnknownCategory {
                        field: field.clone(),
                        value: value.clone(),
                    });
                }
            }

            for level in levels {
                let hot = chosen.as_deref() == Some(level.as_str());
                row.insert(dummy_column(field, level), Some(if hot { 1.0 } else { 0.0 }));
            }
        }

        Ok(row)
    }

    fn align(
        &self,
        candidate: &HashMap<String, Option<f64>>,
    ) -> std::result::Result<EncodedFeatureVector, EncodingError> {
        let mut values = Vec::with_capacity(self.expected.len());
        let mut non_numeric = Vec::new();
        let mut filled = 0usize;

        for column in self.expected {
            match candidate.get(column) {
                Some(Some(x)) => values.push(*x),
                Some(None) => {
                    non_numeric.push(column.clone());
                    values.push(f64::NAN);
                }
                None => {
                    filled += 1;
                    values.push(0.0);
                }
            }
        }

        if !non_numeric.is_empty() {
            return Err(EncodingError::NonNumericColumn {
                columns: non_numeric,
            });
        }

        log::debug!(
            "encoded row: {} expected columns, {} zero-filled, {} candidate columns",
            self.expected.len(),
            filled,
            candidate.len()
        );

        Ok(EncodedFeatureVector {
            columns: self.expected.to_vec(),
            values,
        })
    }
}

/// Encodes one record with the default policy.
///
/// # Errors
///
/// See [`FeatureEncoder::encode`].
pub fn encode(
    record: &RawInputRecord,
    frame: &ReferenceFrame,
    expected: &[String],
) -> std::result::Result<EncodedFeatureVector, EncodingError> {
    FeatureEncoder::new(frame, expected).encode(record)
}

/// Training-time encoding of every reference row.
///
/// # Errors
///
/// `NonNumericColumn` cannot occur for a loaded frame; the signature keeps
/// the encoder's contract.
pub fn encode_frame(
    frame: &ReferenceFrame,
    expected: &[String],
) -> std::result::Result<Vec<EncodedFeatureVector>, EncodingError> {
    let records: Vec<RawInputRecord> = (0..frame.n_rows())
        .filter_map(|i| frame.record(i))
        .collect();
    FeatureEncoder::new(frame, expected).encode_batch(&records)
}

/// Columns a one-hot expansion of the frame alone produces, in natural order.
#[must_use]
pub fn natural_columns(frame: &ReferenceFrame) -> Vec<String> {
    let schema = frame.schema();
    let mut columns: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::Numeric)
        .map(|f| f.name.clone())
        .collect();
    for spec in schema.categorical_fields() {
        columns.extend(
            frame
                .category_set(&spec.name)
                .into_iter()
                .map(|level| dummy_column(&spec.name, level)),
        );
    }
    columns
}

/// Difference between the natural columns and a model's expected columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnAlignment {
    /// Expected by the model but never produced (always zero-filled)
    pub zero_filled: Vec<String>,
    /// Produced by the encoding but ignored by the model
    pub dropped: Vec<String>,
}

impl ColumnAlignment {
    /// True when both sides agree as sets.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.zero_filled.is_empty() && self.dropped.is_empty()
    }
}

/// Compares natural and expected column sets.
#[must_use]
pub fn compare_columns(natural: &[String], expected: &[String]) -> ColumnAlignment {
    ColumnAlignment {
        zero_filled: expected
            .iter()
            .filter(|c| !natural.contains(c))
            .cloned()
            .collect(),
        dropped: natural
            .iter()
            .filter(|c| !expected.contains(c))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
#[path = "encoder_tests.rs"]
mod tests;
