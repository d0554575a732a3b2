//! Raw input records: one prediction request before encoding.
//!
//! A record is built from widget state, CLI arguments, JSON or one row of an
//! uploaded CSV, then validated against the [`Schema`] so that every feature
//! field is present exactly once by name.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::data::is_missing;
use crate::error::{FormcastError, RecordError, Result};
use crate::schema::{FieldKind, Schema};

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Coerces to a finite number, parsing text if needed.
    ///
    /// ```
    /// use formcast::record::Value;
    ///
    /// assert_eq!(Value::from(" 42 ").as_number(), Some(42.0));
    /// assert_eq!(Value::from("n/a").as_number(), None);
    /// assert_eq!(Value::from(f64::NAN).as_number(), None);
    /// ```
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let x = match self {
            Value::Number(x) => *x,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        x.is_finite().then_some(x)
    }

    /// Text form of the value (numbers use their shortest display form).
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Value::Number(x) => x.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(x as f64)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Number(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One request's worth of named feature values.
///
/// # Examples
///
/// ```
/// use formcast::record::RawInputRecord;
/// use formcast::schema::{FieldSpec, Schema};
///
/// let schema = Schema::new(
///     vec![FieldSpec::categorical("class"), FieldSpec::numeric("age")],
///     "satisfaction",
/// );
/// let record = RawInputRecord::new()
///     .with("age", 30)
///     .with("class", "business")
///     .validate(&schema)
///     .expect("complete record");
/// // validation reorders fields into schema order
/// assert_eq!(record.field_names(), vec!["class", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputRecord {
    values: Vec<(String, Value)>,
}

impl RawInputRecord {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    /// Value of a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Field names in current order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.values.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks the record against `schema` and reorders it into schema order.
    ///
    /// # Errors
    ///
    /// `TargetSupplied` if the target column is present, `UnknownField` for
    /// names outside the schema, `NumberForCategory` for a number in a
    /// categorical field, `MissingField` for the first absent feature field.
    pub fn validate(self, schema: &Schema) -> std::result::Result<Self, RecordError> {
        for (name, value) in &self.values {
            if *name == schema.target {
                return Err(RecordError::TargetSupplied(name.clone()));
            }
            let spec = schema
                .field(name)
                .ok_or_else(|| RecordError::UnknownField(name.clone()))?;
            // Labels are matched as text, so a number can never hit a dummy.
            if let (FieldKind::Categorical, Value::Number(x)) = (spec.kind, value) {
                return Err(RecordError::NumberForCategory {
                    field: name.clone(),
                    value: *x,
                });
            }
        }

        let mut values = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            let value = self
                .get(&spec.name)
                .cloned()
                .ok_or_else(|| RecordError::MissingField(spec.name.clone()))?;
            values.push((spec.name.clone(), value));
        }
        Ok(Self { values })
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for RawInputRecord {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}

/// Records parsed from an uploaded CSV, with the original cells kept for
/// echoing back next to the predictions.
#[derive(Debug, Clone)]
pub struct UploadedRecords {
    /// Header row of the upload
    pub headers: Vec<String>,
    /// Complete rows as uploaded
    pub rows: Vec<Vec<String>>,
    /// One validated record per complete row
    pub records: Vec<RawInputRecord>,
}

/// Reads an uploaded CSV into validated records.
///
/// Rows with any missing cell are dropped. Columns outside the schema
/// (including the target) are ignored; numeric cells that do not parse are
/// kept as text so the encoder reports them.
///
/// # Errors
///
/// `RecordError::MissingField` when a schema column is absent from the
/// header, `RecordError::Empty` when no complete row remains, or a CSV error.
pub fn read_uploaded<R: io::Read>(reader: R, schema: &Schema) -> Result<UploadedRecords> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut positions = Vec::with_capacity(schema.fields.len());
    for spec in &schema.fields {
        let idx = headers
            .iter()
            .position(|h| h.trim() == spec.name)
            .ok_or_else(|| RecordError::MissingField(spec.name.clone()))?;
        positions.push((spec, idx));
    }

    let mut rows = Vec::new();
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in reader.records() {
        let row = row?;
        if row.iter().any(is_missing) {
            dropped += 1;
            continue;
        }
        let record: RawInputRecord = positions
            .iter()
            .map(|(spec, idx)| {
                let cell = &row[*idx];
                let value = match spec.kind {
                    FieldKind::Categorical => Value::Text(cell.to_string()),
                    FieldKind::Numeric => match cell.trim().parse::<f64>() {
                        Ok(x) => Value::Number(x),
                        Err(_) => Value::Text(cell.to_string()),
                    },
                };
                (spec.name.clone(), value)
            })
            .collect();
        records.push(record);
        rows.push(row.iter().map(str::to_string).collect());
    }

    if dropped > 0 {
        log::warn!("dropped {dropped} incomplete uploaded rows");
    }
    if records.is_empty() {
        return Err(FormcastError::Record(RecordError::Empty));
    }
    log::debug!("parsed {} uploaded records", records.len());

    Ok(UploadedRecords {
        headers,
        rows,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;

    fn schema() -> Schema {
        Schema::new(
            vec![FieldSpec::categorical("cut"), FieldSpec::numeric("carat")],
            "price",
        )
    }

    #[test]
    fn test_set_replaces_existing() {
        let mut record = RawInputRecord::new().with("carat", 1.0);
        record.set("carat", 2.0);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("carat"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_validate_missing_field() {
        let err = RawInputRecord::new()
            .with("cut", "Ideal")
            .validate(&schema())
            .unwrap_err();
        assert_eq!(err, RecordError::MissingField("carat".to_string()));
    }

    #[test]
    fn test_validate_unknown_field() {
        let err = RawInputRecord::new()
            .with("cut", "Ideal")
            .with("carat", 0.5)
            .with("shine", 3)
            .validate(&schema())
            .unwrap_err();
        assert_eq!(err, RecordError::UnknownField("shine".to_string()));
    }

    #[test]
    fn test_validate_rejects_target() {
        let err = RawInputRecord::new()
            .with("price", 500)
            .validate(&schema())
            .unwrap_err();
        assert_eq!(err, RecordError::TargetSupplied("price".to_string()));
    }

    #[test]
    fn test_validate_rejects_number_for_category() {
        let err = RawInputRecord::new()
            .with("cut", 1.0)
            .with("carat", 0.5)
            .validate(&schema())
            .unwrap_err();
        assert_eq!(
            err,
            RecordError::NumberForCategory {
                field: "cut".to_string(),
                value: 1.0
            }
        );
        assert!(err.to_string().contains("category label"));

        // numeric-looking labels are fine as text
        let record = RawInputRecord::new()
            .with("cut", "1")
            .with("carat", 0.5)
            .validate(&schema())
            .unwrap();
        assert_eq!(record.get("cut"), Some(&Value::Text("1".to_string())));
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(Value::from("1e3").as_number(), Some(1000.0));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from(f64::INFINITY).as_number(), None);
        assert_eq!(Value::from(3).to_text(), "3");
    }

    #[test]
    fn test_value_json_untagged() {
        let record: RawInputRecord =
            serde_json::from_str(r#"[["cut","Ideal"],["carat",0.3]]"#).expect("parse record");
        assert_eq!(record.get("carat"), Some(&Value::Number(0.3)));
        assert_eq!(record.get("cut"), Some(&Value::Text("Ideal".to_string())));
    }

    #[test]
    fn test_read_uploaded_selects_and_drops() {
        let csv = "carat,cut,price,extra\n0.3,Ideal,400,x\n,Good,300,y\n0.5,Premium,,z\n0.7,Fair,900,w\n";
        let uploaded = read_uploaded(csv.as_bytes(), &schema()).expect("read upload");
        // rows 2 and 3 have missing cells
        assert_eq!(uploaded.records.len(), 2);
        assert_eq!(uploaded.rows.len(), 2);
        assert_eq!(uploaded.headers, vec!["carat", "cut", "price", "extra"]);
        assert_eq!(uploaded.records[1].field_names(), vec!["cut", "carat"]);
        assert_eq!(uploaded.records[1].get("carat"), Some(&Value::Number(0.7)));
    }

    #[test]
    fn test_read_uploaded_missing_column() {
        let csv = "carat\n0.3\n";
        let err = read_uploaded(csv.as_bytes(), &schema()).unwrap_err();
        assert!(matches!(
            err,
            FormcastError::Record(RecordError::MissingField(ref f)) if f == "cut"
        ));
    }

    #[test]
    fn test_read_uploaded_keeps_unparseable_numeric_as_text() {
        let csv = "cut,carat\nIdeal,heavy\n";
        let uploaded = read_uploaded(csv.as_bytes(), &schema()).expect("read upload");
        assert_eq!(
            uploaded.records[0].get("carat"),
            Some(&Value::Text("heavy".to_string()))
        );
    }

    #[test]
    fn test_read_uploaded_empty() {
        let csv = "cut,carat\nIdeal,\n";
        let err = read_uploaded(csv.as_bytes(), &schema()).unwrap_err();
        assert!(matches!(err, FormcastError::Record(RecordError::Empty)));
    }
}
