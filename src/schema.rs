//! Field schema shared by the reference data, raw records and the encoder.
//!
//! The schema is the single authority on which fields are categorical and
//! how their text is canonicalized. Training-time and inference-time text
//! must go through the same [`normalize_category`] call.

use serde::{Deserialize, Serialize};

/// Kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Text field expanded into one-hot dummy columns
    Categorical,
    /// Numeric field passed through unchanged
    Numeric,
}

/// Canonical text form applied to categorical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryNormalization {
    /// Trim surrounding whitespace, then title-case every word
    #[default]
    TitleCase,
    /// Trim surrounding whitespace only (for code-like labels such as `VS1`)
    Trim,
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name as it appears in the CSV header
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Categorical field.
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Categorical,
        }
    }

    /// Numeric field.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric,
        }
    }
}

/// Ordered feature fields plus the target column.
///
/// # Examples
///
/// ```
/// use formcast::schema::{FieldSpec, Schema};
///
/// let schema = Schema::new(
///     vec![FieldSpec::categorical("class"), FieldSpec::numeric("age")],
///     "satisfaction",
/// );
/// assert_eq!(schema.categorical_fields().count(), 1);
/// assert!(schema.field("age").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Feature fields in table order
    pub fields: Vec<FieldSpec>,
    /// Target (label) column, never an input
    pub target: String,
    /// Canonical form for categorical text
    #[serde(default)]
    pub normalization: CategoryNormalization,
}

impl Schema {
    /// Create a schema with title-case normalization.
    pub fn new(fields: Vec<FieldSpec>, target: impl Into<String>) -> Self {
        Self {
            fields,
            target: target.into(),
            normalization: CategoryNormalization::TitleCase,
        }
    }

    /// Override the categorical normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: CategoryNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Looks up a feature field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Categorical fields in table order.
    pub fn categorical_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Categorical)
    }

    /// Numeric fields in table order.
    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Numeric)
    }

    /// Normalizes a categorical value with this schema's rule.
    #[must_use]
    pub fn normalize(&self, value: &str) -> String {
        normalize_category(value, self.normalization)
    }
}

/// Canonicalizes categorical text.
///
/// Title case follows the classic rule: a cased character is upper-cased
/// when the preceding character is not cased, and lower-cased otherwise.
/// `"eco plus"` becomes `"Eco Plus"`, `"on-board"` becomes `"On-Board"`.
/// Applying it twice gives the same text as applying it once.
///
/// ```
/// use formcast::schema::{normalize_category, CategoryNormalization};
///
/// let once = normalize_category("  business ", CategoryNormalization::TitleCase);
/// assert_eq!(once, "Business");
/// assert_eq!(normalize_category(&once, CategoryNormalization::TitleCase), once);
/// ```
#[must_use]
pub fn normalize_category(value: &str, normalization: CategoryNormalization) -> String {
    let trimmed = value.trim();
    match normalization {
        CategoryNormalization::Trim => trimmed.to_string(),
        CategoryNormalization::TitleCase => title_case(trimmed),
    }
}

fn is_cased(c: char) -> bool {
    c.is_lowercase() || c.is_uppercase()
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Casing state tracks the emitted text, not the input.
    let mut previous_is_cased = false;
    for c in s.chars() {
        let mapped: Vec<char> = if previous_is_cased {
            c.to_lowercase().collect()
        } else {
            c.to_uppercase().collect()
        };
        for (i, m) in mapped.into_iter().enumerate() {
            // Multi-letter uppercase forms keep only their first letter
            // upper: "ß" becomes "Ss", "ﬁ" becomes "Fi".
            let next: Vec<char> = match (i, previous_is_cased) {
                (0, _) => vec![m],
                (_, true) => m.to_lowercase().collect(),
                (_, false) => m.to_uppercase().collect(),
            };
            for n in next {
                out.push(n);
                previous_is_cased = is_cased(n);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_words() {
        assert_eq!(title_case("eco plus"), "Eco Plus");
        assert_eq!(title_case("LOYAL CUSTOMER"), "Loyal Customer");
        assert_eq!(title_case("personal travel"), "Personal Travel");
    }

    #[test]
    fn test_title_case_after_non_letters() {
        assert_eq!(title_case("on-board"), "On-Board");
        assert_eq!(title_case("vs1"), "Vs1");
        assert_eq!(title_case("a1b"), "A1B");
    }

    #[test]
    fn test_title_case_multi_letter_uppercase() {
        assert_eq!(title_case("ﬁrst class"), "First Class");
        assert_eq!(title_case("ßtraße"), "Sstraße");
    }

    #[test]
    fn test_title_case_is_stable_on_unicode() {
        for raw in ["ﬁrst class", "straße", "ǆungla", "ǅungla", "İstanbul İzmir", "ŉa", "ΐx", "ᾳb", "aİb"] {
            let once = title_case(raw);
            assert_eq!(title_case(&once), once, "{raw:?}");
        }
    }

    #[test]
    fn test_normalize_trims_before_casing() {
        assert_eq!(
            normalize_category("\t business \n", CategoryNormalization::TitleCase),
            "Business"
        );
    }

    #[test]
    fn test_trim_keeps_codes() {
        assert_eq!(normalize_category(" VS1 ", CategoryNormalization::Trim), "VS1");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_category("   ", CategoryNormalization::TitleCase), "");
    }

    #[test]
    fn test_schema_partitions_fields() {
        let schema = Schema::new(
            vec![
                FieldSpec::categorical("cut"),
                FieldSpec::numeric("carat"),
                FieldSpec::categorical("color"),
            ],
            "price",
        );
        let cats: Vec<_> = schema.categorical_fields().map(|f| f.name.as_str()).collect();
        let nums: Vec<_> = schema.numeric_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(cats, vec!["cut", "color"]);
        assert_eq!(nums, vec!["carat"]);
        assert!(schema.field("price").is_none());
    }

    #[test]
    fn test_schema_json_defaults_normalization() {
        let json = r#"{"fields":[{"name":"class","kind":"categorical"}],"target":"y"}"#;
        let schema: Schema = serde_json::from_str(json).expect("parse schema");
        assert_eq!(schema.normalization, CategoryNormalization::TitleCase);
        assert_eq!(schema.fields[0].kind, FieldKind::Categorical);
    }
}
