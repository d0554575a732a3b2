//! Output formatting utilities

use colored::Colorize;
use formcast::app::AppDefinition;
use formcast::invoke::{PointPrediction, PredictionDetail, PredictionResult};

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message
pub(crate) fn success(msg: &str) {
    println!("{} {}", "[PASS]".green().bold(), msg);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Print an info message
pub(crate) fn info(msg: &str) {
    println!("{} {}", "[INFO]".blue(), msg);
}

/// Formats `value` with thousands separators and two decimals.
pub(crate) fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac}")
}

/// Amount with the app's prefix, e.g. `$1,234.50`.
pub(crate) fn format_value(app: &AppDefinition, value: f64) -> String {
    format!("{}{}", app.value_prefix, format_amount(value))
}

/// Display form of the point estimate.
pub(crate) fn format_estimate(app: &AppDefinition, estimate: &PointPrediction) -> String {
    match estimate {
        PointPrediction::Class(label) => label.clone(),
        PointPrediction::Value(v) => format_value(app, *v),
    }
}

/// Confidence or interval line, if the result carries one.
pub(crate) fn detail_line(app: &AppDefinition, result: &PredictionResult) -> Option<String> {
    match &result.detail {
        PredictionDetail::Confidence { .. } => result
            .confidence_label()
            .map(|c| format!("Prediction Confidence: {c}")),
        PredictionDetail::Interval {
            alpha,
            lower,
            upper,
        } => Some(format!(
            "Prediction Interval ({:.2}%): [{}, {}]",
            (1.0 - alpha) * 100.0,
            format_value(app, *lower),
            format_value(app, *upper)
        )),
        PredictionDetail::None => None,
    }
}

/// Cells appended to one batch output row, matching
/// [`AppDefinition::result_columns`].
pub(crate) fn result_cells(result: &PredictionResult) -> Vec<String> {
    let estimate = match &result.estimate {
        PointPrediction::Class(label) => label.clone(),
        PointPrediction::Value(v) => format!("{v:.2}"),
    };
    match &result.detail {
        PredictionDetail::Confidence { percent, .. } => vec![estimate, format!("{percent:.2}%")],
        PredictionDetail::Interval { lower, upper, .. } => {
            vec![estimate, format!("{lower:.2}"), format!("{upper:.2}")]
        }
        PredictionDetail::None => vec![estimate],
    }
}
