//! Predict command: one form submission from `--set field=value` pairs.

use std::collections::HashMap;

use colored::Colorize;

use super::{Outcome, Session, Settings};
use crate::error::{CliError, Result};
use crate::output;

/// Splits `field=value`.
pub(crate) fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got {raw:?}")),
    }
}

/// Run the predict command
pub(crate) fn run(
    settings: &Settings,
    assignments: &[(String, String)],
    show_vector: bool,
    json_output: bool,
) -> Result<()> {
    let session = Session::load(settings)?;
    let form: HashMap<String, String> = assignments.iter().cloned().collect();
    if form.is_empty() {
        return Err(CliError::ValidationFailed(
            "no input fields given (use --set FIELD=VALUE)".to_string(),
        ));
    }

    let outcome = session.submit(&form)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&session, &outcome, show_vector);
    }
    Ok(())
}

fn print_outcome(session: &Session, outcome: &Outcome, show_vector: bool) {
    let app = &session.app;
    output::section(&app.title);
    for (field, value) in outcome.record.iter() {
        output::kv(field, value.to_text());
    }

    if show_vector {
        output::section("Encoded Features");
        for (column, value) in outcome.vector.columns().iter().zip(outcome.vector.values()) {
            output::kv(column, value);
        }
    }

    output::section("Prediction Complete");
    let estimate = output::format_estimate(app, &outcome.result.estimate);
    let favorable = match &app.task {
        formcast::app::Task::Classification {
            positive_class: Some(positive),
        } => estimate.eq_ignore_ascii_case(positive),
        _ => true,
    };
    let estimate = if favorable {
        estimate.green().bold()
    } else {
        estimate.red().bold()
    };
    output::kv(&format!("Predicted {}", app.target_label), estimate);
    if let Some(line) = output::detail_line(app, &outcome.result) {
        println!("  {line}");
    }

    for comparison in &outcome.comparisons {
        output::section(&comparison.title);
        output::kv("Your selection", &comparison.selection);
        output::kv(
            "Share of reference records",
            format!("{:.1}%", comparison.percent),
        );
    }

    if let Some(fact) = &outcome.fact {
        println!();
        output::info(&format!("Did you know? {fact}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("cut=Very Good").unwrap(),
            ("cut".to_string(), "Very Good".to_string())
        );
        assert_eq!(
            parse_assignment(" x =4.1").unwrap(),
            ("x".to_string(), "4.1".to_string())
        );
        assert_eq!(
            parse_assignment("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_assignment("carat").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn test_run_requires_fields() {
        let (_dir, settings) = fixtures::write("diamonds");
        assert!(matches!(
            run(&settings, &[], false, false),
            Err(CliError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_run_reports_missing_field() {
        let (_dir, settings) = fixtures::write("diamonds");
        let assignments = vec![("carat".to_string(), "0.3".to_string())];
        let err = run(&settings, &assignments, false, true).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }
}
