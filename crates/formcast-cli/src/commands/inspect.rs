//! Inspect command: what the app, reference data and model look like, and
//! how the model's expected columns line up with the data.

use formcast::data::ColumnStats;
use formcast::encoder::{self, ColumnAlignment};
use formcast::record::RawInputRecord;
use formcast::Predictor;
use serde::Serialize;

use super::{Session, Settings};
use crate::error::Result;
use crate::output;

/// Inspection report for JSON output
#[derive(Serialize)]
struct InspectResult {
    app: String,
    title: String,
    reference_rows: usize,
    numeric: Vec<ColumnStats>,
    categories: Vec<CategoryInfo>,
    model: ModelInfo,
    alignment: ColumnAlignment,
    insights: Vec<InsightInfo>,
    preview: Vec<RawInputRecord>,
}

#[derive(Serialize)]
struct InsightInfo {
    title: String,
    image: String,
    available: bool,
}

#[derive(Serialize)]
struct CategoryInfo {
    field: String,
    levels: Vec<String>,
}

#[derive(Serialize)]
struct ModelInfo {
    name: String,
    kind: &'static str,
    description: String,
    feature_count: usize,
    probabilities: bool,
    intervals: bool,
}

fn collect(session: &Session, head: usize) -> InspectResult {
    let frame = &session.frame;
    let expected = session.model.expected_feature_names();
    let natural = encoder::natural_columns(frame);
    let caps = session.model.capabilities();

    InspectResult {
        app: session.app.id.clone(),
        title: session.app.title.clone(),
        reference_rows: frame.n_rows(),
        numeric: frame.describe(),
        categories: frame
            .schema()
            .categorical_fields()
            .map(|spec| CategoryInfo {
                field: spec.name.clone(),
                levels: frame.categories(&spec.name).into_iter().map(str::to_string).collect(),
            })
            .collect(),
        model: ModelInfo {
            name: session.model.name.clone(),
            kind: session.model.model.kind(),
            description: session.model.describe(),
            feature_count: expected.len(),
            probabilities: caps.probabilities,
            intervals: caps.intervals,
        },
        alignment: encoder::compare_columns(&natural, expected),
        insights: session
            .app
            .insights
            .iter()
            .map(|insight| InsightInfo {
                title: insight.title.clone(),
                image: insight.image.display().to_string(),
                available: insight.image.is_file(),
            })
            .collect(),
        preview: frame.head(head),
    }
}

/// Run the inspect command
pub(crate) fn run(settings: &Settings, head: usize, json_output: bool) -> Result<()> {
    let session = Session::load(settings)?;
    let report = collect(&session, head);
    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output_text(&report);
    }
    Ok(())
}

fn output_text(report: &InspectResult) {
    output::section(&report.title);
    output::kv("App", &report.app);
    output::kv("Reference rows", report.reference_rows);

    output::section("Numeric Fields");
    for stats in &report.numeric {
        println!(
            "  {:<36} min {:>10.2}  median {:>10.2}  mean {:>10.2}  max {:>10.2}",
            stats.name, stats.min, stats.median, stats.mean, stats.max
        );
    }

    output::section("Categorical Fields");
    for info in &report.categories {
        output::kv(&info.field, info.levels.join(", "));
    }

    output::section("Model");
    output::kv("Name", &report.model.name);
    output::kv("Kind", report.model.kind);
    output::kv("Description", &report.model.description);
    output::kv("Expected features", report.model.feature_count);
    output::kv("Class probabilities", report.model.probabilities);
    output::kv("Prediction intervals", report.model.intervals);

    output::section("Column Alignment");
    if report.alignment.is_exact() {
        output::success("model columns match the reference encoding");
    }
    for column in &report.alignment.zero_filled {
        output::warning(&format!("{column}: expected by the model, always 0"));
    }
    for column in &report.alignment.dropped {
        output::info(&format!("{column}: produced by the data, ignored by the model"));
    }

    if !report.insights.is_empty() {
        output::section("Model Insights");
        for insight in &report.insights {
            if insight.available {
                output::kv(&insight.title, &insight.image);
            } else {
                output::warning(&format!("{}: {} not found", insight.title, insight.image));
            }
        }
    }

    if !report.preview.is_empty() {
        output::section("Preview");
        for record in &report.preview {
            let cells: Vec<String> = record.iter().map(|(_, v)| v.to_text()).collect();
            println!("  {}", cells.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_collect_diamonds() {
        let (_dir, settings) = fixtures::write("diamonds");
        let session = Session::load(&settings).unwrap();
        let report = collect(&session, 2);
        assert_eq!(report.reference_rows, 4);
        assert_eq!(report.preview.len(), 2);
        assert_eq!(report.model.kind, "conformal_regressor");
        assert!(report.model.intervals);
        assert!(report.alignment.is_exact());
        let cut = report.categories.iter().find(|c| c.field == "cut").unwrap();
        assert_eq!(cut.levels, vec!["Ideal", "Premium", "Good"]);
        assert_eq!(report.insights.len(), 4);
        assert!(report.insights.iter().all(|i| !i.available));
    }

    #[test]
    fn test_collect_finds_insight_images() {
        let (dir, settings) = fixtures::write("diamonds");
        std::fs::write(dir.path().join("feature_imp.svg"), "<svg/>").unwrap();
        let session = Session::load(&settings).unwrap();
        let report = collect(&session, 0);
        assert_eq!(report.insights[0].title, "Feature Importance");
        assert!(report.insights[0].available);
        assert!(!report.insights[1].available);
    }

    #[test]
    fn test_collect_reports_zero_filled_columns() {
        let (_dir, mut settings) = fixtures::write("airline");
        let dir = settings.model.as_ref().unwrap().parent().unwrap().to_path_buf();
        let mut model = fixtures::airline_model();
        model.feature_names.push("class_Eco Plus".to_string());
        model.feature_names.retain(|c| c != "customer_type_Disloyal Customer");
        let path = dir.join("wider.json");
        std::fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();
        settings.model = Some(path);

        let session = Session::load(&settings).unwrap();
        let report = collect(&session, 5);
        assert_eq!(report.alignment.zero_filled, vec!["class_Eco Plus"]);
        assert_eq!(report.alignment.dropped, vec!["customer_type_Disloyal Customer"]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kind\":\"decision_tree_classifier\""));
    }
}
