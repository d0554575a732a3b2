//! HTML pages served by `formcast serve`.
//!
//! Pages are plain server-rendered HTML with inline styles; every value that
//! came from a user, the reference data or an app definition is escaped.

use std::fmt::Write;

use formcast::app::{AppDefinition, SectionView, Task, WidgetView, RATING_MAX, RATING_MIN};
use formcast::invoke::{PointPrediction, PredictionResult};
use formcast::record::{RawInputRecord, UploadedRecords};

use crate::commands::Outcome;
use crate::output;

/// Escapes text for HTML element content and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
fieldset{margin-bottom:1rem;border:1px solid #ccc;border-radius:8px}\
label{display:block;margin:.6rem 0 .2rem}\
.box{background-color:#e6f0ff;padding:10px;border-radius:8px;border:1px solid #99c2ff;width:fit-content}\
.fact{background-color:#fff8e1;padding:10px;border-radius:8px;border:1px solid #ffd54f}\
.error{background-color:#fdecea;padding:10px;border-radius:8px;border:1px solid #f5c6cb}\
details{margin:.4rem 0}details img{max-width:100%}.caption{color:#555;font-size:.9rem}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px;text-align:right}";

fn page(app: &AppDefinition, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p><b>{tagline}</b></p>\n{body}\n</body>\n</html>\n",
        title = escape(&app.title),
        tagline = escape(&app.tagline),
    )
}

/// Collapsible list of what the app offers.
fn highlights_html(app: &AppDefinition) -> String {
    if app.highlights.is_empty() {
        return String::new();
    }
    let mut html =
        String::from("<details>\n<summary><b>What can you do with this app?</b></summary>\n<ul>\n");
    for highlight in &app.highlights {
        let _ = writeln!(
            html,
            "<li><b>{}</b>: {}</li>",
            escape(&highlight.title),
            escape(&highlight.text)
        );
    }
    html.push_str("</ul>\n</details>\n");
    html
}

/// One collapsible panel per insight image. Images are fetched from
/// `/insights/{index}`.
fn insights_html(app: &AppDefinition) -> String {
    if app.insights.is_empty() {
        return String::new();
    }
    let mut html = String::from("<h2>Model Insights</h2>\n");
    for (index, insight) in app.insights.iter().enumerate() {
        let open = if index == 0 { " open" } else { "" };
        let title = escape(&insight.title);
        let _ = writeln!(
            html,
            "<details{open}>\n<summary><b>{title}</b></summary>\n\
             <img src=\"/insights/{index}\" alt=\"{title}\">\n\
             <p class=\"caption\">{}</p>\n</details>",
            escape(&insight.caption)
        );
    }
    html
}

fn widget_html(widget: &WidgetView) -> String {
    match widget {
        WidgetView::Select {
            field,
            label,
            options,
        } => {
            let mut html = format!(
                "<label for=\"{f}\">{l}</label><select id=\"{f}\" name=\"{f}\">",
                f = escape(field),
                l = escape(label)
            );
            for option in options {
                let _ = write!(html, "<option>{}</option>", escape(option));
            }
            html.push_str("</select>");
            html
        }
        WidgetView::Number {
            field,
            label,
            min,
            max,
            value,
            step,
        } => format!(
            "<label for=\"{f}\">{l}</label><input type=\"number\" id=\"{f}\" name=\"{f}\" \
             min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" required>",
            f = escape(field),
            l = escape(label)
        ),
        WidgetView::Rating { field, label } => {
            let mut html = format!(
                "<label for=\"{f}\">{l}</label><select id=\"{f}\" name=\"{f}\">",
                f = escape(field),
                l = escape(label)
            );
            for stars in RATING_MIN..=RATING_MAX {
                let selected = if stars == 3 { " selected" } else { "" };
                let _ = write!(
                    html,
                    "<option value=\"{stars}\"{selected}>{}</option>",
                    "\u{2605}".repeat(usize::from(stars))
                );
            }
            html.push_str("</select>");
            html
        }
    }
}

fn alpha_slider(task: &Task) -> Option<String> {
    match task {
        Task::Classification { .. } => None,
        Task::IntervalRegression {
            alpha_min,
            alpha_max,
            alpha_default,
            alpha_step,
        } => Some(format!(
            "<label for=\"alpha\">Select alpha value for prediction intervals</label>\
             <input type=\"range\" id=\"alpha\" name=\"alpha\" min=\"{alpha_min}\" \
             max=\"{alpha_max}\" step=\"{alpha_step}\" value=\"{alpha_default}\" \
             oninput=\"this.nextElementSibling.value=this.value\">\
             <output>{alpha_default}</output>"
        )),
    }
}

fn records_table(headers: &[String], rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut html = String::from("<table>\n<tr>");
    for header in headers {
        let _ = write!(html, "<th>{}</th>", escape(header));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(&cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

/// Input form, plus the CSV upload form with a preview of the expected
/// layout.
pub(crate) fn form_page(
    app: &AppDefinition,
    sections: &[SectionView],
    preview: &[RawInputRecord],
) -> String {
    let mut body = highlights_html(app);
    body.push_str("<form method=\"post\" action=\"/predict\">\n");
    for section in sections {
        let _ = write!(
            body,
            "<fieldset>\n<legend><b>{}</b></legend>\n<p>{}</p>\n",
            escape(&section.title),
            escape(&section.description)
        );
        for widget in &section.widgets {
            body.push_str(&widget_html(widget));
            body.push('\n');
        }
        body.push_str("</fieldset>\n");
    }
    if let Some(slider) = alpha_slider(&app.task) {
        let _ = writeln!(body, "<fieldset>\n{slider}\n</fieldset>");
    }
    body.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    let fields: Vec<String> = app.schema.fields.iter().map(|f| f.name.clone()).collect();
    let _ = write!(
        body,
        "<h2>Upload a CSV</h2>\n<p>Expected columns: {}</p>\n",
        escape(&fields.join(", "))
    );
    if !preview.is_empty() {
        let rows = preview
            .iter()
            .map(|record| record.iter().map(|(_, v)| v.to_text()).collect());
        body.push_str(&records_table(&fields, rows));
        body.push('\n');
    }
    body.push_str(
        "<form method=\"post\" action=\"/predict/batch\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\".csv\" required>\n",
    );
    if let Some(slider) = alpha_slider(&app.task) {
        body.push_str(&slider.replace("id=\"alpha\"", "id=\"batch_alpha\""));
        body.push('\n');
    }
    body.push_str("<button type=\"submit\">Predict all rows</button>\n</form>\n");
    body.push_str(&insights_html(app));
    page(app, &body)
}

/// Result of one form submission.
pub(crate) fn result_page(app: &AppDefinition, outcome: &Outcome) -> String {
    let estimate = output::format_estimate(app, &outcome.result.estimate);
    let color = match (&app.task, &outcome.result.estimate) {
        (
            Task::Classification {
                positive_class: Some(positive),
            },
            PointPrediction::Class(label),
        ) if !label.eq_ignore_ascii_case(positive) => "#cc0000",
        (Task::Classification { .. }, _) => "#0066cc",
        _ => "inherit",
    };

    let mut body = String::from("<h2 style=\"color: green;\">Prediction Complete</h2>\n");
    let _ = write!(
        body,
        "<h3>Predicted {}</h3>\n<h1 style=\"font-weight: bold; color:{color};\">{}</h1>\n",
        escape(&app.target_label),
        escape(&estimate)
    );
    if let Some(line) = output::detail_line(app, &outcome.result) {
        let (label, value) = line.split_once(": ").unwrap_or(("", line.as_str()));
        let _ = writeln!(
            body,
            "<div class=\"box\"><b>{}:</b> {}</div>",
            escape(label),
            escape(value)
        );
    }

    for comparison in &outcome.comparisons {
        let _ = write!(
            body,
            "<h3>{}</h3>\n<p><b>Your selection:</b> {}<br>\
             Percentage of reference records with this selection: {:.1}%</p>\n",
            escape(&comparison.title),
            escape(&comparison.selection),
            comparison.percent
        );
    }

    if let Some(fact) = &outcome.fact {
        let _ = writeln!(
            body,
            "<div class=\"fact\"><b>Did you know?</b> {}</div>",
            escape(fact)
        );
    }
    body.push_str(&insights_html(app));
    body.push_str("<p><a href=\"/\">Back to the form</a></p>");
    page(app, &body)
}

/// Table of uploaded rows with their predictions.
pub(crate) fn batch_page(
    app: &AppDefinition,
    upload: &UploadedRecords,
    results: &[PredictionResult],
) -> String {
    let mut headers = upload.headers.clone();
    headers.extend(app.result_columns());
    let rows = upload.rows.iter().zip(results).map(|(row, result)| {
        let mut cells = row.clone();
        cells.extend(output::result_cells(result));
        cells
    });

    let mut body = String::from("<h2 style=\"color: green;\">CSV file uploaded successfully</h2>\n");
    let _ = writeln!(
        body,
        "<h3>Predicted {} for {} rows</h3>",
        escape(&app.target_label),
        results.len()
    );
    body.push_str(&records_table(&headers, rows));
    body.push_str("\n<p><a href=\"/\">Back to the form</a></p>");
    page(app, &body)
}

/// Failure message shown in place of a result.
pub(crate) fn error_page(app: &AppDefinition, title: &str, message: &str) -> String {
    let body = format!(
        "<div class=\"error\"><h2>{}</h2><p>{}</p></div>\n<p><a href=\"/\">Back to the form</a></p>",
        escape(title),
        escape(message)
    );
    page(app, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcast::app::{airline, diamonds, ComparisonOutcome};
    use formcast::invoke::PredictionDetail;

    fn outcome(result: PredictionResult) -> Outcome {
        Outcome {
            record: RawInputRecord::new(),
            vector: serde_json::from_str(r#"{"columns": [], "values": []}"#).unwrap(),
            result,
            comparisons: vec![ComparisonOutcome {
                title: "Flight Class Comparison".to_string(),
                selection: "Business".to_string(),
                percent: 47.8,
            }],
            fact: Some("Diamonds are <hard>".to_string()),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_form_page_widgets() {
        let app = diamonds();
        let sections = vec![SectionView {
            title: "Diamond Features Input".to_string(),
            description: "Enter diamond features below".to_string(),
            widgets: vec![
                WidgetView::Select {
                    field: "cut".to_string(),
                    label: "Cut".to_string(),
                    options: vec!["Fair".to_string(), "Very Good".to_string()],
                },
                WidgetView::Number {
                    field: "x".to_string(),
                    label: "Length (x in mm)".to_string(),
                    min: 3.89,
                    max: 6.35,
                    value: 3.89,
                    step: 0.01,
                },
            ],
        }];
        let html = form_page(&app, &sections, &[]);
        assert!(html.contains("<option>Very Good</option>"));
        assert!(html.contains("min=\"3.89\" max=\"6.35\" step=\"0.01\""));
        assert!(html.contains("name=\"alpha\""));
        assert!(html.contains("Expected columns: carat, cut, color, clarity, depth, table, x, y, z"));
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[test]
    fn test_form_page_ratings_and_no_slider() {
        let app = airline();
        let sections = vec![SectionView {
            title: "Part 3".to_string(),
            description: String::new(),
            widgets: vec![WidgetView::Rating {
                field: "cleanliness".to_string(),
                label: "Aircraft cleanliness (1–5 stars)".to_string(),
            }],
        }];
        let html = form_page(&app, &sections, &[]);
        assert!(html.contains("<option value=\"5\">"));
        assert!(html.contains("<option value=\"3\" selected>"));
        assert!(!html.contains("name=\"alpha\""));
    }

    #[test]
    fn test_result_page_interval() {
        let app = diamonds();
        let html = result_page(
            &app,
            &outcome(PredictionResult {
                estimate: PointPrediction::Value(3456.789),
                detail: PredictionDetail::Interval {
                    alpha: 0.1,
                    lower: 3000.0,
                    upper: 3900.5,
                },
            }),
        );
        assert!(html.contains("<h3>Predicted Price</h3>"));
        assert!(html.contains("$3,456.79"));
        assert!(html.contains("<b>Prediction Interval (90.00%):</b> [$3,000.00, $3,900.50]"));
        assert!(html.contains("Diamonds are &lt;hard&gt;"));
        assert!(html.contains("47.8%"));
    }

    #[test]
    fn test_result_page_classification_colors() {
        let app = airline();
        let satisfied = result_page(
            &app,
            &outcome(PredictionResult {
                estimate: PointPrediction::Class("satisfied".to_string()),
                detail: PredictionDetail::Confidence {
                    percent: 92.0,
                    probabilities: vec![],
                },
            }),
        );
        assert!(satisfied.contains("color:#0066cc;\">satisfied"));
        assert!(satisfied.contains("<b>Prediction Confidence:</b> 92.00%"));

        let unhappy = result_page(
            &app,
            &outcome(PredictionResult {
                estimate: PointPrediction::Class("neutral or dissatisfied".to_string()),
                detail: PredictionDetail::Confidence {
                    percent: 60.0,
                    probabilities: vec![],
                },
            }),
        );
        assert!(unhappy.contains("color:#cc0000;"));
    }

    #[test]
    fn test_form_page_model_insights() {
        let html = form_page(&diamonds(), &[], &[]);
        assert!(html.contains("<h2>Model Insights</h2>"));
        assert!(html.contains("<details open>\n<summary><b>Feature Importance</b></summary>"));
        assert!(html.contains("<img src=\"/insights/3\" alt=\"Coverage Plot\">"));
        assert!(html.contains("Range of predictions with confidence intervals."));
        assert_eq!(html.matches("<img src=\"/insights/").count(), 4);
        // Insights follow the upload form
        assert!(html.find("Model Insights") > html.find("Predict all rows"));
        assert!(!html.contains("What can you do with this app?"));
    }

    #[test]
    fn test_form_page_highlights() {
        let html = form_page(&airline(), &[], &[]);
        assert!(html.contains("<summary><b>What can you do with this app?</b></summary>"));
        assert!(html.contains(
            "<li><b>Fill out a Survey</b>: Provide a form for users to fill out their airline satisfaction feedback.</li>"
        ));
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(!html.contains("Model Insights"));
    }

    #[test]
    fn test_result_page_model_insights() {
        let html = result_page(
            &diamonds(),
            &outcome(PredictionResult {
                estimate: PointPrediction::Value(1600.0),
                detail: PredictionDetail::Interval {
                    alpha: 0.1,
                    lower: 1420.0,
                    upper: 1780.0,
                },
            }),
        );
        assert!(html.contains("<img src=\"/insights/1\" alt=\"Histogram of Residuals\">"));
        assert!(html.find("Model Insights") > html.find("Did you know?"));
    }

    #[test]
    fn test_batch_page() {
        let app = diamonds();
        let upload = UploadedRecords {
            headers: vec!["carat".to_string()],
            rows: vec![vec!["0.3".to_string()]],
            records: vec![],
        };
        let results = vec![PredictionResult {
            estimate: PointPrediction::Value(1600.0),
            detail: PredictionDetail::Interval {
                alpha: 0.1,
                lower: 1420.0,
                upper: 1780.0,
            },
        }];
        let html = batch_page(&app, &upload, &results);
        assert!(html.contains("<th>Lower Price Limit</th>"));
        assert!(html.contains("<td>0.3</td><td>1600.00</td><td>1420.00</td><td>1780.00</td>"));
    }

    #[test]
    fn test_error_page_escapes() {
        let html = error_page(&airline(), "Encoding failed", "unknown category \"<x>\"");
        assert!(html.contains("unknown category &quot;&lt;x&gt;&quot;"));
    }
}
