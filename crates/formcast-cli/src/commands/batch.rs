//! Batch command: predict every row of an uploaded CSV.

use std::io::{self, Write};
use std::path::Path;

use formcast::invoke::{self, PredictionResult};
use formcast::record::{self, UploadedRecords};

use super::{check_file, Session, Settings};
use crate::error::Result;
use crate::output;

/// Predicts every complete row of `reader` and returns the upload together
/// with one result per kept row.
pub(crate) fn predict_upload<R: io::Read>(
    session: &Session,
    reader: R,
    alpha: Option<f64>,
) -> Result<(UploadedRecords, Vec<PredictionResult>)> {
    let upload = record::read_uploaded(reader, &session.app.schema)?;
    let vectors = session.encoder().encode_batch(&upload.records)?;
    let results = invoke::predict_batch(&session.model, &vectors, session.mode(alpha))?;
    Ok((upload, results))
}

/// Writes the upload's rows with the result columns appended.
pub(crate) fn write_csv<W: Write>(
    session: &Session,
    upload: &UploadedRecords,
    results: &[PredictionResult],
    writer: W,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header = upload.headers.clone();
    header.extend(session.app.result_columns());
    writer.write_record(&header)?;
    for (row, result) in upload.rows.iter().zip(results) {
        let mut cells = row.clone();
        cells.extend(output::result_cells(result));
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

/// Run the batch command
pub(crate) fn run(
    settings: &Settings,
    input: &Path,
    output_path: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    check_file(input)?;
    let session = Session::load(settings)?;
    let file = std::fs::File::open(input)?;
    let (upload, results) = predict_upload(&session, file, None)?;
    log::info!("predicted {} rows from {}", results.len(), input.display());

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    match output_path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_csv(&session, &upload, &results, file)?;
            output::success(&format!(
                "{} predictions written to {}",
                results.len(),
                path.display()
            ));
        }
        None => write_csv(&session, &upload, &results, io::stdout().lock())?,
    }
    Ok(())
}
