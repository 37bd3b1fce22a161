use std::io::{Cursor, Write};

use dossier_common::error::{DossierError, Result};
use serde::Serialize;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::types::{BatchResult, RowOutcome};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveSummary {
    total: usize,
    success: usize,
    error: usize,
    persistence_failures: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchivedError<'a> {
    row_id: usize,
    message: &'a str,
}

/// Packs a finished batch into a ZIP: `row-NNNN.json` per generated
/// document, plus `errors.json` and `summary.json`.
pub fn build_archive(result: &BatchResult) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut errors = Vec::new();
    for outcome in &result.outputs {
        match outcome {
            RowOutcome::Success { row_id, output } => {
                write_json(&mut zip, format!("row-{row_id:04}.json"), output, options)?;
            }
            RowOutcome::Error { row_id, message } => errors.push(ArchivedError {
                row_id: *row_id,
                message,
            }),
        }
    }

    write_json(&mut zip, "errors.json".to_string(), &errors, options)?;
    let summary = ArchiveSummary {
        total: result.rows.len(),
        success: result.success_count(),
        error: result.error_count(),
        persistence_failures: result.persistence_failures,
    };
    write_json(&mut zip, "summary.json".to_string(), &summary, options)?;

    let cursor = zip
        .finish()
        .map_err(|err| DossierError::Archive(format!("failed to finish archive: {err}")))?;
    Ok(cursor.into_inner())
}

fn write_json<T: Serialize + ?Sized>(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: String,
    value: &T,
    options: SimpleFileOptions,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| DossierError::Archive(format!("failed to encode {name}: {err}")))?;
    zip.start_file(name.as_str(), options)
        .map_err(|err| DossierError::Archive(format!("failed to add {name}: {err}")))?;
    zip.write_all(&bytes)?;
    Ok(())
}
