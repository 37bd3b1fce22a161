use std::{collections::HashSet, io::Read, path::Path};

use dossier_common::error::{DossierError, Result};
use indexmap::IndexMap;

use crate::types::BatchRow;

/// Parses CSV with a header line into pending rows numbered by position.
///
/// Cells are trimmed and copied verbatim. Rows shorter than the header simply
/// lack the trailing columns; rows longer than it are rejected, and so is a
/// header that names the same column twice.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<BatchRow>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|err| DossierError::Input(format!("failed to read header row: {err}")))?
        .clone();
    if headers.iter().all(str::is_empty) {
        return Err(DossierError::Input("missing header row".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = headers
        .iter()
        .filter(|header| !header.is_empty())
        .find(|header| !seen.insert(*header))
    {
        return Err(DossierError::Input(format!(
            "column {duplicate} appears more than once in the header"
        )));
    }

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|err| DossierError::Input(err.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        if record.len() > headers.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(DossierError::Input(format!(
                "line {line} has {} cells but the header has {}",
                record.len(),
                headers.len()
            )));
        }

        let fields: IndexMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(BatchRow::new(rows.len(), fields));
    }

    Ok(rows)
}

pub async fn read_rows_from_path(path: impl AsRef<Path>) -> Result<Vec<BatchRow>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    read_rows(bytes.as_slice())
}
