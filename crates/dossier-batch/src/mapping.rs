use std::collections::BTreeMap;

use dossier_common::error::{DossierError, Result};
use serde_json::{Map, Value};

use crate::types::BatchRow;

const DOCUMENT_TYPE_FIELD: &str = "documentType";

/// Shapes a row into the payload the generator expects.
///
/// Values are copied verbatim as JSON strings. Columns without a rename keep
/// their own name.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    renames: BTreeMap<String, String>,
    document_type: Option<String>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.renames.insert(column.into(), field.into());
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    /// Builds a mapping from `column=field` pairs.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut mapping = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((column, field)) = pair.split_once('=') else {
                return Err(DossierError::InvalidArgument(format!(
                    "field mapping must use column=field format: {pair}"
                )));
            };
            let (column, field) = (column.trim(), field.trim());
            if column.is_empty() || field.is_empty() {
                return Err(DossierError::InvalidArgument(format!(
                    "field mapping has an empty side: {pair}"
                )));
            }
            mapping = mapping.rename(column, field);
        }
        Ok(mapping)
    }

    pub fn document_type(&self) -> Option<&str> {
        self.document_type.as_deref()
    }

    pub fn apply(&self, row: &BatchRow) -> Value {
        let mut payload = Map::new();
        for (column, value) in &row.fields {
            let key = self.renames.get(column).unwrap_or(column);
            payload.insert(key.clone(), Value::String(value.clone()));
        }
        if let Some(document_type) = &self.document_type {
            payload.insert(
                DOCUMENT_TYPE_FIELD.to_string(),
                Value::String(document_type.clone()),
            );
        }
        Value::Object(payload)
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::json;

    use super::FieldMapping;
    use crate::types::BatchRow;

    fn row() -> BatchRow {
        let fields = IndexMap::from([
            ("Study Title".to_string(), "Phase II oncology".to_string()),
            ("country".to_string(), "US".to_string()),
        ]);
        BatchRow::new(0, fields)
    }

    #[test]
    fn identity_mapping_copies_columns() {
        assert_eq!(
            FieldMapping::new().apply(&row()),
            json!({"Study Title": "Phase II oncology", "country": "US"})
        );
    }

    #[test]
    fn renames_and_document_type_apply() {
        let mapping = FieldMapping::from_pairs(&["Study Title = title"])
            .unwrap()
            .with_document_type("protocol");

        assert_eq!(
            mapping.apply(&row()),
            json!({"title": "Phase II oncology", "country": "US", "documentType": "protocol"})
        );
    }

    #[test]
    fn payload_keeps_column_order() {
        let fields = IndexMap::from([
            ("zeta".to_string(), "1".to_string()),
            ("alpha".to_string(), "2".to_string()),
            ("mid".to_string(), "3".to_string()),
        ]);
        let payload = FieldMapping::new()
            .rename("alpha", "beta")
            .apply(&BatchRow::new(0, fields));

        let keys: Vec<&str> = payload
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zeta", "beta", "mid"]);
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        assert!(FieldMapping::from_pairs(&["title"]).is_err());
        assert!(FieldMapping::from_pairs(&["=title"]).is_err());
    }
}
