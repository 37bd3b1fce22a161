
use chrono::{DateTime, Utc};
use dossier_common::time;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl RowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One record of a tabular batch submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub id: usize,
    /// Cells keyed by header, in column order.
    pub fields: IndexMap<String, String>,
    pub status: RowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchRow {
    pub fn new(id: usize, fields: IndexMap<String, String>) -> Self {
        Self {
            id,
            fields,
            status: RowStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub(crate) fn mark_processing(&mut self) {
        self.status = RowStatus::Processing;
    }

    pub(crate) fn mark_completed(&mut self, result: Value) {
        self.status = RowStatus::Completed;
        self.result = Some(result);
    }

    pub(crate) fn mark_error(&mut self, message: String) {
        self.status = RowStatus::Error;
        self.error = Some(message);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    #[serde(rename_all = "camelCase")]
    Success { row_id: usize, output: Value },
    #[serde(rename_all = "camelCase")]
    Error { row_id: usize, message: String },
}

impl RowOutcome {
    pub fn row_id(&self) -> usize {
        match self {
            Self::Success { row_id, .. } | Self::Error { row_id, .. } => *row_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub rows: Vec<BatchRow>,
    /// One entry per row, in input order.
    pub outputs: Vec<RowOutcome>,
    /// Successful rows whose best-effort save failed.
    pub persistence_failures: usize,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.count(RowStatus::Completed)
    }

    pub fn error_count(&self) -> usize {
        self.count(RowStatus::Error)
    }

    fn count(&self, status: RowStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }
}

/// What a persistence sink receives for each generated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: Uuid,
    pub row_id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    pub payload: Value,
    pub output: Value,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn new(row_id: usize, document_type: Option<String>, payload: Value, output: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            row_id,
            document_type,
            payload,
            output,
            created_at: time::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::RowOutcome;

    #[test]
    fn outcome_is_tagged_by_status() {
        let success = RowOutcome::Success {
            row_id: 0,
            output: json!("ok"),
        };
        let error = RowOutcome::Error {
            row_id: 1,
            message: "boom".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"status": "success", "rowId": 0, "output": "ok"})
        );
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"status": "error", "rowId": 1, "message": "boom"})
        );
        assert_eq!(error.row_id(), 1);
        assert!(!error.is_success());
    }
}
