use std::path::PathBuf;

use async_trait::async_trait;
use dossier_common::error::{DossierError, Result};
use tokio::fs;

use crate::types::DocumentRecord;

/// Archives generated documents. Callers treat failures as non-fatal.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(&self, record: &DocumentRecord) -> Result<()>;
}

/// Writes each record as `<root>/<record id>.json`.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, record: &DocumentRecord) -> PathBuf {
        self.root.join(format!("{}.json", record.id))
    }
}

#[async_trait]
impl PersistenceSink for FileSink {
    async fn save(&self, record: &DocumentRecord) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let path = self.record_path(record);
        let bytes = serde_json::to_vec_pretty(record).map_err(|err| {
            DossierError::Persistence(format!(
                "failed to serialize document record {}: {err}",
                path.display()
            ))
        })?;
        fs::write(path, bytes).await?;
        Ok(())
    }
}
