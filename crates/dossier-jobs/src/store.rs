use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use dossier_common::error::{DossierError, Result};
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};
use tracing::warn;

use crate::types::JobSummary;

const JOBS_FILE_NAME: &str = "jobs.json";

/// Durable copy of job summaries so job state survives a restart.
///
/// All summaries live in a single JSON file that is rewritten through a
/// temporary file on every change.
#[derive(Debug, Clone)]
pub struct JobStore {
    path: PathBuf,
    summaries: Arc<Mutex<HashMap<String, JobSummary>>>,
}

impl JobStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let path = root.join(JOBS_FILE_NAME);

        let summaries = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<JobSummary>>(&bytes) {
                Ok(list) => list
                    .into_iter()
                    .map(|summary| (summary.id.clone(), summary))
                    .collect(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "discarding unreadable job store");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(DossierError::Io(err)),
        };

        Ok(Self {
            path,
            summaries: Arc::new(Mutex::new(summaries)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<JobSummary> {
        let mut list: Vec<JobSummary> = self.summaries.lock().await.values().cloned().collect();
        list.sort_by(|left, right| right.started_at.cmp(&left.started_at));
        list
    }

    pub async fn get(&self, id: &str) -> Option<JobSummary> {
        self.summaries.lock().await.get(id).cloned()
    }

    /// Exclusive access to the summaries until the guard is dropped.
    ///
    /// Holding the guard across an in-memory state change keeps the file in
    /// the same order as the changes.
    pub async fn lock(&self) -> JobStoreGuard<'_> {
        JobStoreGuard {
            path: &self.path,
            summaries: self.summaries.lock().await,
        }
    }

    pub async fn put(&self, summary: JobSummary) -> Result<()> {
        let mut guard = self.lock().await;
        guard.put(summary).await
    }

    /// Drops every terminal summary and returns how many were removed.
    pub async fn clear_terminal(&self) -> Result<usize> {
        let mut guard = self.lock().await;
        guard.clear(&HashSet::new()).await
    }
}

pub struct JobStoreGuard<'a> {
    path: &'a Path,
    summaries: MutexGuard<'a, HashMap<String, JobSummary>>,
}

impl JobStoreGuard<'_> {
    /// Records a summary. A terminal summary is never replaced by a running one.
    pub async fn put(&mut self, summary: JobSummary) -> Result<()> {
        if let Some(existing) = self.summaries.get(&summary.id) {
            if existing.status.is_terminal() && !summary.status.is_terminal() {
                return Ok(());
            }
        }
        self.summaries.insert(summary.id.clone(), summary);
        self.write_file().await
    }

    /// Drops every terminal summary plus any listed in `ids`, whatever its
    /// stored status.
    pub async fn clear(&mut self, ids: &HashSet<String>) -> Result<usize> {
        let before = self.summaries.len();
        self.summaries
            .retain(|id, summary| !summary.status.is_terminal() && !ids.contains(id));
        let removed = before - self.summaries.len();
        if removed > 0 {
            self.write_file().await?;
        }
        Ok(removed)
    }

    async fn write_file(&self) -> Result<()> {
        let mut list: Vec<&JobSummary> = self.summaries.values().collect();
        list.sort_by(|left, right| left.id.cmp(&right.id));
        let bytes = serde_json::to_vec_pretty(&list).map_err(|err| {
            DossierError::InternalError(format!(
                "failed to serialize job store {}: {err}",
                self.path.display()
            ))
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, bytes).await?;
        fs::rename(&temp_path, self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::JobStore;
    use crate::types::{JobStatus, JobSummary};

    fn summary(id: &str, status: JobStatus) -> JobSummary {
        JobSummary {
            id: id.to_string(),
            job_type: "protocol".to_string(),
            status,
            progress: if status == JobStatus::Completed { 100 } else { 25 },
            error: None,
            has_result: status == JobStatus::Completed,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    #[tokio::test]
    async fn summaries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JobStore::open(dir.path()).await.unwrap();
            store.put(summary("job_1_1", JobStatus::Completed)).await.unwrap();
            store.put(summary("job_1_2", JobStatus::Running)).await.unwrap();
        }

        let store = JobStore::open(dir.path()).await.unwrap();
        assert_eq!(store.list().await.len(), 2);
        let completed = store.get("job_1_1").await.unwrap();
        assert!(completed.has_result);
    }

    #[tokio::test]
    async fn terminal_summary_is_not_regressed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();

        store.put(summary("job_1_1", JobStatus::Cancelled)).await.unwrap();
        store.put(summary("job_1_1", JobStatus::Running)).await.unwrap();

        assert_eq!(
            store.get("job_1_1").await.unwrap().status,
            JobStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn clear_terminal_keeps_running_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        store.put(summary("job_1_1", JobStatus::Completed)).await.unwrap();
        store.put(summary("job_1_2", JobStatus::Error)).await.unwrap();
        store.put(summary("job_1_3", JobStatus::Running)).await.unwrap();

        assert_eq!(store.clear_terminal().await.unwrap(), 2);

        let reopened = JobStore::open(dir.path()).await.unwrap();
        let left = reopened.list().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "job_1_3");
    }

    #[tokio::test]
    async fn clear_removes_listed_running_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open(dir.path()).await.unwrap();
        store.put(summary("job_1_1", JobStatus::Running)).await.unwrap();
        store.put(summary("job_1_2", JobStatus::Running)).await.unwrap();

        let ids = HashSet::from(["job_1_1".to_string()]);
        assert_eq!(store.lock().await.clear(&ids).await.unwrap(), 1);

        let reopened = JobStore::open(dir.path()).await.unwrap();
        assert!(reopened.get("job_1_1").await.is_none());
        assert!(reopened.get("job_1_2").await.is_some());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("jobs.json"), b"{not json")
            .await
            .unwrap();

        let store = JobStore::open(dir.path()).await.unwrap();
        assert!(store.list().await.is_empty());
    }
}
