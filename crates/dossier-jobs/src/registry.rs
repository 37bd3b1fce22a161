use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use dossier_common::{
    consts::JOB_PROGRESS_STARTED,
    error::{DossierError, Result},
    time,
};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    generator::Generator,
    store::{JobStore, JobStoreGuard},
    types::{Job, JobStatus},
};

const SUBSCRIPTION_CAPACITY: usize = 16;

#[derive(Debug, Default)]
struct JobTable {
    active: HashMap<String, Job>,
    completed: HashMap<String, Job>,
    restored: HashMap<String, Job>,
}

/// In-memory registry of background generation jobs.
///
/// Cloning is cheap and every clone shares the same tables. Construct one per
/// process and hand it to whoever needs it.
///
/// With a store attached, every state change is written to it before
/// subscribers hear about it.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<JobTable>>,
    watchers: Arc<Mutex<HashMap<String, broadcast::Sender<Job>>>>,
    store: Option<JobStore>,
    next_seq: Arc<AtomicU64>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(JobTable::default())),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            store: None,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Builds a registry backed by `store`, restoring the summaries it holds.
    ///
    /// Summaries of jobs interrupted by a restart are rewritten as errors.
    pub async fn with_store(store: JobStore) -> Self {
        let mut restored = HashMap::new();
        for summary in store.list().await {
            let interrupted = summary.status == JobStatus::Running;
            let job = Job::from_summary(summary);
            if interrupted {
                if let Err(err) = store.put(job.summary()).await {
                    warn!(job_id = %job.id, error = %err, "failed to record interrupted job");
                }
            }
            restored.insert(job.id.clone(), job);
        }
        if !restored.is_empty() {
            info!(count = restored.len(), "restored job summaries");
        }

        Self {
            jobs: Arc::new(RwLock::new(JobTable {
                restored,
                ..JobTable::default()
            })),
            store: Some(store),
            ..Self::new()
        }
    }

    /// Registers a running job and launches `generator` on it in the background.
    ///
    /// The job is visible to [`get_job`](Self::get_job) before this returns.
    /// Must be called from within a tokio runtime.
    pub fn start_job(
        &self,
        job_type: impl Into<String>,
        input: Value,
        generator: Arc<dyn Generator>,
    ) -> Result<String> {
        let id = self.next_id();
        let job = Job::new(id.clone(), job_type.into(), input);

        self.jobs_write()?.active.insert(id.clone(), job.clone());
        self.notify(&job);
        debug!(job_id = %id, job_type = %job.job_type, "job started");

        let registry = self.clone();
        tokio::spawn(async move {
            registry.execute_job(job, generator).await;
        });

        Ok(id)
    }

    pub fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let jobs = self.jobs_read()?;
        Ok(jobs
            .active
            .get(id)
            .or_else(|| jobs.completed.get(id))
            .or_else(|| jobs.restored.get(id))
            .cloned())
    }

    /// Every known job, newest first.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        let jobs = self.jobs_read()?;
        let mut seen: HashMap<&str, &Job> = HashMap::new();
        for job in jobs
            .restored
            .values()
            .chain(jobs.completed.values())
            .chain(jobs.active.values())
        {
            seen.insert(job.id.as_str(), job);
        }
        let mut list: Vec<Job> = seen.into_values().cloned().collect();
        list.sort_by(|left, right| {
            right
                .started_at
                .cmp(&left.started_at)
                .then_with(|| id_order(&right.id).cmp(&id_order(&left.id)))
        });
        Ok(list)
    }

    /// Marks a running job cancelled. The generator call keeps running and its
    /// outcome is discarded when it arrives.
    ///
    /// Cancelling a job that already finished returns it unchanged.
    pub async fn cancel_job(&self, id: &str) -> Result<Job> {
        let mut store = self.store_guard().await;
        let cancelled = {
            let mut jobs = self.jobs_write()?;
            match jobs.active.remove(id) {
                Some(mut job) => {
                    job.mark_cancelled();
                    jobs.completed.insert(id.to_string(), job.clone());
                    job
                }
                None => {
                    return jobs
                        .completed
                        .get(id)
                        .or_else(|| jobs.restored.get(id))
                        .cloned()
                        .ok_or_else(|| DossierError::JobNotFound(id.to_string()));
                }
            }
        };
        if let Some(store) = store.as_mut() {
            persist(store, &cancelled).await;
        }
        drop(store);

        info!(job_id = %id, "job cancelled");
        self.notify(&cancelled);
        Ok(cancelled)
    }

    /// Forgets every finished job, in memory and in the durable store.
    pub async fn clear_completed(&self) -> Result<usize> {
        let mut store = self.store_guard().await;
        let cleared: HashSet<String> = {
            let mut jobs = self.jobs_write()?;
            let mut ids: HashSet<String> = jobs.completed.drain().map(|(id, _)| id).collect();
            ids.extend(jobs.restored.drain().map(|(id, _)| id));
            ids
        };

        if let Some(store) = store.as_mut() {
            store.clear(&cleared).await?;
        }
        debug!(count = cleared.len(), "cleared completed jobs");
        Ok(cleared.len())
    }

    /// Receives a snapshot of the job on every status or progress change.
    ///
    /// A job that already finished yields its final snapshot once and the
    /// feed then ends.
    pub fn subscribe(&self, id: &str) -> Result<JobSubscription> {
        let mut watchers = self.watchers_lock()?;
        watchers.retain(|_, sender| sender.receiver_count() > 0);

        let job = self
            .get_job(id)?
            .ok_or_else(|| DossierError::JobNotFound(id.to_string()))?;
        let receiver = if job.status.is_terminal() {
            let (sender, receiver) = broadcast::channel(1);
            // Zero receivers is impossible here; the feed closes when `sender` drops.
            let _ = sender.send(job);
            receiver
        } else {
            watchers
                .entry(id.to_string())
                .or_insert_with(|| broadcast::channel(SUBSCRIPTION_CAPACITY).0)
                .subscribe()
        };

        Ok(JobSubscription {
            job_id: id.to_string(),
            receiver,
        })
    }

    /// Resolves once the job reaches a terminal state.
    pub async fn wait(&self, id: &str) -> Result<Job> {
        let mut subscription = self.subscribe(id)?;
        while let Some(job) = subscription.recv().await {
            if job.status.is_terminal() {
                return Ok(job);
            }
        }

        self.get_job(id)?
            .ok_or_else(|| DossierError::JobNotFound(id.to_string()))
    }

    async fn execute_job(&self, job: Job, generator: Arc<dyn Generator>) {
        let id = job.id.clone();

        let mut store = self.store_guard().await;
        let started = self.update_active(&id, |job| job.advance_progress(JOB_PROGRESS_STARTED));
        if let (Some(snapshot), Some(store)) = (&started, store.as_mut()) {
            persist(store, snapshot).await;
        }
        drop(store);
        if let Some(snapshot) = started {
            self.notify(&snapshot);
        }

        let outcome = generator.generate(job.input).await;

        let mut store = self.store_guard().await;
        let Some(finished) = self.finish_active(&id, outcome) else {
            debug!(job_id = %id, "discarding outcome of cancelled job");
            return;
        };
        if let Some(store) = store.as_mut() {
            persist(store, &finished).await;
        }
        drop(store);

        match finished.status {
            JobStatus::Completed => info!(job_id = %id, "job completed"),
            _ => warn!(
                job_id = %id,
                error = finished.error.as_deref().unwrap_or_default(),
                "job failed"
            ),
        }
        self.notify(&finished);
    }

    fn update_active(&self, id: &str, update: impl FnOnce(&mut Job)) -> Option<Job> {
        match self.jobs_write() {
            Ok(mut jobs) => jobs.active.get_mut(id).map(|job| {
                update(job);
                job.clone()
            }),
            Err(err) => {
                warn!(job_id = %id, error = %err, "failed to update job");
                None
            }
        }
    }

    /// Moves a still-active job to the completed table with its outcome.
    fn finish_active(&self, id: &str, outcome: Result<Value>) -> Option<Job> {
        let mut jobs = match self.jobs_write() {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(job_id = %id, error = %err, "failed to record job outcome");
                return None;
            }
        };
        let mut job = jobs.active.remove(id)?;
        match outcome {
            Ok(result) => job.mark_completed(result),
            Err(err) => job.mark_error(err.to_string()),
        }
        jobs.completed.insert(id.to_string(), job.clone());
        Some(job)
    }

    fn notify(&self, job: &Job) {
        let Ok(mut watchers) = self.watchers_lock() else {
            return;
        };
        if let Some(sender) = watchers.get(&job.id) {
            // Zero receivers is not an error.
            let _ = sender.send(job.clone());
        }
        if job.status.is_terminal() {
            watchers.remove(&job.id);
        }
    }

    async fn store_guard(&self) -> Option<JobStoreGuard<'_>> {
        match &self.store {
            Some(store) => Some(store.lock().await),
            None => None,
        }
    }

    fn next_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("job_{}_{seq}", time::unix_millis(&time::now()))
    }

    fn jobs_read(&self) -> Result<RwLockReadGuard<'_, JobTable>> {
        self.jobs
            .read()
            .map_err(|_| DossierError::InternalError("job table lock poisoned".to_string()))
    }

    fn jobs_write(&self) -> Result<RwLockWriteGuard<'_, JobTable>> {
        self.jobs
            .write()
            .map_err(|_| DossierError::InternalError("job table lock poisoned".to_string()))
    }

    fn watchers_lock(&self) -> Result<MutexGuard<'_, HashMap<String, broadcast::Sender<Job>>>> {
        self.watchers
            .lock()
            .map_err(|_| DossierError::InternalError("job watchers lock poisoned".to_string()))
    }
}

async fn persist(store: &mut JobStoreGuard<'_>, job: &Job) {
    if let Err(err) = store.put(job.summary()).await {
        warn!(job_id = %job.id, error = %err, "failed to persist job summary");
    }
}

/// `(millis, sequence)` parsed from a `job_<millis>_<seq>` id, so ids order
/// numerically. Ids in any other shape sort first.
fn id_order(id: &str) -> (i64, u64) {
    id.strip_prefix("job_")
        .and_then(|rest| rest.split_once('_'))
        .and_then(|(millis, seq)| Some((millis.parse::<i64>().ok()?, seq.parse::<u64>().ok()?)))
        .unwrap_or_default()
}

/// A live feed of one job's changes. Dropping it unsubscribes.
pub struct JobSubscription {
    job_id: String,
    receiver: broadcast::Receiver<Job>,
}

impl JobSubscription {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Next snapshot, or `None` once the job has finished and every queued
    /// snapshot was delivered.
    pub async fn recv(&mut self) -> Option<Job> {
        loop {
            match self.receiver.recv().await {
                Ok(job) => return Some(job),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(job_id = %self.job_id, skipped, "job subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
