use chrono::{DateTime, Utc};
use dossier_common::{consts::JOB_PROGRESS_DONE, time};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const INTERRUPTED_MESSAGE: &str = "interrupted by restart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One asynchronous generation request.
///
/// Once the status leaves `Running`, `result` is set for `Completed` and
/// `error` for `Error`; a `Cancelled` job carries neither. Jobs reloaded from
/// the durable store have `restored` set and never carry a result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub input: Value,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restored: bool,
}

impl Job {
    pub fn new(id: String, job_type: String, input: Value) -> Self {
        Self {
            id,
            job_type,
            input,
            status: JobStatus::Running,
            progress: 0,
            result: None,
            error: None,
            started_at: time::now(),
            ended_at: None,
            restored: false,
        }
    }

    /// Progress never moves backwards.
    pub fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(JOB_PROGRESS_DONE));
    }

    pub fn mark_completed(&mut self, result: Value) {
        self.status = JobStatus::Completed;
        self.progress = JOB_PROGRESS_DONE;
        self.result = Some(result);
        self.error = None;
        self.ended_at = Some(time::now());
    }

    pub fn mark_error(&mut self, message: String) {
        self.status = JobStatus::Error;
        self.error = Some(message);
        self.result = None;
        self.ended_at = Some(time::now());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.ended_at = Some(time::now());
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            job_type: self.job_type.clone(),
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
            has_result: self.result.is_some(),
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    /// Rebuilds a job from its persisted summary.
    ///
    /// A summary still marked running belongs to an executor that died with
    /// the previous process, so it comes back as an error.
    pub fn from_summary(summary: JobSummary) -> Self {
        let mut job = Self {
            id: summary.id,
            job_type: summary.job_type,
            input: Value::Null,
            status: summary.status,
            progress: summary.progress,
            result: None,
            error: summary.error,
            started_at: summary.started_at,
            ended_at: summary.ended_at,
            restored: true,
        };
        if job.status == JobStatus::Running {
            job.status = JobStatus::Error;
            job.error = Some(INTERRUPTED_MESSAGE.to_string());
            job.ended_at.get_or_insert(summary.started_at);
        }
        job
    }
}

/// Redacted job record written to the durable store. The result payload is
/// reduced to a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub job_type: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub has_result: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}
