use std::time::Duration;

use dossier_common::{
    consts::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS},
    error::{DossierError, Result},
};
use tracing::{debug, warn};

use crate::{registry::JobRegistry, types::Job};

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Polls `job_id` on a fixed interval until it reaches a terminal state.
///
/// The returned job may be completed, errored or cancelled; callers inspect
/// its status. Running out of attempts yields `DossierError::JobTimedOut`,
/// which is separate from any failure the generator reported.
pub async fn poll_job(registry: &JobRegistry, job_id: &str, config: PollConfig) -> Result<Job> {
    for attempt in 1..=config.max_attempts {
        let job = registry
            .get_job(job_id)?
            .ok_or_else(|| DossierError::JobNotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Ok(job);
        }

        debug!(job_id, attempt, progress = job.progress, "job still running");
        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    warn!(job_id, attempts = config.max_attempts, "gave up polling job");
    Err(DossierError::JobTimedOut {
        job_id: job_id.to_string(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use dossier_common::error::DossierError;
    use serde_json::{Value, json};

    use super::{PollConfig, poll_job};
    use crate::{generator::generator_fn, registry::JobRegistry, types::JobStatus};

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn returns_terminal_job() {
        let registry = JobRegistry::new();
        let id = registry
            .start_job(
                "protocol",
                Value::Null,
                Arc::new(generator_fn(|_input| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(json!({"sections": 4}))
                })),
            )
            .unwrap();

        let job = poll_job(&registry, &id, fast(50)).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(json!({"sections": 4})));
    }

    #[tokio::test]
    async fn attempt_ceiling_reports_timeout() {
        let registry = JobRegistry::new();
        let id = registry
            .start_job(
                "protocol",
                Value::Null,
                Arc::new(generator_fn(|_input| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                })),
            )
            .unwrap();

        let started = tokio::time::Instant::now();
        let err = poll_job(
            &registry,
            &id,
            PollConfig {
                interval: Duration::from_millis(100),
                max_attempts: 3,
            },
        )
        .await
        .unwrap_err();
        // Two pauses between three attempts, none after the last.
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(matches!(
            err,
            DossierError::JobTimedOut { attempts: 3, .. }
        ));
        assert_eq!(
            registry.get_job(&id).unwrap().unwrap().status,
            JobStatus::Running
        );
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let err = poll_job(&registry, "job_0_0", fast(3)).await.unwrap_err();
        assert!(matches!(err, DossierError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn generator_error_is_returned_as_job_not_err() {
        let registry = JobRegistry::new();
        let id = registry
            .start_job(
                "protocol",
                Value::Null,
                Arc::new(generator_fn(|_input| async {
                    Err(DossierError::generation("upstream returned 502"))
                })),
            )
            .unwrap();

        let job = poll_job(&registry, &id, fast(20)).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("upstream returned 502"));
    }
}
