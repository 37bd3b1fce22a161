use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use dossier_batch::{BatchGenerator, BatchResult, build_archive, read_rows};
use dossier_common::{consts::JOB_TYPE_BATCH, error::DossierError};
use dossier_jobs::{Job, JobStatus};
use tracing::info;

use crate::{ApiState, handlers::ApiError, types::BatchQuery};

/// Accepts a CSV body and starts it as a background batch job.
pub async fn submit_batch(
    State(api): State<Arc<ApiState>>,
    Query(query): Query<BatchQuery>,
    body: String,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let rows = read_rows(body.as_bytes())?;
    if rows.is_empty() {
        return Err(ApiError(DossierError::Input("batch has no rows".to_string())));
    }

    let input = serde_json::to_value(&rows).map_err(|err| {
        DossierError::InternalError(format!("failed to encode batch rows: {err}"))
    })?;
    let generator = BatchGenerator::new(api.batch_runner(query.document_type));

    let registry = api.registry();
    let id = registry.start_job(JOB_TYPE_BATCH, input, Arc::new(generator))?;
    info!(job_id = %id, rows = rows.len(), "batch submitted");

    let job = registry
        .get_job(&id)?
        .ok_or_else(|| DossierError::JobNotFound(id.clone()))?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn download_archive(
    State(api): State<Arc<ApiState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = api
        .registry()
        .get_job(&job_id)?
        .ok_or_else(|| DossierError::JobNotFound(job_id.clone()))?;
    if job.job_type != JOB_TYPE_BATCH {
        return Err(ApiError(DossierError::InvalidArgument(format!(
            "job {job_id} is not a batch"
        ))));
    }
    if job.status != JobStatus::Completed {
        return Err(ApiError(DossierError::JobNotReady(format!(
            "batch {job_id} is {}",
            job.status.as_str()
        ))));
    }
    let Some(result) = job.result else {
        return Err(ApiError(DossierError::JobNotReady(format!(
            "result of batch {job_id} is no longer held in memory"
        ))));
    };

    let result: BatchResult = serde_json::from_value(result).map_err(|err| {
        DossierError::InternalError(format!("failed to decode batch result: {err}"))
    })?;
    let archive = build_archive(&result)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{job_id}.zip\""),
            ),
        ],
        archive,
    ))
}
