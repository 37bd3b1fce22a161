use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use dossier_common::error::DossierError;
use dossier_jobs::Job;

use crate::{
    ApiState,
    handlers::ApiError,
    types::{ClearedResponse, StartJobRequest},
};

pub async fn list_jobs(State(api): State<Arc<ApiState>>) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(api.registry().list_jobs()?))
}

pub async fn start_job(
    State(api): State<Arc<ApiState>>,
    Json(payload): Json<StartJobRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let job_type = payload.job_type.trim();
    if job_type.is_empty() {
        return Err(ApiError(DossierError::InvalidArgument(
            "jobType is required".to_string(),
        )));
    }

    let registry = api.registry();
    let id = registry.start_job(job_type, payload.input, api.generator())?;
    let job = registry
        .get_job(&id)?
        .ok_or_else(|| DossierError::JobNotFound(id.clone()))?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn get_job(
    State(api): State<Arc<ApiState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    api.registry()
        .get_job(&job_id)?
        .map(Json)
        .ok_or_else(|| ApiError(DossierError::JobNotFound(job_id)))
}

pub async fn cancel_job(
    State(api): State<Arc<ApiState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(api.registry().cancel_job(&job_id).await?))
}

pub async fn clear_completed(
    State(api): State<Arc<ApiState>>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let cleared = api.registry().clear_completed().await?;
    Ok(Json(ClearedResponse { cleared }))
}
