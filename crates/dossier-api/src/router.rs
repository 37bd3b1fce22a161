use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{ApiState, handlers};

pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health/live", get(handlers::health::health_live))
        .route(
            "/api/v1/jobs",
            get(handlers::jobs::list_jobs)
                .post(handlers::jobs::start_job)
                .delete(handlers::jobs::clear_completed),
        )
        .route(
            "/api/v1/jobs/{job_id}",
            get(handlers::jobs::get_job).delete(handlers::jobs::cancel_job),
        )
        .route("/api/v1/batches", post(handlers::batch::submit_batch))
        .route(
            "/api/v1/batches/{job_id}/archive",
            get(handlers::batch::download_archive),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
