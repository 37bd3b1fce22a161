pub mod batch;
pub mod health;
pub mod jobs;

use axum::{Json, http::StatusCode, response::IntoResponse};
use dossier_common::error::DossierError;
use tracing::error;

pub struct ApiError(pub DossierError);

impl From<DossierError> for ApiError {
    fn from(value: DossierError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0 {
            DossierError::InvalidArgument(_) | DossierError::Input(_) => StatusCode::BAD_REQUEST,
            DossierError::JobNotFound(_) => StatusCode::NOT_FOUND,
            DossierError::JobNotReady(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(serde_json::json!({
                "code": self.0.error_code(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
