use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every pipeline stage fails fast with one of these; nothing is retried here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Illegal state transition: {0}")]
    StateTransition(String),

    #[error("Question {0} already has a response")]
    DuplicateResponse(Uuid),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, also used by the ingestion progress view.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Generation(_) => "GENERATION_ERROR",
            AppError::StateTransition(_) => "STATE_TRANSITION_ERROR",
            AppError::DuplicateResponse(_) => "DUPLICATE_RESPONSE",
            AppError::Scoring(_) => "SCORING_ERROR",
            AppError::NotReady(_) => "NOT_READY",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::S3(_) => "S3_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) | AppError::Upload(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::StateTransition(msg) | AppError::NotReady(msg) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::DuplicateResponse(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Extraction(msg) | AppError::Generation(msg) | AppError::Scoring(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_map_to_conflict() {
        let resp = AppError::StateTransition("already completed".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::DuplicateResponse(Uuid::new_v4()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::NotReady("in progress".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_ai_output_errors_are_unprocessable() {
        for err in [
            AppError::Extraction("bad".into()),
            AppError::Generation("bad".into()),
            AppError::Scoring("bad".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn test_upload_error_is_bad_request() {
        let resp = AppError::Upload("unsupported file type".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
