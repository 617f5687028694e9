//! Axum route handlers for résumé upload and ingestion progress.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::pipeline::{ingest, IngestDeps};
use crate::ingestion::progress::IngestSnapshot;
use crate::models::resume::ResumeRow;
use crate::state::AppState;
use crate::storage::IncomingFile;

const DEFAULT_LIST_LIMIT: i64 = 10;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub ingestion_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// POST /api/v1/resumes
///
/// Accepts a multipart `file` field and starts ingestion in the background.
/// Poll `/api/v1/ingestions/:id` for progress.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadAccepted>), AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read upload: {e}")))?;
        file = Some(IncomingFile {
            file_name,
            content_type,
            bytes,
        });
    }
    let file =
        file.ok_or_else(|| AppError::Upload("Multipart field 'file' is required".to_string()))?;

    let ingestion_id = Uuid::new_v4();
    let reporter = state.ingestions.register(ingestion_id).await;
    info!("Ingestion {ingestion_id} started for {}", file.file_name);

    tokio::spawn(async move {
        let deps = IngestDeps {
            store: state.store.as_ref(),
            storage: state.storage.as_ref(),
            ai: state.ai.as_ref(),
            max_upload_bytes: state.config.max_upload_bytes,
        };
        // The outcome is recorded on the reporter; this log is for operators.
        if let Err(e) = ingest(deps, file, &reporter).await {
            warn!("Ingestion {ingestion_id} failed: {e}");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(UploadAccepted { ingestion_id })))
}

/// GET /api/v1/ingestions/:id
pub async fn handle_get_ingestion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IngestSnapshot>, AppError> {
    state
        .ingestions
        .snapshot(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Ingestion {id} not found")))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.store.list_resumes(limit).await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    Ok(Json(state.store.get_resume(id).await?))
}
