//! Resume Ingestion: upload, extract, persist.
//!
//! Progress checkpoints: upload 0→20, extraction 20→80, persistence 80→100.
//! A failure stops progress at the checkpoint reached and persists nothing.
//! There is no retry; callers re-run `ingest` from scratch. There is also no
//! cancellation: an abandoned ingestion simply never writes a résumé.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::ingestion::progress::{
    IngestStage, ProgressReporter, EXTRACTION_CHECKPOINT, EXTRACTION_RECEIVED, UPLOAD_CHECKPOINT,
};
use crate::ingestion::schema::{resume_schema, validate_extraction};
use crate::llm_client::capability::{AiCapability, ExtractionStatus};
use crate::models::resume::ResumeRow;
use crate::storage::{DocumentKind, FileStorage, IncomingFile, UploadedDocument};
use crate::store::EntityStore;

const UNSUPPORTED_TYPE: &str = "Please upload a PDF or Word document (.pdf, .doc, .docx)";

/// Collaborators needed by the pipeline.
pub struct IngestDeps<'a> {
    pub store: &'a dyn EntityStore,
    pub storage: &'a dyn FileStorage,
    pub ai: &'a dyn AiCapability,
    pub max_upload_bytes: usize,
}

/// Runs the full ingestion and records the outcome on `progress`.
pub async fn ingest(
    deps: IngestDeps<'_>,
    file: IncomingFile,
    progress: &ProgressReporter,
) -> Result<ResumeRow, AppError> {
    match run(&deps, file, progress).await {
        Ok(resume) => {
            progress.succeed(resume.id);
            Ok(resume)
        }
        Err(e) => {
            warn!("Resume ingestion failed: {e}");
            progress.fail(&e);
            Err(e)
        }
    }
}

async fn run(
    deps: &IngestDeps<'_>,
    file: IncomingFile,
    progress: &ProgressReporter,
) -> Result<ResumeRow, AppError> {
    // Stage 1: upload
    let kind = check_upload(&file, deps.max_upload_bytes)?;
    let document = deps
        .storage
        .upload(&file, kind)
        .await
        .map_err(|e| AppError::Upload(format!("Upload of {} failed: {e}", file.file_name)))?;
    progress.advance(IngestStage::Extraction, UPLOAD_CHECKPOINT);

    // Stage 2: extraction
    let extracted = extract(deps.ai, &document, progress).await?;
    progress.advance(IngestStage::Persistence, EXTRACTION_CHECKPOINT);

    // Stage 3: persistence
    let resume = deps
        .store
        .create_resume(extracted.into_new_resume(document.file_url.clone()))
        .await?;

    info!(
        "Ingested resume {} for {} (ats_score={})",
        resume.id, resume.candidate_name, resume.ats_score
    );
    Ok(resume)
}

/// Rejects empty, oversized, and non-document uploads.
fn check_upload(file: &IncomingFile, max_bytes: usize) -> Result<DocumentKind, AppError> {
    let kind = DocumentKind::detect(&file.file_name, file.content_type.as_deref())
        .ok_or_else(|| AppError::Upload(UNSUPPORTED_TYPE.to_string()))?;
    if file.bytes.is_empty() {
        return Err(AppError::Upload(format!("{} is empty", file.file_name)));
    }
    if file.bytes.len() > max_bytes {
        return Err(AppError::Upload(format!(
            "{} is {} bytes; the limit is {max_bytes}",
            file.file_name,
            file.bytes.len()
        )));
    }
    Ok(kind)
}

async fn extract(
    ai: &dyn AiCapability,
    document: &UploadedDocument,
    progress: &ProgressReporter,
) -> Result<crate::ingestion::schema::ExtractedResume, AppError> {
    let outcome = ai
        .extract(document, &resume_schema())
        .await
        .map_err(|e| AppError::Extraction(format!("Extraction service failed: {e}")))?;

    let output = match (outcome.status, outcome.output) {
        (ExtractionStatus::Success, Some(output)) => output,
        _ => {
            return Err(AppError::Extraction(
                outcome
                    .details
                    .unwrap_or_else(|| "Failed to extract resume data".to_string()),
            ))
        }
    };
    progress.advance(IngestStage::Extraction, EXTRACTION_RECEIVED);

    validate_extraction(output).map_err(AppError::Extraction)
}
