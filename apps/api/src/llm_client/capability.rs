//! The AI capability seam.
//!
//! Extraction, question generation and answer scoring are three separate
//! operations on one trait so each can be scripted independently in tests.
//! `AppState` carries an `Arc<dyn AiCapability>`; production uses `LlmClient`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::prompts::{
    fill_template, EXTRACTION_PROMPT, JSON_ONLY_SYSTEM, SCHEMA_INSTRUCTION,
};
use crate::llm_client::{CallOptions, LlmClient, LlmError};
use crate::storage::{DocumentKind, UploadedDocument};

/// Upper bound on document text forwarded to the model.
const MAX_DOCUMENT_CHARS: usize = 60_000;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InvokeOptions {
    /// Allow the provider to consult external sources (web search).
    pub augment_with_external_context: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Success,
    Failure,
}

/// Result of an extraction call. `output` is present on success, `details`
/// explains a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub status: ExtractionStatus,
    pub output: Option<Value>,
    pub details: Option<String>,
}

impl ExtractionOutcome {
    pub fn success(output: Value) -> Self {
        Self {
            status: ExtractionStatus::Success,
            output: Some(output),
            details: None,
        }
    }

    pub fn failure(details: impl Into<String>) -> Self {
        Self {
            status: ExtractionStatus::Failure,
            output: None,
            details: Some(details.into()),
        }
    }
}

#[async_trait]
pub trait AiCapability: Send + Sync {
    /// Pulls structured fields matching `schema` out of an uploaded document.
    async fn extract(
        &self,
        document: &UploadedDocument,
        schema: &Value,
    ) -> Result<ExtractionOutcome, LlmError>;

    /// Produces a JSON value for `prompt` that should conform to `schema`.
    /// Conformance is checked by the caller.
    async fn generate(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InvokeOptions,
    ) -> Result<Value, LlmError>;

    /// Scores a candidate answer; same contract as `generate` without options.
    async fn score(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError>;
}

#[async_trait]
impl AiCapability for LlmClient {
    async fn extract(
        &self,
        document: &UploadedDocument,
        schema: &Value,
    ) -> Result<ExtractionOutcome, LlmError> {
        let text = match document.kind {
            DocumentKind::Pdf => {
                let bytes = document.bytes.clone();
                // CPU-bound; runs on the blocking pool.
                let parsed = tokio::task::spawn_blocking(move || {
                    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
                })
                .await;
                match parsed {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        warn!("PDF text extraction failed for {}: {e}", document.file_name);
                        return Ok(ExtractionOutcome::failure(format!(
                            "Could not read PDF text: {e}"
                        )));
                    }
                    Err(e) => {
                        return Ok(ExtractionOutcome::failure(format!(
                            "PDF text extraction task failed: {e}"
                        )));
                    }
                }
            }
            other => {
                return Ok(ExtractionOutcome::failure(format!(
                    "No text extractor available for .{} documents",
                    other.as_str()
                )));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(ExtractionOutcome::failure(
                "Document contains no extractable text",
            ));
        }
        let text: String = text.chars().take(MAX_DOCUMENT_CHARS).collect();

        let schema_text = serde_json::to_string_pretty(schema)?;
        let prompt = fill_template(
            EXTRACTION_PROMPT,
            &[("schema", schema_text.as_str()), ("document_text", text.as_str())],
        );

        let output: Value = self.call_json(&prompt, JSON_ONLY_SYSTEM).await?;
        info!("Extraction returned output for {}", document.file_url);
        Ok(ExtractionOutcome::success(output))
    }

    async fn generate(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InvokeOptions,
    ) -> Result<Value, LlmError> {
        let prompt = with_schema(prompt, schema)?;
        self.call_json_with(
            &prompt,
            JSON_ONLY_SYSTEM,
            CallOptions {
                web_search: options.augment_with_external_context,
            },
        )
        .await
    }

    async fn score(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        let prompt = with_schema(prompt, schema)?;
        self.call_json(&prompt, JSON_ONLY_SYSTEM).await
    }
}

fn with_schema(prompt: &str, schema: &Value) -> Result<String, LlmError> {
    Ok(format!(
        "{}\n\n{}\n{}",
        prompt.trim(),
        SCHEMA_INSTRUCTION,
        serde_json::to_string_pretty(schema)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_schema_appends_schema_after_instruction() {
        let schema = json!({"type": "object"});
        let prompt = with_schema("  Score this.  ", &schema).unwrap();
        assert!(prompt.starts_with("Score this.\n\n"));
        let schema_at = prompt.find("\"type\"").unwrap();
        let instruction_at = prompt.find(SCHEMA_INSTRUCTION).unwrap();
        assert!(instruction_at < schema_at);
    }

    #[test]
    fn test_extraction_outcome_wire_shape() {
        let value = serde_json::to_value(ExtractionOutcome::failure("unreadable")).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["details"], "unreadable");
        assert!(value["output"].is_null());
    }
}
