//! File storage for uploaded résumé documents (S3 / MinIO).

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Document formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
}

impl DocumentKind {
    /// Detects the kind from the declared content type, falling back to the
    /// file extension. Returns `None` for anything else.
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let by_mime = content_type.and_then(|ct| match ct {
            "application/pdf" => Some(DocumentKind::Pdf),
            "application/msword" => Some(DocumentKind::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentKind::Docx)
            }
            _ => None,
        });
        by_mime.or_else(|| {
            let lower = file_name.to_lowercase();
            if lower.ends_with(".pdf") {
                Some(DocumentKind::Pdf)
            } else if lower.ends_with(".docx") {
                Some(DocumentKind::Docx)
            } else if lower.ends_with(".doc") {
                Some(DocumentKind::Doc)
            } else {
                None
            }
        })
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Doc => "application/msword",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Doc => "doc",
            DocumentKind::Docx => "docx",
        }
    }
}

/// A file as received from the client, before upload.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A document after a successful upload. `bytes` stays attached so the
/// extraction stage does not need to fetch the object back.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_url: String,
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Bytes,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(
        &self,
        file: &IncomingFile,
        kind: DocumentKind,
    ) -> Result<UploadedDocument, AppError>;
}

pub struct S3FileStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3FileStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, endpoint: String) -> Self {
        Self {
            client,
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStorage for S3FileStorage {
    async fn upload(
        &self,
        file: &IncomingFile,
        kind: DocumentKind,
    ) -> Result<UploadedDocument, AppError> {
        let key = object_key(Uuid::new_v4(), &file.file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(kind.content_type())
            .send()
            .await
            .map_err(|e| AppError::S3(format!("S3 upload failed: {e}")))?;

        info!("Uploaded résumé to s3://{}/{}", self.bucket, key);

        Ok(UploadedDocument {
            file_url: format!("{}/{}/{}", self.endpoint, self.bucket, key),
            file_name: file.file_name.clone(),
            kind,
            bytes: file.bytes.clone(),
        })
    }
}

/// `resumes/<uuid>/<sanitized file name>`
pub fn object_key(id: Uuid, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("resumes/{id}/{sanitized}")
}
