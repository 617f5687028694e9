use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A scored answer. At most one exists per question; never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResponseRow {
    pub id: Uuid,
    pub question_id: Uuid,
    pub session_id: Uuid,
    pub answer: String,
    pub feedback: String,
    pub ai_score: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub question_id: Uuid,
    pub session_id: Uuid,
    pub answer: String,
    pub feedback: String,
    pub ai_score: i16,
}
