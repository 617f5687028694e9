use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "parsing_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParsingStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub duration: Option<String>,
}

/// A persisted résumé. Written once by the ingestion pipeline; only
/// `parsing_status` may change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub candidate_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub education: Json<Vec<Education>>,
    pub work_experience: Json<Vec<WorkExperience>>,
    pub ats_score: i16,
    pub recommended_domain: Option<String>,
    pub parsing_status: ParsingStatus,
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a résumé insert. Produced from validated extraction output.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub candidate_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<i32>,
    pub education: Vec<Education>,
    pub work_experience: Vec<WorkExperience>,
    pub ats_score: i16,
    pub recommended_domain: Option<String>,
    pub parsing_status: ParsingStatus,
    pub file_url: String,
}
