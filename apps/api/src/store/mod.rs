//! Entity Store: typed persistence for résumés, sessions, questions and
//! responses.
//!
//! `AppState` holds an `Arc<dyn EntityStore>`. `PgStore` is the production
//! backend; tests run against `memory::MemoryStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{NewQuestion, QuestionRow};
use crate::models::response::{NewResponse, ResponseRow};
use crate::models::resume::{NewResume, ResumeRow};
use crate::models::session::{NewSession, SessionRow, SessionStatus};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrder {
    #[default]
    Newest,
    Oldest,
}

/// Filter for session listings. Every field is optional; the default lists
/// all sessions newest first.
#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub status: Option<SessionStatus>,
    pub resume_id: Option<Uuid>,
    pub started_before: Option<DateTime<Utc>>,
    pub order: SessionOrder,
    pub limit: Option<i64>,
}

/// Results written onto a session as it completes.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub overall_score: i16,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
}

/// A lifecycle step. Stores apply it as one atomic check-and-set: the row is
/// only touched if its current status is in `allowed_from()`.
#[derive(Debug, Clone)]
pub enum SessionTransition {
    Start { at: DateTime<Utc> },
    Complete {
        at: DateTime<Utc>,
        outcome: SessionOutcome,
    },
}

impl SessionTransition {
    pub fn allowed_from(&self) -> &'static [SessionStatus] {
        match self {
            SessionTransition::Start { .. } => &[SessionStatus::Scheduled],
            SessionTransition::Complete { .. } => {
                &[SessionStatus::Scheduled, SessionStatus::InProgress]
            }
        }
    }

    pub fn target(&self) -> SessionStatus {
        match self {
            SessionTransition::Start { .. } => SessionStatus::InProgress,
            SessionTransition::Complete { .. } => SessionStatus::Completed,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            SessionTransition::Start { .. } => "start",
            SessionTransition::Complete { .. } => "end",
        }
    }

    /// The error returned when the check half of the check-and-set fails.
    pub fn rejected(&self, session_id: Uuid, current: SessionStatus) -> AppError {
        AppError::StateTransition(format!(
            "cannot {} session {session_id}: status is {current}",
            self.verb()
        ))
    }
}

/// A session with its questions and responses, read under the session's lock.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: SessionRow,
    pub questions: Vec<QuestionRow>,
    pub responses: Vec<ResponseRow>,
}

/// Derives the completion outcome from a locked snapshot.
pub type Summarize<'a> = &'a (dyn Fn(&SessionSnapshot) -> SessionOutcome + Send + Sync);

/// The error for a response written to a session that no longer accepts them.
pub fn response_rejected(session_id: Uuid, current: SessionStatus) -> AppError {
    AppError::StateTransition(format!(
        "session {session_id} is {current}; responses are accepted only while it is in_progress"
    ))
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, AppError>;

    /// Fails with `AppError::NotFound` when absent.
    async fn get_resume(&self, id: Uuid) -> Result<ResumeRow, AppError>;

    /// Newest first.
    async fn list_resumes(&self, limit: i64) -> Result<Vec<ResumeRow>, AppError>;

    async fn count_resumes(&self) -> Result<i64, AppError>;

    /// Creates a `scheduled` session together with its full question batch.
    /// Either everything is persisted or nothing is.
    async fn create_session_with_questions(
        &self,
        session: NewSession,
        questions: Vec<NewQuestion>,
    ) -> Result<(SessionRow, Vec<QuestionRow>), AppError>;

    async fn get_session(&self, id: Uuid) -> Result<SessionRow, AppError>;

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<SessionRow>, AppError>;

    /// Atomic per-session check-and-set. Fails with `StateTransition` if the
    /// session is not in one of `transition.allowed_from()`.
    async fn transition_session(
        &self,
        id: Uuid,
        transition: SessionTransition,
    ) -> Result<SessionRow, AppError>;

    /// Completes a `scheduled` or `in_progress` session. The snapshot handed
    /// to `summarize` and the status change happen under one lock on the
    /// session, so no response can land between reading and completing.
    /// Returns the snapshot with the completed session row.
    async fn complete_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        summarize: Summarize<'_>,
    ) -> Result<SessionSnapshot, AppError>;

    async fn get_question(&self, id: Uuid) -> Result<QuestionRow, AppError>;

    /// Ordered by position.
    async fn list_questions(&self, session_id: Uuid) -> Result<Vec<QuestionRow>, AppError>;

    /// Write-once. A second response for the same question fails with
    /// `DuplicateResponse`; a session that is not `in_progress` at write time
    /// fails with `StateTransition`. Either way the store is unchanged.
    async fn create_response(&self, response: NewResponse) -> Result<ResponseRow, AppError>;

    async fn find_response(&self, question_id: Uuid) -> Result<Option<ResponseRow>, AppError>;

    async fn list_responses(&self, session_id: Uuid) -> Result<Vec<ResponseRow>, AppError>;
}
