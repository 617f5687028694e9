use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{NewQuestion, QuestionRow};
use crate::models::response::{NewResponse, ResponseRow};
use crate::models::resume::{NewResume, ResumeRow};
use crate::models::session::{NewSession, SessionRow, SessionStatus};
use crate::store::{
    response_rejected, EntityStore, SessionOrder, SessionQuery, SessionSnapshot, SessionTransition,
    Summarize,
};

#[derive(Default)]
struct Tables {
    resumes: Vec<ResumeRow>,
    sessions: Vec<SessionRow>,
    questions: Vec<QuestionRow>,
    responses: Vec<ResponseRow>,
    /// Monotonic clock so `created_at` ordering is deterministic in tests.
    ticks: i64,
}

impl Tables {
    fn next_created_at(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc.timestamp_opt(self.ticks, 0).unwrap()
    }
}

/// In-memory `EntityStore`. A single mutex over all tables gives every
/// operation the same atomicity the Postgres backend provides.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent create fail, to exercise rollback paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn resume_count(&self) -> usize {
        self.tables.lock().await.resumes.len()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }

    pub async fn question_count(&self) -> usize {
        self.tables.lock().await.questions.len()
    }

    /// Moves a session's `started_at` into the past.
    pub async fn backdate_session(&self, id: Uuid, started_minutes_ago: i64) {
        let mut tables = self.tables.lock().await;
        if let Some(s) = tables.sessions.iter_mut().find(|s| s.id == id) {
            s.started_at = Some(Utc::now() - Duration::minutes(started_minutes_ago));
        }
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("injected store failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let row = ResumeRow {
            id: Uuid::new_v4(),
            candidate_name: resume.candidate_name,
            email: resume.email,
            phone: resume.phone,
            skills: resume.skills,
            experience_years: resume.experience_years,
            education: Json(resume.education),
            work_experience: Json(resume.work_experience),
            ats_score: resume.ats_score,
            recommended_domain: resume.recommended_domain,
            parsing_status: resume.parsing_status,
            file_url: resume.file_url,
            created_at: tables.next_created_at(),
        };
        tables.resumes.push(row.clone());
        Ok(row)
    }

    async fn get_resume(&self, id: Uuid) -> Result<ResumeRow, AppError> {
        let tables = self.tables.lock().await;
        tables
            .resumes
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
    }

    async fn list_resumes(&self, limit: i64) -> Result<Vec<ResumeRow>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows = tables.resumes.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn count_resumes(&self) -> Result<i64, AppError> {
        Ok(self.tables.lock().await.resumes.len() as i64)
    }

    async fn create_session_with_questions(
        &self,
        session: NewSession,
        questions: Vec<NewQuestion>,
    ) -> Result<(SessionRow, Vec<QuestionRow>), AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let created_at = tables.next_created_at();
        let session_row = SessionRow {
            id: Uuid::new_v4(),
            resume_id: session.resume_id,
            target_role: session.target_role,
            status: SessionStatus::Scheduled,
            started_at: None,
            completed_at: None,
            overall_score: None,
            strengths: None,
            improvement_areas: None,
            created_at,
        };
        let question_rows: Vec<QuestionRow> = questions
            .into_iter()
            .enumerate()
            .map(|(position, q)| QuestionRow {
                id: Uuid::new_v4(),
                session_id: session_row.id,
                position: position as i16,
                question: q.question,
                question_type: q.question_type,
                difficulty: q.difficulty,
                created_at,
            })
            .collect();
        tables.sessions.push(session_row.clone());
        tables.questions.extend(question_rows.iter().cloned());
        Ok((session_row, question_rows))
    }

    async fn get_session(&self, id: Uuid) -> Result<SessionRow, AppError> {
        let tables = self.tables.lock().await;
        tables
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<SessionRow>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<SessionRow> = tables
            .sessions
            .iter()
            .filter(|s| query.status.map_or(true, |st| s.status == st))
            .filter(|s| query.resume_id.map_or(true, |id| s.resume_id == id))
            .filter(|s| {
                query
                    .started_before
                    .map_or(true, |cutoff| s.started_at.is_some_and(|t| t < cutoff))
            })
            .cloned()
            .collect();
        match query.order {
            SessionOrder::Newest => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SessionOrder::Oldest => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn transition_session(
        &self,
        id: Uuid,
        transition: SessionTransition,
    ) -> Result<SessionRow, AppError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        apply(session, transition)?;
        Ok(session.clone())
    }

    async fn complete_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        summarize: Summarize<'_>,
    ) -> Result<SessionSnapshot, AppError> {
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        let mut questions: Vec<QuestionRow> = tables
            .questions
            .iter()
            .filter(|q| q.session_id == id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.position);
        let responses: Vec<ResponseRow> = tables
            .responses
            .iter()
            .filter(|r| r.session_id == id)
            .cloned()
            .collect();
        let mut snapshot = SessionSnapshot {
            session,
            questions,
            responses,
        };

        let transition = SessionTransition::Complete {
            at,
            outcome: summarize(&snapshot),
        };
        let stored = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        apply(stored, transition)?;
        snapshot.session = stored.clone();
        Ok(snapshot)
    }

    async fn get_question(&self, id: Uuid) -> Result<QuestionRow, AppError> {
        let tables = self.tables.lock().await;
        tables
            .questions
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))
    }

    async fn list_questions(&self, session_id: Uuid) -> Result<Vec<QuestionRow>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<QuestionRow> = tables
            .questions
            .iter()
            .filter(|q| q.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by_key(|q| q.position);
        Ok(rows)
    }

    async fn create_response(&self, response: NewResponse) -> Result<ResponseRow, AppError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let session = tables
            .sessions
            .iter()
            .find(|s| s.id == response.session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", response.session_id)))?;
        if session.status != SessionStatus::InProgress {
            return Err(response_rejected(session.id, session.status));
        }
        if tables
            .responses
            .iter()
            .any(|r| r.question_id == response.question_id)
        {
            return Err(AppError::DuplicateResponse(response.question_id));
        }
        let row = ResponseRow {
            id: Uuid::new_v4(),
            question_id: response.question_id,
            session_id: response.session_id,
            answer: response.answer,
            feedback: response.feedback,
            ai_score: response.ai_score,
            created_at: tables.next_created_at(),
        };
        tables.responses.push(row.clone());
        Ok(row)
    }

    async fn find_response(&self, question_id: Uuid) -> Result<Option<ResponseRow>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .responses
            .iter()
            .find(|r| r.question_id == question_id)
            .cloned())
    }

    async fn list_responses(&self, session_id: Uuid) -> Result<Vec<ResponseRow>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}

/// Check-and-set on one row; the caller holds the tables lock.
fn apply(session: &mut SessionRow, transition: SessionTransition) -> Result<(), AppError> {
    if !transition.allowed_from().contains(&session.status) {
        return Err(transition.rejected(session.id, session.status));
    }
    session.status = transition.target();
    match transition {
        SessionTransition::Start { at } => {
            session.started_at = Some(at);
        }
        SessionTransition::Complete { at, outcome } => {
            session.completed_at = Some(at);
            session.overall_score = Some(outcome.overall_score);
            session.strengths = Some(outcome.strengths);
            session.improvement_areas = Some(outcome.improvement_areas);
        }
    }
    Ok(())
}
