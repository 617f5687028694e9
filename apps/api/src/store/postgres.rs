use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{NewQuestion, QuestionRow};
use crate::models::response::{NewResponse, ResponseRow};
use crate::models::resume::{NewResume, ResumeRow};
use crate::models::session::{NewSession, SessionRow};
use crate::store::{
    response_rejected, EntityStore, SessionOrder, SessionQuery, SessionSnapshot, SessionTransition,
    Summarize,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn create_resume(&self, resume: NewResume) -> Result<ResumeRow, AppError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, candidate_name, email, phone, skills, experience_years, education,
                 work_experience, ats_score, recommended_domain, parsing_status, file_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&resume.candidate_name)
        .bind(&resume.email)
        .bind(&resume.phone)
        .bind(&resume.skills)
        .bind(resume.experience_years)
        .bind(Json(&resume.education))
        .bind(Json(&resume.work_experience))
        .bind(resume.ats_score)
        .bind(&resume.recommended_domain)
        .bind(resume.parsing_status)
        .bind(&resume.file_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_resume(&self, id: Uuid) -> Result<ResumeRow, AppError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
    }

    async fn list_resumes(&self, limit: i64) -> Result<Vec<ResumeRow>, AppError> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn count_resumes(&self) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM resumes")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_session_with_questions(
        &self,
        session: NewSession,
        questions: Vec<NewQuestion>,
    ) -> Result<(SessionRow, Vec<QuestionRow>), AppError> {
        let mut tx = self.pool.begin().await?;

        let session_row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO interview_sessions (id, resume_id, target_role, status)
            VALUES ($1, $2, $3, 'scheduled')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session.resume_id)
        .bind(&session.target_role)
        .fetch_one(&mut *tx)
        .await?;

        let mut question_rows = Vec::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            let row = sqlx::query_as::<_, QuestionRow>(
                r#"
                INSERT INTO questions (id, session_id, position, question, type, difficulty)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_row.id)
            .bind(position as i16)
            .bind(&question.question)
            .bind(question.question_type)
            .bind(question.difficulty)
            .fetch_one(&mut *tx)
            .await?;
            question_rows.push(row);
        }

        tx.commit().await?;

        info!(
            "Created session {} with {} questions",
            session_row.id,
            question_rows.len()
        );
        Ok((session_row, question_rows))
    }

    async fn get_session(&self, id: Uuid) -> Result<SessionRow, AppError> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM interview_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    async fn list_sessions(&self, query: &SessionQuery) -> Result<Vec<SessionRow>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM interview_sessions WHERE TRUE");
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(resume_id) = query.resume_id {
            qb.push(" AND resume_id = ").push_bind(resume_id);
        }
        if let Some(before) = query.started_before {
            qb.push(" AND started_at < ").push_bind(before);
        }
        qb.push(match query.order {
            SessionOrder::Newest => " ORDER BY created_at DESC",
            SessionOrder::Oldest => " ORDER BY created_at ASC",
        });
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        Ok(qb
            .build_query_as::<SessionRow>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn transition_session(
        &self,
        id: Uuid,
        transition: SessionTransition,
    ) -> Result<SessionRow, AppError> {
        // The WHERE clause is the check; the UPDATE is the set. Postgres row
        // locking makes the pair atomic, so only one racing caller sees a row.
        let updated = match &transition {
            SessionTransition::Start { at } => {
                sqlx::query_as::<_, SessionRow>(
                    r#"
                    UPDATE interview_sessions
                    SET status = 'in_progress', started_at = $2
                    WHERE id = $1 AND status = 'scheduled'
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(at)
                .fetch_optional(&self.pool)
                .await?
            }
            SessionTransition::Complete { at, outcome } => {
                sqlx::query_as::<_, SessionRow>(
                    r#"
                    UPDATE interview_sessions
                    SET status = 'completed', completed_at = $2, overall_score = $3,
                        strengths = $4, improvement_areas = $5
                    WHERE id = $1 AND status IN ('scheduled', 'in_progress')
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(at)
                .bind(outcome.overall_score)
                .bind(&outcome.strengths)
                .bind(&outcome.improvement_areas)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match updated {
            Some(row) => Ok(row),
            None => {
                let current = self.get_session(id).await?;
                Err(transition.rejected(id, current.status))
            }
        }
    }

    async fn complete_session(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        summarize: Summarize<'_>,
    ) -> Result<SessionSnapshot, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock held until commit; `create_response` waits on it.
        let session = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM interview_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE session_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let responses = sqlx::query_as::<_, ResponseRow>(
            "SELECT * FROM responses WHERE session_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let mut snapshot = SessionSnapshot {
            session,
            questions,
            responses,
        };

        let outcome = summarize(&snapshot);
        let transition = SessionTransition::Complete {
            at,
            outcome: outcome.clone(),
        };
        if !transition.allowed_from().contains(&snapshot.session.status) {
            return Err(transition.rejected(id, snapshot.session.status));
        }

        snapshot.session = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE interview_sessions
            SET status = 'completed', completed_at = $2, overall_score = $3,
                strengths = $4, improvement_areas = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(outcome.overall_score)
        .bind(&outcome.strengths)
        .bind(&outcome.improvement_areas)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(snapshot)
    }

    async fn get_question(&self, id: Uuid) -> Result<QuestionRow, AppError> {
        sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))
    }

    async fn list_questions(&self, session_id: Uuid) -> Result<Vec<QuestionRow>, AppError> {
        Ok(sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE session_id = $1 ORDER BY position",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_response(&self, response: NewResponse) -> Result<ResponseRow, AppError> {
        // FOR SHARE queues behind a concurrent `complete_session` and then
        // re-reads the status it committed. UNIQUE(question_id) + DO NOTHING
        // turns a lost duplicate race into no row.
        let inserted = sqlx::query_as::<_, ResponseRow>(
            r#"
            INSERT INTO responses (id, question_id, session_id, answer, feedback, ai_score)
            SELECT $1::uuid, $2::uuid, $3::uuid, $4::text, $5::text, $6::smallint
            WHERE EXISTS (
                SELECT 1 FROM interview_sessions
                WHERE id = $3::uuid AND status = 'in_progress'
                FOR SHARE
            )
            ON CONFLICT (question_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(response.question_id)
        .bind(response.session_id)
        .bind(&response.answer)
        .bind(&response.feedback)
        .bind(response.ai_score)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            None if self.find_response(response.question_id).await?.is_some() => {
                Err(AppError::DuplicateResponse(response.question_id))
            }
            None => {
                let session = self.get_session(response.session_id).await?;
                Err(response_rejected(session.id, session.status))
            }
        }
    }

    async fn find_response(&self, question_id: Uuid) -> Result<Option<ResponseRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ResponseRow>("SELECT * FROM responses WHERE question_id = $1")
                .bind(question_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_responses(&self, session_id: Uuid) -> Result<Vec<ResponseRow>, AppError> {
        Ok(sqlx::query_as::<_, ResponseRow>(
            "SELECT * FROM responses WHERE session_id = $1 ORDER BY created_at",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
