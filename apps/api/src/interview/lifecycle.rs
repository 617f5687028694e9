//! Session State Machine. `scheduled -> in_progress -> completed`, nothing
//! else. Each step is applied by the store as an atomic check-and-set, so two
//! concurrent `end` calls produce exactly one completion.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::cursor::{CursorStep, QuestionCursor};
use crate::interview::generation::QUESTION_COUNT;
use crate::models::question::QuestionRow;
use crate::models::session::{SessionRow, SessionStatus};
use crate::results::aggregator::{compute_summary, remember, ResultsSummary};
use crate::results::cache::SummaryCache;
use crate::store::{EntityStore, SessionSnapshot, SessionTransition};

/// `scheduled -> in_progress`. Refused unless the full question set exists.
pub async fn start_session(
    store: &dyn EntityStore,
    session_id: Uuid,
) -> Result<SessionRow, AppError> {
    let transition = SessionTransition::Start { at: Utc::now() };
    let session = store.get_session(session_id).await?;
    if session.status != SessionStatus::Scheduled {
        return Err(transition.rejected(session_id, session.status));
    }

    let questions = store.list_questions(session_id).await?;
    if questions.len() != QUESTION_COUNT {
        return Err(AppError::StateTransition(format!(
            "cannot start session {session_id}: it has {} of {QUESTION_COUNT} questions",
            questions.len()
        )));
    }

    let started = store.transition_session(session_id, transition).await?;
    info!("Session {session_id} started");
    Ok(started)
}

/// Ends a `scheduled` or `in_progress` session, persisting its results in the
/// same step. Ending a completed session is a `StateTransition` error.
pub async fn end_session(
    store: &dyn EntityStore,
    cache: &dyn SummaryCache,
    session_id: Uuid,
) -> Result<(SessionRow, ResultsSummary), AppError> {
    let completed = store
        .complete_session(session_id, Utc::now(), &|snapshot: &SessionSnapshot| {
            compute_summary(&snapshot.session, &snapshot.questions, &snapshot.responses).outcome()
        })
        .await?;
    let summary = compute_summary(&completed.session, &completed.questions, &completed.responses);
    info!(
        "Session {session_id} completed with overall score {} ({} of {} answered)",
        summary.overall_score, summary.answered_questions, summary.total_questions
    );

    remember(cache, &summary).await;
    Ok((completed.session, summary))
}

#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Advance {
    Next { question: QuestionRow },
    Finished { session: SessionRow, summary: ResultsSummary },
}

/// Moves the caller's cursor past `from_question`. Stepping past the last
/// question ends the session.
pub async fn advance_session(
    store: &dyn EntityStore,
    cache: &dyn SummaryCache,
    session_id: Uuid,
    from_question: Uuid,
) -> Result<Advance, AppError> {
    let session = store.get_session(session_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(AppError::StateTransition(format!(
            "cannot advance session {session_id}: status is {}",
            session.status
        )));
    }

    let questions = store.list_questions(session_id).await?;
    let mut cursor = QuestionCursor::at(questions, from_question).ok_or_else(|| {
        AppError::NotFound(format!(
            "Question {from_question} not found in session {session_id}"
        ))
    })?;

    match cursor.advance() {
        CursorStep::Next(question) => Ok(Advance::Next {
            question: question.clone(),
        }),
        CursorStep::Finished => {
            let (session, summary) = end_session(store, cache, session_id).await?;
            Ok(Advance::Finished { session, summary })
        }
    }
}
