//! Axum route handlers for interview sessions and responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::cursor::QuestionCursor;
use crate::interview::generation::{generate_questions, GeneratedSession, DEFAULT_TARGET_ROLE};
use crate::interview::lifecycle::{advance_session, end_session, start_session, Advance};
use crate::interview::responses::record_response;
use crate::llm_client::capability::InvokeOptions;
use crate::models::question::QuestionRow;
use crate::models::response::ResponseRow;
use crate::models::session::{SessionRow, SessionStatus};
use crate::results::aggregator::ResultsSummary;
use crate::state::AppState;
use crate::store::{SessionOrder, SessionQuery};

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub resume_id: Uuid,
    pub target_role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<SessionStatus>,
    pub resume_id: Option<Uuid>,
    #[serde(default)]
    pub order: SessionOrder,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub session: SessionRow,
    pub questions: Vec<QuestionRow>,
    pub responses: Vec<ResponseRow>,
    /// First unanswered question, if any remain.
    pub next_question_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct EndedSession {
    pub session: SessionRow,
    pub summary: ResultsSummary,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// The question the caller's cursor is currently on.
    pub from_question_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

/// POST /api/v1/sessions
///
/// Generates the question set and schedules a session for the résumé.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<GeneratedSession>), AppError> {
    let resume = state.store.get_resume(body.resume_id).await?;
    let target_role = body
        .target_role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_TARGET_ROLE);
    let options = InvokeOptions {
        augment_with_external_context: state.config.question_web_context,
    };

    let generated = generate_questions(
        state.store.as_ref(),
        state.ai.as_ref(),
        &resume,
        target_role,
        options,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(generated)))
}

/// GET /api/v1/sessions
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionRow>>, AppError> {
    let query = SessionQuery {
        status: params.status,
        resume_id: params.resume_id,
        started_before: None,
        order: params.order,
        limit: Some(
            params
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
        ),
    };
    Ok(Json(state.store.list_sessions(&query).await?))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, AppError> {
    let session = state.store.get_session(id).await?;
    let questions = state.store.list_questions(id).await?;
    let responses = state.store.list_responses(id).await?;
    let next_question_id = QuestionCursor::resume(questions.clone(), &responses)
        .current()
        .map(|q| q.id);

    Ok(Json(SessionDetail {
        session,
        questions,
        responses,
        next_question_id,
    }))
}

/// POST /api/v1/sessions/:id/start
pub async fn handle_start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionRow>, AppError> {
    Ok(Json(start_session(state.store.as_ref(), id).await?))
}

/// POST /api/v1/sessions/:id/end
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EndedSession>, AppError> {
    let (session, summary) =
        end_session(state.store.as_ref(), state.summaries.as_ref(), id).await?;
    Ok(Json(EndedSession { session, summary }))
}

/// POST /api/v1/sessions/:id/advance
///
/// Returns the next question, or ends the session after the last one.
pub async fn handle_advance_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdvanceRequest>,
) -> Result<Json<Advance>, AppError> {
    Ok(Json(
        advance_session(
            state.store.as_ref(),
            state.summaries.as_ref(),
            id,
            body.from_question_id,
        )
        .await?,
    ))
}

/// POST /api/v1/questions/:id/response
pub async fn handle_submit_response(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    Json(body): Json<SubmitAnswerRequest>,
) -> Result<(StatusCode, Json<ResponseRow>), AppError> {
    let response = record_response(
        state.store.as_ref(),
        state.ai.as_ref(),
        question_id,
        &body.answer,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
