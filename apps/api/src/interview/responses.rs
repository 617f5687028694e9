//! Response Collector: scores an answer and records it, once per question.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::prompts::SCORING_PROMPT_TEMPLATE;
use crate::llm_client::capability::AiCapability;
use crate::llm_client::prompts::fill_template;
use crate::models::question::{Difficulty, QuestionRow};
use crate::models::response::{NewResponse, ResponseRow};
use crate::models::session::SessionStatus;
use crate::store::{response_rejected, EntityStore};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoredAnswer {
    feedback: String,
    ai_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedScore {
    pub feedback: String,
    pub ai_score: i16,
}

pub fn scoring_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["feedback", "ai_score"],
        "properties": {
            "feedback": {"type": "string"},
            "ai_score": {"type": "integer", "minimum": 0, "maximum": 100}
        }
    })
}

fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

pub fn build_scoring_prompt(question: &QuestionRow, target_role: &str, answer: &str) -> String {
    fill_template(
        SCORING_PROMPT_TEMPLATE,
        &[
            ("target_role", target_role),
            ("question_type", question.question_type.as_str()),
            ("difficulty", difficulty_label(question.difficulty)),
            ("question", question.question.as_str()),
            ("answer", answer),
        ],
    )
}

/// Rejects out-of-range scores rather than clamping them.
pub fn validate_score(output: Value) -> Result<ValidatedScore, String> {
    let scored: ScoredAnswer =
        serde_json::from_value(output).map_err(|e| format!("score violates schema: {e}"))?;

    if !scored.ai_score.is_finite() || !(0.0..=100.0).contains(&scored.ai_score) {
        return Err(format!("ai_score {} is outside 0..=100", scored.ai_score));
    }
    let feedback = scored.feedback.trim();
    if feedback.is_empty() {
        return Err("feedback is empty".to_string());
    }

    Ok(ValidatedScore {
        feedback: feedback.to_string(),
        ai_score: scored.ai_score.round() as i16,
    })
}

/// Scores `answer` for `question_id` and stores it. Only accepted while the
/// owning session is `in_progress`, checked again at write time so a session
/// ended during scoring rejects the answer. A question that already has a
/// response fails with `DuplicateResponse` before any scoring call is made.
pub async fn record_response(
    store: &dyn EntityStore,
    ai: &dyn AiCapability,
    question_id: Uuid,
    answer: &str,
) -> Result<ResponseRow, AppError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(AppError::Validation("answer cannot be empty".to_string()));
    }

    let question = store.get_question(question_id).await?;
    let session = store.get_session(question.session_id).await?;
    if session.status != SessionStatus::InProgress {
        return Err(response_rejected(session.id, session.status));
    }

    if store.find_response(question_id).await?.is_some() {
        return Err(AppError::DuplicateResponse(question_id));
    }

    let prompt = build_scoring_prompt(&question, &session.target_role, answer);
    let output = ai
        .score(&prompt, &scoring_schema())
        .await
        .map_err(|e| AppError::Scoring(format!("Scoring service failed: {e}")))?;
    let scored = validate_score(output).map_err(AppError::Scoring)?;

    let response = store
        .create_response(NewResponse {
            question_id,
            session_id: session.id,
            answer: answer.to_string(),
            feedback: scored.feedback,
            ai_score: scored.ai_score,
        })
        .await?;

    info!(
        "Recorded response for question {question_id} in session {} (score {})",
        session.id, response.ai_score
    );
    Ok(response)
}
