//! Question Generation: builds a role-aware prompt, validates the model's
//! question set, and persists it with a new `scheduled` session.
//!
//! The question set is all-or-nothing: anything short of exactly
//! `QUESTION_COUNT` well-formed questions fails with `AppError::Generation`
//! and nothing is written.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::prompts::QUESTION_PROMPT_TEMPLATE;
use crate::llm_client::capability::{AiCapability, InvokeOptions};
use crate::llm_client::prompts::fill_template;
use crate::models::question::{Difficulty, NewQuestion, QuestionRow, QuestionType};
use crate::models::resume::ResumeRow;
use crate::models::session::{NewSession, SessionRow};
use crate::store::EntityStore;

pub const QUESTION_COUNT: usize = 5;
pub const DEFAULT_TARGET_ROLE: &str = "Software Engineer";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedQuestionSet {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratedQuestion {
    question: String,
    #[serde(rename = "type")]
    question_type: QuestionType,
    difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSession {
    pub session: SessionRow,
    pub questions: Vec<QuestionRow>,
}

/// JSON Schema for the generation call.
pub fn question_set_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["questions"],
        "properties": {
            "questions": {
                "type": "array",
                "minItems": QUESTION_COUNT,
                "maxItems": QUESTION_COUNT,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["question", "type", "difficulty"],
                    "properties": {
                        "question": {"type": "string"},
                        "type": {"type": "string", "enum": ["technical", "behavioral", "situational"]},
                        "difficulty": {"type": "string", "enum": ["easy", "medium", "hard"]}
                    }
                }
            }
        }
    })
}

/// Same résumé and role always produce the same prompt.
pub fn build_question_prompt(resume: &ResumeRow, target_role: &str) -> String {
    let skills = if resume.skills.is_empty() {
        "no specific skills listed".to_string()
    } else {
        resume.skills.join(", ")
    };
    let experience = match resume.experience_years {
        Some(1) => "1 year".to_string(),
        Some(years) => format!("{years} years"),
        None => "an unspecified number of years".to_string(),
    };

    let count = QUESTION_COUNT.to_string();
    fill_template(
        QUESTION_PROMPT_TEMPLATE,
        &[
            ("count", count.as_str()),
            ("target_role", target_role),
            ("skills", skills.as_str()),
            ("experience", experience.as_str()),
        ],
    )
}

/// Checks the model's output. Returns the questions in the order given.
pub fn validate_question_set(output: Value) -> Result<Vec<NewQuestion>, String> {
    let set: GeneratedQuestionSet =
        serde_json::from_value(output).map_err(|e| format!("question set violates schema: {e}"))?;

    if set.questions.len() != QUESTION_COUNT {
        return Err(format!(
            "expected {QUESTION_COUNT} questions, got {}",
            set.questions.len()
        ));
    }

    set.questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let text = q.question.trim();
            if text.is_empty() {
                return Err(format!("question {} has empty text", i + 1));
            }
            Ok(NewQuestion {
                question: text.to_string(),
                question_type: q.question_type,
                difficulty: q.difficulty,
            })
        })
        .collect()
}

/// Generates a question set for `resume` and persists it with a new session.
pub async fn generate_questions(
    store: &dyn EntityStore,
    ai: &dyn AiCapability,
    resume: &ResumeRow,
    target_role: &str,
    options: InvokeOptions,
) -> Result<GeneratedSession, AppError> {
    let target_role = target_role.trim();
    if target_role.is_empty() {
        return Err(AppError::Validation("target_role cannot be empty".to_string()));
    }

    info!(
        "Generating {QUESTION_COUNT} questions for resume {} as '{target_role}'",
        resume.id
    );
    let prompt = build_question_prompt(resume, target_role);
    let output = ai
        .generate(&prompt, &question_set_schema(), &options)
        .await
        .map_err(|e| AppError::Generation(format!("Question generation failed: {e}")))?;

    let questions = validate_question_set(output).map_err(|e| {
        warn!("Rejected generated question set for resume {}: {e}", resume.id);
        AppError::Generation(e)
    })?;

    let (session, questions) = store
        .create_session_with_questions(
            NewSession {
                resume_id: resume.id,
                target_role: target_role.to_string(),
            },
            questions,
        )
        .await?;

    info!(
        "Session {} scheduled with {} questions",
        session.id,
        questions.len()
    );
    Ok(GeneratedSession { session, questions })
}
