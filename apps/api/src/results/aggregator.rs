//! Results Aggregator: folds a session's scored responses into an overall
//! score, per-category means, strengths and improvement areas.
//!
//! `compute_summary` is pure: the same questions and responses always yield
//! the same summary. Unanswered questions count toward nothing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{Difficulty, QuestionRow, QuestionType};
use crate::models::response::ResponseRow;
use crate::models::session::{SessionRow, SessionStatus};
use crate::results::cache::SummaryCache;
use crate::store::{EntityStore, SessionOutcome};

/// Category means at or above this are strengths.
pub const STRENGTH_THRESHOLD: f64 = 80.0;
/// Category means strictly below this are improvement areas.
pub const IMPROVEMENT_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= STRENGTH_THRESHOLD {
            ScoreBand::Excellent
        } else if score >= IMPROVEMENT_THRESHOLD {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: QuestionType,
    pub mean_score: f64,
    pub answered: usize,
    pub band: ScoreBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub position: i16,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub answer: Option<String>,
    pub feedback: Option<String>,
    pub ai_score: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub session_id: Uuid,
    pub target_role: String,
    pub overall_score: i16,
    pub overall_band: ScoreBand,
    pub total_questions: usize,
    pub answered_questions: usize,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub categories: Vec<CategoryScore>,
    pub questions: Vec<QuestionResult>,
}

impl ResultsSummary {
    pub fn outcome(&self) -> SessionOutcome {
        SessionOutcome {
            overall_score: self.overall_score,
            strengths: self.strengths.clone(),
            improvement_areas: self.improvement_areas.clone(),
        }
    }
}

fn mean(scores: &[i16]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Some(sum as f64 / scores.len() as f64)
}

/// Builds the summary for `session` from its questions and responses.
/// Responses to questions outside the session are ignored.
pub fn compute_summary(
    session: &SessionRow,
    questions: &[QuestionRow],
    responses: &[ResponseRow],
) -> ResultsSummary {
    let mut ordered: Vec<&QuestionRow> = questions
        .iter()
        .filter(|q| q.session_id == session.id)
        .collect();
    ordered.sort_by_key(|q| q.position);

    let known: HashSet<Uuid> = ordered.iter().map(|q| q.id).collect();
    let answered: Vec<&ResponseRow> = responses
        .iter()
        .filter(|r| known.contains(&r.question_id))
        .collect();
    let response_for = |id: Uuid| answered.iter().find(|r| r.question_id == id).copied();

    let all_scores: Vec<i16> = answered.iter().map(|r| r.ai_score).collect();
    let overall_score = mean(&all_scores).map(|m| m.round() as i16).unwrap_or(0);

    let mut categories = Vec::new();
    let mut strengths = Vec::new();
    let mut improvement_areas = Vec::new();
    for category in QuestionType::ALL {
        let scores: Vec<i16> = ordered
            .iter()
            .filter(|q| q.question_type == category)
            .filter_map(|q| response_for(q.id))
            .map(|r| r.ai_score)
            .collect();
        let Some(mean_score) = mean(&scores) else {
            continue;
        };

        if mean_score >= STRENGTH_THRESHOLD {
            strengths.push(category.as_str().to_string());
        }
        if mean_score < IMPROVEMENT_THRESHOLD {
            improvement_areas.push(category.as_str().to_string());
        }
        categories.push(CategoryScore {
            category,
            mean_score,
            answered: scores.len(),
            band: ScoreBand::for_score(mean_score),
        });
    }

    let questions = ordered
        .iter()
        .map(|q| {
            let response = response_for(q.id);
            QuestionResult {
                question_id: q.id,
                position: q.position,
                question: q.question.clone(),
                question_type: q.question_type,
                difficulty: q.difficulty,
                answer: response.map(|r| r.answer.clone()),
                feedback: response.map(|r| r.feedback.clone()),
                ai_score: response.map(|r| r.ai_score),
            }
        })
        .collect();

    ResultsSummary {
        session_id: session.id,
        target_role: session.target_role.clone(),
        overall_score,
        overall_band: ScoreBand::for_score(f64::from(overall_score)),
        total_questions: ordered.len(),
        answered_questions: all_scores.len(),
        strengths,
        improvement_areas,
        categories,
        questions,
    }
}

/// Returns the summary of a completed session, serving from the cache when
/// possible. Cache failures are logged and fall through to recomputation.
pub async fn aggregate(
    store: &dyn EntityStore,
    cache: &dyn SummaryCache,
    session_id: Uuid,
) -> Result<ResultsSummary, AppError> {
    let session = store.get_session(session_id).await?;
    if session.status != SessionStatus::Completed {
        return Err(AppError::NotReady(format!(
            "session {session_id} is {}; results are available once it is completed",
            session.status
        )));
    }

    match cache.get(session_id).await {
        Ok(Some(summary)) => return Ok(summary),
        Ok(None) => {}
        Err(e) => warn!("Summary cache read failed for session {session_id}: {e:#}"),
    }

    let questions = store.list_questions(session_id).await?;
    let responses = store.list_responses(session_id).await?;
    let summary = compute_summary(&session, &questions, &responses);
    remember(cache, &summary).await;
    Ok(summary)
}

/// Best-effort cache write.
pub async fn remember(cache: &dyn SummaryCache, summary: &ResultsSummary) {
    if let Err(e) = cache.put(summary).await {
        warn!(
            "Summary cache write failed for session {}: {e:#}",
            summary.session_id
        );
    }
}
