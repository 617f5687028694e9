use serde::Serialize;

use crate::errors::AppError;
use crate::models::session::{SessionRow, SessionStatus};
use crate::store::{EntityStore, SessionQuery};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_resumes: i64,
    pub completed_interviews: usize,
    /// Rounded mean of completed sessions' overall scores; 0 when none.
    pub average_score: i64,
    pub in_progress_interviews: usize,
}

pub fn compute_stats(total_resumes: i64, sessions: &[SessionRow]) -> DashboardStats {
    let scores: Vec<i64> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .map(|s| i64::from(s.overall_score.unwrap_or(0)))
        .collect();
    let average_score = if scores.is_empty() {
        0
    } else {
        (scores.iter().sum::<i64>() as f64 / scores.len() as f64).round() as i64
    };

    DashboardStats {
        total_resumes,
        completed_interviews: scores.len(),
        average_score,
        in_progress_interviews: sessions
            .iter()
            .filter(|s| s.status == SessionStatus::InProgress)
            .count(),
    }
}

pub async fn dashboard_stats(store: &dyn EntityStore) -> Result<DashboardStats, AppError> {
    let total_resumes = store.count_resumes().await?;
    let sessions = store.list_sessions(&SessionQuery::default()).await?;
    Ok(compute_stats(total_resumes, &sessions))
}
