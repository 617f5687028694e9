//! Axum route handlers for results and dashboard statistics.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::results::aggregator::{aggregate, ResultsSummary};
use crate::results::dashboard::{dashboard_stats, DashboardStats};
use crate::state::AppState;

/// GET /api/v1/sessions/:id/results
///
/// 409 `NOT_READY` until the session is completed.
pub async fn handle_get_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultsSummary>, AppError> {
    Ok(Json(
        aggregate(state.store.as_ref(), state.summaries.as_ref(), id).await?,
    ))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(dashboard_stats(state.store.as_ref()).await?))
}
