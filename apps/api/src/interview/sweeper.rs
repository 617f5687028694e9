//! Ends sessions left `in_progress` past the configured TTL. Uses the normal
//! `end` transition, so abandoned sessions still get a persisted summary.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::interview::lifecycle::end_session;
use crate::models::session::SessionStatus;
use crate::results::cache::SummaryCache;
use crate::state::AppState;
use crate::store::{EntityStore, SessionOrder, SessionQuery};

/// Ends every `in_progress` session started more than `ttl` ago. Returns how
/// many this call completed. Sessions ended concurrently by someone else are
/// skipped.
pub async fn end_stale_sessions(
    store: &dyn EntityStore,
    cache: &dyn SummaryCache,
    ttl: chrono::Duration,
) -> Result<usize, AppError> {
    let stale = store
        .list_sessions(&SessionQuery {
            status: Some(SessionStatus::InProgress),
            started_before: Some(Utc::now() - ttl),
            order: SessionOrder::Oldest,
            ..SessionQuery::default()
        })
        .await?;

    let mut ended = 0;
    for session in stale {
        match end_session(store, cache, session.id).await {
            Ok(_) => {
                info!("Ended stale session {}", session.id);
                ended += 1;
            }
            Err(AppError::StateTransition(msg)) => {
                info!("Stale session {} already ended: {msg}", session.id);
            }
            Err(e) => warn!("Failed to end stale session {}: {e}", session.id),
        }
    }
    Ok(ended)
}

pub fn spawn_session_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let ttl = chrono::Duration::minutes(state.config.session_ttl_minutes);
    let period = Duration::from_secs(state.config.session_sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) =
                end_stale_sessions(state.store.as_ref(), state.summaries.as_ref(), ttl).await
            {
                error!("Session sweep failed: {e}");
            }
        }
    })
}
