use std::sync::Arc;

use crate::config::Config;
use crate::ingestion::progress::IngestionRegistry;
use crate::llm_client::capability::AiCapability;
use crate::results::cache::SummaryCache;
use crate::storage::FileStorage;
use crate::store::EntityStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub storage: Arc<dyn FileStorage>,
    /// Extraction, question generation and scoring. Default: `LlmClient`.
    pub ai: Arc<dyn AiCapability>,
    /// Completed-session summaries. Default: Redis.
    pub summaries: Arc<dyn SummaryCache>,
    pub ingestions: IngestionRegistry,
    pub config: Config,
}
