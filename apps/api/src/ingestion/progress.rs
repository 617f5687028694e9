//! Ingestion progress: a push/poll channel per ingestion.
//!
//! Consumers read the latest snapshot whenever they like and may miss
//! intermediate values. The only guarantee is that `progress` never decreases.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::AppError;

/// Upload finished; extraction begins.
pub const UPLOAD_CHECKPOINT: u8 = 20;
/// Extraction service answered; output not yet validated.
pub const EXTRACTION_RECEIVED: u8 = 60;
/// Output validated; persistence begins.
pub const EXTRACTION_CHECKPOINT: u8 = 80;
pub const COMPLETE: u8 = 100;

/// Upper bound on tracked ingestions; the oldest is dropped to make room.
const MAX_TRACKED: usize = 1024;
/// How long a finished ingestion stays pollable.
const FINISHED_RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Upload,
    Extraction,
    Persistence,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IngestState {
    Running,
    Succeeded { resume_id: Uuid },
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSnapshot {
    pub progress: u8,
    pub stage: IngestStage,
    #[serde(flatten)]
    pub state: IngestState,
}

impl IngestSnapshot {
    fn initial() -> Self {
        Self {
            progress: 0,
            stage: IngestStage::Upload,
            state: IngestState::Running,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, IngestState::Running)
    }
}

/// Write half of an ingestion's progress channel.
pub struct ProgressReporter {
    tx: watch::Sender<IngestSnapshot>,
}

impl ProgressReporter {
    pub fn new() -> (Self, watch::Receiver<IngestSnapshot>) {
        let (tx, rx) = watch::channel(IngestSnapshot::initial());
        (Self { tx }, rx)
    }

    /// Moves to `stage` at `progress`. Lower values than the current one are
    /// ignored, as is anything after the ingestion has finished.
    pub fn advance(&self, stage: IngestStage, progress: u8) {
        let progress = progress.min(COMPLETE);
        self.tx.send_if_modified(|snap| {
            if snap.is_finished() || progress < snap.progress {
                return false;
            }
            let changed = snap.progress != progress || snap.stage != stage;
            snap.progress = progress;
            snap.stage = stage;
            changed
        });
    }

    pub fn succeed(&self, resume_id: Uuid) {
        self.tx.send_modify(|snap| {
            snap.progress = COMPLETE;
            snap.stage = IngestStage::Done;
            snap.state = IngestState::Succeeded { resume_id };
        });
    }

    /// Records the failure; progress stays at the last checkpoint reached.
    pub fn fail(&self, err: &AppError) {
        self.tx.send_modify(|snap| {
            snap.state = IngestState::Failed {
                code: err.code().to_string(),
                message: err.to_string(),
            };
        });
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        self.tx.borrow().clone()
    }
}

struct Tracked {
    rx: watch::Receiver<IngestSnapshot>,
    registered_at: Instant,
}

impl Tracked {
    /// Finished, or abandoned by a reporter that was dropped mid-run.
    fn is_done(&self) -> bool {
        self.rx.borrow().is_finished() || self.rx.has_changed().is_err()
    }
}

/// Tracks live and recently finished ingestions for the polling endpoint.
/// Finished entries expire after `FINISHED_RETENTION`; the map never holds
/// more than `MAX_TRACKED` entries.
#[derive(Clone, Default)]
pub struct IngestionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Tracked>>>,
}

impl IngestionRegistry {
    pub async fn register(&self, id: Uuid) -> ProgressReporter {
        let (reporter, rx) = ProgressReporter::new();
        let now = Instant::now();
        let mut map = self.inner.write().await;
        map.retain(|_, t| !(t.is_done() && now - t.registered_at >= FINISHED_RETENTION));
        while map.len() >= MAX_TRACKED {
            let oldest = map
                .iter()
                .min_by_key(|(_, t)| (!t.is_done(), t.registered_at))
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => map.remove(&oldest),
                None => break,
            };
        }
        map.insert(
            id,
            Tracked {
                rx,
                registered_at: now,
            },
        );
        reporter
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<IngestSnapshot> {
        self.inner
            .read()
            .await
            .get(&id)
            .map(|t| t.rx.borrow().clone())
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let (reporter, rx) = ProgressReporter::new();
        reporter.advance(IngestStage::Extraction, UPLOAD_CHECKPOINT);
        reporter.advance(IngestStage::Extraction, EXTRACTION_RECEIVED);
        reporter.advance(IngestStage::Upload, 10);
        assert_eq!(rx.borrow().progress, EXTRACTION_RECEIVED);
        assert_eq!(rx.borrow().stage, IngestStage::Extraction);
    }

    #[test]
    fn test_failure_keeps_checkpoint() {
        let (reporter, rx) = ProgressReporter::new();
        reporter.advance(IngestStage::Extraction, UPLOAD_CHECKPOINT);
        reporter.fail(&AppError::Extraction("schema violation".into()));
        reporter.advance(IngestStage::Persistence, EXTRACTION_CHECKPOINT);

        let snap = rx.borrow().clone();
        assert_eq!(snap.progress, UPLOAD_CHECKPOINT);
        assert!(matches!(
            snap.state,
            IngestState::Failed { ref code, .. } if code == "EXTRACTION_ERROR"
        ));
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let (reporter, _rx) = ProgressReporter::new();
        let id = Uuid::new_v4();
        reporter.succeed(id);
        let value = serde_json::to_value(reporter.snapshot()).unwrap();
        assert_eq!(value["progress"], 100);
        assert_eq!(value["stage"], "done");
        assert_eq!(value["state"], "succeeded");
        assert_eq!(value["resume_id"], id.to_string());
    }

    #[tokio::test]
    async fn test_registry_returns_latest_snapshot() {
        let registry = IngestionRegistry::default();
        let id = Uuid::new_v4();
        let reporter = registry.register(id).await;
        reporter.advance(IngestStage::Extraction, UPLOAD_CHECKPOINT);

        let snap = registry.snapshot(id).await.unwrap();
        assert_eq!(snap.progress, UPLOAD_CHECKPOINT);
        assert!(registry.snapshot(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_ingestions_expire() {
        let registry = IngestionRegistry::default();
        let finished = Uuid::new_v4();
        registry.register(finished).await.succeed(Uuid::new_v4());
        let running = Uuid::new_v4();
        let _reporter = registry.register(running).await;

        tokio::time::advance(FINISHED_RETENTION / 2).await;
        registry.register(Uuid::new_v4()).await;
        assert!(registry.snapshot(finished).await.is_some());

        tokio::time::advance(FINISHED_RETENTION).await;
        registry.register(Uuid::new_v4()).await;
        assert!(registry.snapshot(finished).await.is_none());
        assert!(registry.snapshot(running).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_is_capped_while_all_running() {
        let registry = IngestionRegistry::default();
        let first = Uuid::new_v4();
        let mut reporters = vec![registry.register(first).await];
        for _ in 1..MAX_TRACKED {
            tokio::time::advance(Duration::from_millis(1)).await;
            reporters.push(registry.register(Uuid::new_v4()).await);
        }
        assert_eq!(registry.len().await, MAX_TRACKED);

        tokio::time::advance(Duration::from_millis(1)).await;
        let newest = Uuid::new_v4();
        reporters.push(registry.register(newest).await);

        assert_eq!(registry.len().await, MAX_TRACKED);
        assert!(registry.snapshot(first).await.is_none());
        assert!(registry.snapshot(newest).await.is_some());
    }
}
