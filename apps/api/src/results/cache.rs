//! Redis-backed cache for completed-session summaries. Completed sessions
//! never change, so entries are written once and expire after a day.

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::results::aggregator::ResultsSummary;

#[async_trait]
pub trait SummaryCache: Send + Sync {
    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<ResultsSummary>>;
    async fn put(&self, summary: &ResultsSummary) -> anyhow::Result<()>;
}

pub fn summary_key(session_id: Uuid) -> String {
    format!("results:{session_id}")
}

pub struct RedisSummaryCache {
    client: redis::Client,
}

impl RedisSummaryCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SummaryCache for RedisSummaryCache {
    async fn get(&self, session_id: Uuid) -> anyhow::Result<Option<ResultsSummary>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("connecting to redis")?;
        let raw: Option<String> = conn.get(summary_key(session_id)).await?;
        raw.map(|s| serde_json::from_str(&s).context("decoding cached summary"))
            .transpose()
    }

    async fn put(&self, summary: &ResultsSummary) -> anyhow::Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("connecting to redis")?;
        let raw = serde_json::to_string(summary)?;
        conn.set_ex::<_, _, ()>(summary_key(summary.session_id), raw, 24 * 60 * 60)
            .await?;
        Ok(())
    }
}
