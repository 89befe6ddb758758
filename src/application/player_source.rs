// Player trait - the host data source feeding the panels
use crate::domain::sample::{MessageBlock, RawMessage};
use crate::domain::time::Time;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the player's state, pulled once per frame
#[derive(Debug, Clone, Default)]
pub struct PlayerSnapshot {
    pub start_time: Option<Time>,
    pub current_time: Option<Time>,
    /// Latest streamed window per topic
    pub streamed: HashMap<String, Arc<Vec<RawMessage>>>,
    /// Append-only historical blocks, in load order
    pub blocks: Vec<Arc<MessageBlock>>,
}

#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Snapshot restricted to the given topics
    async fn snapshot(&self, topics: &[String]) -> anyhow::Result<PlayerSnapshot>;

    /// Move playback to `time`
    async fn seek_playback(&self, time: Time) -> anyhow::Result<()>;
}
