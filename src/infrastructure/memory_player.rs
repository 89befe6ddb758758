// In-memory player - holds the data pushed through the ingestion endpoints
use crate::application::player_source::{PlayerSnapshot, PlayerSource};
use crate::domain::sample::{MessageBlock, RawMessage};
use crate::domain::time::Time;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct PlayerState {
    start_time: Option<Time>,
    current_time: Option<Time>,
    streamed: HashMap<String, Arc<Vec<RawMessage>>>,
    blocks: Vec<Arc<MessageBlock>>,
}

#[derive(Debug)]
pub struct InMemoryPlayer {
    state: RwLock<PlayerState>,
    window_limit: usize,
}

impl InMemoryPlayer {
    pub fn new(window_limit: usize) -> Self {
        Self {
            state: RwLock::new(PlayerState::default()),
            window_limit: window_limit.max(1),
        }
    }

    pub async fn set_time(&self, start_time: Option<Time>, current_time: Option<Time>) {
        let mut state = self.state.write().await;
        state.start_time = start_time;
        state.current_time = current_time;
    }

    /// Replace the streamed window of `topic`, keeping the newest messages.
    pub async fn deliver_window(&self, topic: String, mut messages: Vec<RawMessage>) {
        if messages.len() > self.window_limit {
            let excess = messages.len() - self.window_limit;
            tracing::debug!("Truncating window for {} by {} messages", topic, excess);
            messages.drain(..excess);
        }
        self.state
            .write()
            .await
            .streamed
            .insert(topic, Arc::new(messages));
    }

    /// Append a historical block; returns how many blocks are now loaded.
    pub async fn append_block(&self, block: MessageBlock) -> usize {
        let mut state = self.state.write().await;
        state.blocks.push(Arc::new(block));
        state.blocks.len()
    }
}

#[async_trait]
impl PlayerSource for InMemoryPlayer {
    async fn snapshot(&self, topics: &[String]) -> Result<PlayerSnapshot> {
        let state = self.state.read().await;
        let streamed = topics
            .iter()
            .filter_map(|topic| {
                let window = state.streamed.get(topic)?;
                Some((topic.clone(), Arc::clone(window)))
            })
            .collect();

        Ok(PlayerSnapshot {
            start_time: state.start_time,
            current_time: state.current_time,
            streamed,
            blocks: state.blocks.clone(),
        })
    }

    async fn seek_playback(&self, time: Time) -> Result<()> {
        tracing::debug!("Seeking playback to {}", time);
        self.state.write().await.current_time = Some(time);
        Ok(())
    }
}
