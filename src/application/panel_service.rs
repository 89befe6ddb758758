// Panel service - one frame assembler per panel, fed from the shared player
use crate::application::frame_assembler::FrameAssembler;
use crate::application::message_decoder::MessagePathDecoder;
use crate::application::player_source::PlayerSource;
use crate::domain::dataset::{CombinedDataset, Frame};
use crate::domain::panel::PanelConfig;
use crate::domain::stream::FrameMessage;
use crate::domain::time::Time;
use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("panel {0} not found")]
    NotFound(String),
    #[error("invalid panel config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Player(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelSummary {
    pub id: String,
    pub paths: Vec<String>,
}

struct PanelState {
    assembler: FrameAssembler,
    generation: u64,
}

/// A panel instance. Its assembler is only touched synchronously, never across an await.
struct Panel {
    id: String,
    state: Mutex<PanelState>,
}

impl Panel {
    fn new(id: String, config: PanelConfig, decoder: Arc<dyn MessagePathDecoder>) -> Self {
        Self {
            id,
            state: Mutex::new(PanelState {
                assembler: FrameAssembler::new(config, decoder),
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RenderedFrame {
    generation: u64,
    config: PanelConfig,
    frame: Frame,
}

#[derive(Clone)]
pub struct PanelService {
    player: Arc<dyn PlayerSource>,
    decoder: Arc<dyn MessagePathDecoder>,
    panels: Arc<RwLock<BTreeMap<String, Arc<Panel>>>>,
    frame_interval: Duration,
}

impl PanelService {
    pub fn new(
        player: Arc<dyn PlayerSource>,
        decoder: Arc<dyn MessagePathDecoder>,
        panels: Vec<(String, PanelConfig)>,
        frame_interval: Duration,
    ) -> Self {
        let panels = panels
            .into_iter()
            .map(|(id, config)| {
                let panel = Panel::new(id.clone(), config, Arc::clone(&decoder));
                (id, Arc::new(panel))
            })
            .collect();

        Self {
            player,
            decoder,
            panels: Arc::new(RwLock::new(panels)),
            frame_interval,
        }
    }

    pub fn list_panels(&self) -> Vec<PanelSummary> {
        let panels = self.panels.read().unwrap_or_else(PoisonError::into_inner);
        panels
            .values()
            .map(|panel| {
                let state = panel.lock();
                PanelSummary {
                    id: panel.id.clone(),
                    paths: state
                        .assembler
                        .config()
                        .descriptors()
                        .into_iter()
                        .map(|d| d.display_label)
                        .collect(),
                }
            })
            .collect()
    }

    pub fn config(&self, id: &str) -> Result<PanelConfig, PanelError> {
        Ok(self.panel(id)?.lock().assembler.config().clone())
    }

    /// Replace a panel's configuration, creating the panel if needed.
    /// Every cache of an existing panel is reset.
    pub fn update_config(&self, id: &str, config: PanelConfig) -> Result<PanelConfig, PanelError> {
        validate(&config)?;

        // Lookup and creation happen under one write lock so a panel is never replaced
        let mut created = false;
        let panel = {
            let mut panels = self.panels.write().unwrap_or_else(PoisonError::into_inner);
            let panel = panels.entry(id.to_string()).or_insert_with(|| {
                created = true;
                Arc::new(Panel::new(id.to_string(), config.clone(), Arc::clone(&self.decoder)))
            });
            Arc::clone(panel)
        };

        if created {
            tracing::info!("Created panel {}", id);
            return Ok(config);
        }

        let mut state = panel.lock();
        if state.assembler.config() != &config {
            state.assembler.reconfigure(config.clone());
            state.generation += 1;
        }
        Ok(config)
    }

    /// Append `topic` as a receive-time path unless the panel already shows it.
    pub fn add_topic(&self, id: &str, topic: &str) -> Result<PanelConfig, PanelError> {
        let next = self.config(id)?.with_topic(topic);
        self.update_config(id, next)
    }

    pub async fn frame(&self, id: &str) -> Result<Frame, PanelError> {
        let panel = self.panel(id)?;
        Ok(self.render(&panel).await?.frame)
    }

    /// Seek the player to `seconds` past its start time. Returns `None` when the
    /// start time is not known yet. Clicks left of the start seek to the start.
    pub async fn seek(&self, id: &str, seconds: f64) -> Result<Option<Time>, PanelError> {
        self.panel(id)?;
        let snapshot = self.player.snapshot(&[]).await?;
        let Some(start) = snapshot.start_time else {
            return Ok(None);
        };

        let target = start.plus(Time::from_sec(seconds));
        self.player.seek_playback(target).await?;
        Ok(Some(target))
    }

    /// Spawn a task that renders the panel every frame interval and sends only
    /// what changed: a skeleton per configuration, a dataset whenever its
    /// stabilized reference changes, and the cursor whenever it moves.
    pub fn stream_frames(&self, id: &str) -> Result<mpsc::Receiver<FrameMessage>, PanelError> {
        let panel = self.panel(id)?;
        let (tx, rx) = mpsc::channel(32);
        let service = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(service.frame_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = IntervalStream::new(interval);
            let mut last_generation: Option<u64> = None;
            let mut last_dataset: Option<Arc<CombinedDataset>> = None;
            let mut last_cursor: Option<Option<f64>> = None;

            loop {
                tokio::select! {
                    biased;
                    _ = tx.closed() => {
                        tracing::debug!("Frame stream for panel {} closed", panel.id);
                        return;
                    }
                    tick = ticks.next() => {
                        if tick.is_none() {
                            return;
                        }
                    }
                }

                let rendered = match service.render(&panel).await {
                    Ok(rendered) => rendered,
                    Err(e) => {
                        tracing::warn!("Skipping frame for panel {}: {}", panel.id, e);
                        continue;
                    }
                };

                let mut messages = Vec::new();
                if last_generation != Some(rendered.generation) {
                    messages.push(FrameMessage::skeleton(&panel.id, &rendered.config));
                    last_generation = Some(rendered.generation);
                    last_dataset = None;
                }

                let frame = &rendered.frame;
                let unchanged = last_dataset
                    .as_ref()
                    .is_some_and(|sent| Arc::ptr_eq(sent, &frame.dataset));
                if !unchanged {
                    messages.push(FrameMessage::dataset(frame));
                    last_dataset = Some(Arc::clone(&frame.dataset));
                }

                if last_cursor != Some(frame.current_time_since_start) {
                    messages.push(FrameMessage::cursor(frame));
                    last_cursor = Some(frame.current_time_since_start);
                }

                for message in messages {
                    if tx.send(message).await.is_err() {
                        tracing::debug!("Frame stream for panel {} closed", panel.id);
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Snapshot and assemble against the same configuration. A reconfigure while
    /// the snapshot is in flight changes the topics, so the snapshot is retaken.
    async fn render(&self, panel: &Panel) -> Result<RenderedFrame, PanelError> {
        let (mut topics, mut generation) = {
            let state = panel.lock();
            (state.assembler.topics(), state.generation)
        };

        loop {
            let snapshot = self.player.snapshot(&topics).await?;

            let mut state = panel.lock();
            if state.generation != generation {
                tracing::debug!("Panel {} reconfigured during snapshot, retrying", panel.id);
                topics = state.assembler.topics();
                generation = state.generation;
                continue;
            }

            let frame = state.assembler.assemble(&snapshot);
            return Ok(RenderedFrame {
                generation,
                config: state.assembler.config().clone(),
                frame,
            });
        }
    }

    fn panel(&self, id: &str) -> Result<Arc<Panel>, PanelError> {
        self.panels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| PanelError::NotFound(id.to_string()))
    }
}

fn validate(config: &PanelConfig) -> Result<(), PanelError> {
    for (index, path) in config.paths.iter().enumerate() {
        if !path.value.is_empty() && !path.value.starts_with('/') {
            return Err(PanelError::InvalidConfig(format!(
                "path {} ({}) must start with a topic name",
                index + 1,
                path.value
            )));
        }
    }
    Ok(())
}
