// Frame assembler - builds one render frame for a panel from the player snapshot
use crate::application::dataset_builder::build_dataset;
use crate::application::deep_memo::DeepMemo;
use crate::application::message_decoder::{MessagePathDecoder, topics_from_paths};
use crate::application::player_source::PlayerSnapshot;
use crate::application::reconciler::{BlockStreamReconciler, PathSource};
use crate::domain::dataset::{CombinedDataset, Frame, TOP_LINE_Y, TooltipRecord, VerticalExtent};
use crate::domain::panel::{PanelConfig, PathDescriptor};
use crate::domain::sample::{DecodedBlock, ItemsByPath};
use crate::domain::time::Time;
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs the combined dataset depends on. Streamed data is keyed by the
/// identity of its stabilized dependency subset.
struct MemoKey {
    streamed: Arc<ItemsByPath>,
    block_count: usize,
    start_time: Option<Time>,
}

impl MemoKey {
    fn matches(&self, other: &MemoKey) -> bool {
        Arc::ptr_eq(&self.streamed, &other.streamed)
            && self.block_count == other.block_count
            && self.start_time == other.start_time
    }
}

struct MemoEntry {
    key: MemoKey,
    dataset: Arc<CombinedDataset>,
    tooltips: Arc<Vec<TooltipRecord>>,
    min_y: Option<f64>,
}

/// Owns every cache of one panel instance. Never share one between panels.
pub struct FrameAssembler {
    config: PanelConfig,
    descriptors: Vec<PathDescriptor>,
    path_strings: Vec<String>,
    decoder: Arc<dyn MessagePathDecoder>,
    reconciler: BlockStreamReconciler,
    streamed_memo: DeepMemo<ItemsByPath>,
    dataset_memo: DeepMemo<CombinedDataset>,
    decoded_blocks: Vec<Arc<DecodedBlock>>,
    memo: Option<MemoEntry>,
}

impl FrameAssembler {
    pub fn new(config: PanelConfig, decoder: Arc<dyn MessagePathDecoder>) -> Self {
        let descriptors = config.descriptors();
        let path_strings = descriptors.iter().map(|d| d.query.clone()).collect();
        Self {
            config,
            descriptors,
            path_strings,
            decoder,
            reconciler: BlockStreamReconciler::new(),
            streamed_memo: DeepMemo::new(),
            dataset_memo: DeepMemo::new(),
            decoded_blocks: Vec::new(),
            memo: None,
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Topics the panel's paths subscribe to
    pub fn topics(&self) -> Vec<String> {
        topics_from_paths(self.decoder.as_ref(), &self.path_strings)
            .into_iter()
            .collect()
    }

    /// Replace the configuration. All cached state belongs to the old path set and is dropped.
    pub fn reconfigure(&mut self, config: PanelConfig) {
        tracing::info!(
            "Reconfiguring panel: {} -> {} paths",
            self.config.paths.len(),
            config.paths.len()
        );
        self.descriptors = config.descriptors();
        self.path_strings = self.descriptors.iter().map(|d| d.query.clone()).collect();
        self.config = config;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.streamed_memo.reset();
        self.dataset_memo.reset();
        self.decoded_blocks.clear();
        self.memo = None;
    }

    pub fn assemble(&mut self, snapshot: &PlayerSnapshot) -> Frame {
        self.sync_blocks(snapshot);
        let streamed = self.decode_streamed(snapshot);

        let reconciliation =
            self.reconciler
                .reconcile(&self.descriptors, &streamed, &self.decoded_blocks);
        let streamed_dependency = self
            .streamed_memo
            .stabilize_arc(reconciliation.streamed_dependency);

        let key = MemoKey {
            streamed: streamed_dependency,
            block_count: self.decoded_blocks.len(),
            start_time: snapshot.start_time,
        };

        let entry = match self.memo.take() {
            Some(entry) if entry.key.matches(&key) => {
                tracing::debug!("Frame inputs unchanged, reusing datasets");
                entry
            }
            _ => self.build_entry(key, &reconciliation.sources),
        };
        let entry = self.memo.insert(entry);

        let tooltips = entry
            .tooltips
            .iter()
            .map(|tip| (tip.key(), tip.clone()))
            .collect::<HashMap<_, _>>();

        let current_time_since_start = match (snapshot.current_time, snapshot.start_time) {
            (Some(current), Some(start)) => Some(current.seconds_since(start)),
            _ => None,
        };

        Frame {
            dataset: Arc::clone(&entry.dataset),
            tooltips,
            extent: VerticalExtent {
                min: entry.min_y,
                max: TOP_LINE_Y,
            },
            current_time_since_start,
            layout: self.config.layout(),
            is_synced: self.config.is_synced,
        }
    }

    fn build_entry(&mut self, key: MemoKey, sources: &[PathSource]) -> MemoEntry {
        let mut combined = CombinedDataset::default();
        let mut tooltips = Vec::new();
        let mut min_y: Option<f64> = None;

        // Ignore all data until the player reports a start time
        if let Some(start_time) = key.start_time {
            for (path, source) in self.descriptors.iter().zip(sources) {
                let y = path.offset();
                min_y = Some(min_y.unwrap_or(y).min(y + TOP_LINE_Y));

                let dataset_index = combined.datasets.len();
                let built = match source {
                    PathSource::Blocks => {
                        let blocks = self
                            .decoded_blocks
                            .iter()
                            .filter_map(|block| block.get(&path.query))
                            .map(|samples| samples.as_slice());
                        build_dataset(path, start_time, dataset_index, blocks)
                    }
                    PathSource::Streamed => {
                        let window = key.streamed.get(&path.query).map(|samples| samples.as_slice());
                        build_dataset(path, start_time, dataset_index, window)
                    }
                    PathSource::Empty => continue,
                };

                if built.dataset.points.is_empty() {
                    continue;
                }
                combined.datasets.push(built.dataset);
                tooltips.extend(built.tooltips);
            }
        }

        tracing::debug!(
            "Built {} datasets with {} points",
            combined.datasets.len(),
            combined.point_count()
        );

        MemoEntry {
            key,
            dataset: self.dataset_memo.stabilize_arc(Arc::new(combined)),
            tooltips: Arc::new(tooltips),
            min_y,
        }
    }

    /// Blocks are append-only: only blocks past the decoded prefix are decoded.
    fn sync_blocks(&mut self, snapshot: &PlayerSnapshot) {
        if snapshot.blocks.len() < self.decoded_blocks.len() {
            tracing::debug!(
                "Player block list shrank from {} to {}, decoding from scratch",
                self.decoded_blocks.len(),
                snapshot.blocks.len()
            );
            self.decoded_blocks.clear();
        }

        for block in &snapshot.blocks[self.decoded_blocks.len()..] {
            let decoded = self.decoder.decode_block(&self.path_strings, block);
            self.decoded_blocks.push(Arc::new(decoded));
        }
    }

    fn decode_streamed(&self, snapshot: &PlayerSnapshot) -> ItemsByPath {
        self.path_strings
            .iter()
            .filter_map(|path| {
                let window = snapshot.streamed.get(self.decoder.topic_of(path))?;
                Some((
                    path.clone(),
                    Arc::new(self.decoder.decode_messages(path, window)),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::PathConfig;
    use crate::domain::sample::{MessageBlock, RawMessage, SeriesSample};
    use serde_json::json;

    /// Path string doubles as the topic; the whole message is the value.
    struct TopicDecoder;

    impl MessagePathDecoder for TopicDecoder {
        fn topic_of<'p>(&self, path: &'p str) -> &'p str {
            path
        }

        fn decode(&self, path: &str, message: &RawMessage) -> Vec<SeriesSample> {
            if message.topic != path {
                return Vec::new();
            }
            vec![SeriesSample::new(message.receive_time, message.message.clone())]
        }
    }

    fn assembler(paths: &[&str]) -> FrameAssembler {
        let config = PanelConfig {
            paths: paths.iter().map(|p| PathConfig::new(*p)).collect(),
            is_synced: true,
        };
        FrameAssembler::new(config, Arc::new(TopicDecoder))
    }

    fn message(topic: &str, time: Time, value: serde_json::Value) -> RawMessage {
        RawMessage {
            topic: topic.to_string(),
            receive_time: time,
            message: value,
        }
    }

    fn block(topic: &str, messages: Vec<RawMessage>) -> Arc<MessageBlock> {
        let mut block = MessageBlock::default();
        block.messages_by_topic.insert(topic.to_string(), messages);
        Arc::new(block)
    }

    fn window(snapshot: &mut PlayerSnapshot, topic: &str, messages: Vec<RawMessage>) {
        snapshot
            .streamed
            .insert(topic.to_string(), Arc::new(messages));
    }

    fn started() -> PlayerSnapshot {
        PlayerSnapshot {
            start_time: Some(Time::new(0, 0)),
            current_time: Some(Time::new(2, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn test_three_path_scenario() {
        let mut assembler = assembler(&["/p1", "/p2", "/p3"]);
        let mut snapshot = started();
        snapshot.blocks = vec![
            block("/p1", vec![message("/p1", Time::new(0, 0), json!("on"))]),
            block("/p1", vec![message("/p1", Time::new(1, 0), json!("off"))]),
        ];
        window(
            &mut snapshot,
            "/p2",
            vec![message("/p2", Time::new(0, 500_000_000), json!(true))],
        );

        let frame = assembler.assemble(&snapshot);

        let p1: Vec<_> = frame.dataset.points_for_path(0).collect();
        assert_eq!(p1.len(), 2);
        assert!(p1.iter().all(|p| p.y == -6.0));

        let p2: Vec<_> = frame.dataset.points_for_path(1).collect();
        assert_eq!(p2.len(), 1);
        assert_eq!(p2[0].y, -12.0);
        assert_eq!(p2[0].x, 0.5);

        assert_eq!(frame.dataset.points_for_path(2).count(), 0);
        assert_eq!(frame.extent.min, Some(-21.0));
        assert_eq!(frame.extent.max, -3.0);
        assert_eq!(frame.tooltips.len(), 3);
        assert!(frame.tooltips.contains_key("0.5:-12:1"));
        assert_eq!(frame.current_time_since_start, Some(2.0));
    }

    #[test]
    fn test_block_data_hides_streamed_data() {
        let mut assembler = assembler(&["/p1"]);
        let mut snapshot = started();
        snapshot.blocks = vec![block("/p1", vec![message("/p1", Time::new(1, 0), json!("history"))])];
        window(
            &mut snapshot,
            "/p1",
            vec![message("/p1", Time::new(1, 500_000_000), json!("live"))],
        );

        let frame = assembler.assemble(&snapshot);
        let labels: Vec<_> = frame.dataset.points_for_path(0).map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["history"]);
    }

    #[test]
    fn test_missing_start_time_yields_empty_frame() {
        let mut assembler = assembler(&["/p1"]);
        let mut snapshot = PlayerSnapshot::default();
        window(&mut snapshot, "/p1", vec![message("/p1", Time::new(1, 0), json!(1))]);

        let frame = assembler.assemble(&snapshot);
        assert_eq!(frame.dataset.point_count(), 0);
        assert!(frame.tooltips.is_empty());
        assert_eq!(frame.extent.min, None);
        assert_eq!(frame.current_time_since_start, None);
    }

    #[test]
    fn test_unchanged_stream_keeps_dataset_identity() {
        let mut assembler = assembler(&["/p1"]);
        let mut first = started();
        window(&mut first, "/p1", vec![message("/p1", Time::new(1, 0), json!("idle"))]);
        // A fresh but equal delivery
        let mut second = started();
        window(&mut second, "/p1", vec![message("/p1", Time::new(1, 0), json!("idle"))]);

        let a = assembler.assemble(&first);
        let b = assembler.assemble(&second);
        assert!(Arc::ptr_eq(&a.dataset, &b.dataset));

        let mut third = started();
        window(&mut third, "/p1", vec![message("/p1", Time::new(1, 0), json!("busy"))]);
        let c = assembler.assemble(&third);
        assert!(!Arc::ptr_eq(&a.dataset, &c.dataset));
    }

    #[test]
    fn test_streamed_churn_on_covered_path_is_ignored() {
        let mut assembler = assembler(&["/p1"]);
        let blocks = vec![block("/p1", vec![message("/p1", Time::new(0, 0), json!(true))])];

        let mut first = started();
        first.blocks = blocks.clone();
        window(&mut first, "/p1", vec![message("/p1", Time::new(3, 0), json!(false))]);
        let a = assembler.assemble(&first);
        let dependency_a = Arc::clone(&assembler.memo.as_ref().unwrap().key.streamed);

        let mut second = started();
        second.blocks = blocks;
        window(&mut second, "/p1", vec![message("/p1", Time::new(4, 0), json!(true))]);
        let b = assembler.assemble(&second);
        let dependency_b = Arc::clone(&assembler.memo.as_ref().unwrap().key.streamed);

        assert!(Arc::ptr_eq(&dependency_a, &dependency_b));
        assert!(Arc::ptr_eq(&dependency_a, assembler.reconciler.no_streamed_dependency()));
        assert!(Arc::ptr_eq(&a.dataset, &b.dataset));
    }

    #[test]
    fn test_only_new_blocks_are_decoded() {
        let mut assembler = assembler(&["/p1"]);
        let mut snapshot = started();
        snapshot.blocks = vec![block("/p1", vec![message("/p1", Time::new(0, 0), json!("a"))])];
        assembler.assemble(&snapshot);
        let first_decoded = Arc::clone(&assembler.decoded_blocks[0]);

        snapshot
            .blocks
            .push(block("/p1", vec![message("/p1", Time::new(1, 0), json!("b"))]));
        let frame = assembler.assemble(&snapshot);

        assert!(Arc::ptr_eq(&first_decoded, &assembler.decoded_blocks[0]));
        assert_eq!(assembler.decoded_blocks.len(), 2);
        assert_eq!(frame.dataset.point_count(), 2);
    }

    #[test]
    fn test_reconfigure_drops_cached_state() {
        let mut assembler = assembler(&["/p1"]);
        let mut snapshot = started();
        snapshot.blocks = vec![block("/p1", vec![message("/p1", Time::new(0, 0), json!("a"))])];
        let before = assembler.assemble(&snapshot);

        assembler.reconfigure(PanelConfig {
            paths: vec![PathConfig::new("/p2"), PathConfig::new("/p1")],
            is_synced: false,
        });
        assert!(assembler.decoded_blocks.is_empty());
        assert!(assembler.memo.is_none());

        let after = assembler.assemble(&snapshot);
        assert!(!Arc::ptr_eq(&before.dataset, &after.dataset));
        let p1: Vec<_> = after.dataset.points_for_path(1).collect();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].y, -12.0);
        assert_eq!(after.extent.min, Some(-15.0));
        assert!(!after.is_synced);
    }

    #[test]
    fn test_topics_are_unique() {
        let assembler = assembler(&["/b", "/a", "/b", ""]);
        assert_eq!(assembler.topics(), vec!["/a".to_string(), "/b".to_string()]);
    }
}
