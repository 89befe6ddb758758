// Message-path decoder trait - resolves a path query against a raw message
use crate::domain::sample::{DecodedBlock, MessageBlock, RawMessage, SeriesSample};
use std::collections::BTreeSet;
use std::sync::Arc;

pub trait MessagePathDecoder: Send + Sync {
    /// Topic a path subscribes to
    fn topic_of<'p>(&self, path: &'p str) -> &'p str;

    /// Decode zero or more samples for `path` from one message
    fn decode(&self, path: &str, message: &RawMessage) -> Vec<SeriesSample>;

    /// Decode every message of a window, in order
    fn decode_messages(&self, path: &str, messages: &[RawMessage]) -> Vec<SeriesSample> {
        messages
            .iter()
            .flat_map(|message| self.decode(path, message))
            .collect()
    }

    /// Decode a block for the given paths; paths whose topic the block lacks get no entry
    fn decode_block(&self, paths: &[String], block: &MessageBlock) -> DecodedBlock {
        paths
            .iter()
            .filter_map(|path| {
                let messages = block.messages_by_topic.get(self.topic_of(path))?;
                Some((path.clone(), Arc::new(self.decode_messages(path, messages))))
            })
            .collect()
    }
}

/// Unique topics for a set of paths, sorted
pub fn topics_from_paths(decoder: &dyn MessagePathDecoder, paths: &[String]) -> BTreeSet<String> {
    paths
        .iter()
        .map(|path| decoder.topic_of(path))
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect()
}
