// Field path decoder - resolves "/topic.field.sub" against JSON messages
use crate::application::message_decoder::MessagePathDecoder;
use crate::domain::sample::{RawMessage, SeriesSample};
use crate::domain::time::Time;
use serde::Deserialize;
use serde_json::Value;

/// Minimal decoder: the topic runs up to the first `.`, the rest is a
/// dot-separated chain of object keys or array indices. No filters or slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPathDecoder;

impl FieldPathDecoder {
    pub fn new() -> Self {
        Self
    }

    fn fields(path: &str) -> impl Iterator<Item = &str> {
        path.split_once('.')
            .map(|(_, rest)| rest)
            .into_iter()
            .flat_map(|rest| rest.split('.'))
    }

    fn resolve<'m>(message: &'m Value, path: &str) -> Option<&'m Value> {
        Self::fields(path).try_fold(message, |value, field| match value {
            Value::Object(map) => map.get(field),
            Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    fn header_stamp(message: &Value) -> Option<Time> {
        let stamp = message.pointer("/header/stamp")?;
        Time::deserialize(stamp).ok()
    }
}

impl MessagePathDecoder for FieldPathDecoder {
    fn topic_of<'p>(&self, path: &'p str) -> &'p str {
        path.split_once('.').map_or(path, |(topic, _)| topic)
    }

    fn decode(&self, path: &str, message: &RawMessage) -> Vec<SeriesSample> {
        if message.topic != self.topic_of(path) {
            return Vec::new();
        }

        match Self::resolve(&message.message, path) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => {
                let sample = SeriesSample::new(message.receive_time, value.clone());
                let sample = match Self::header_stamp(&message.message) {
                    Some(stamp) => sample.with_header_stamp(stamp),
                    None => sample,
                };
                vec![sample]
            }
        }
    }
}
