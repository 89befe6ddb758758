// Message and series sample domain models
use super::time::Time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A raw time-stamped message as delivered by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub topic: String,
    pub receive_time: Time,
    pub message: serde_json::Value,
}

/// An append-only batch of historical messages, grouped by topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBlock {
    pub messages_by_topic: HashMap<String, Vec<RawMessage>>,
}

/// Normalized value of one decoded message-path sample. Numbers compare by
/// value, so an integral float normalizes to the integer variants.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    Json(String),
}

impl SampleValue {
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Bool(b) => SampleValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SampleValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    SampleValue::Unsigned(u)
                } else {
                    normalize_float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => SampleValue::Text(s.clone()),
            other => SampleValue::Json(other.to_string()),
        }
    }
}

fn normalize_float(v: f64) -> SampleValue {
    // 2^63 and 2^64 are exact as f64; both bounds are exclusive
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    const U64_END: f64 = 18_446_744_073_709_551_616.0;

    if !v.is_finite() || v.fract() != 0.0 {
        return SampleValue::Float(v);
    }
    if (-I64_END..I64_END).contains(&v) {
        SampleValue::Integer(v as i64)
    } else if (0.0..U64_END).contains(&v) {
        SampleValue::Unsigned(v as u64)
    } else {
        SampleValue::Float(v)
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Bool(b) => write!(f, "{}", b),
            SampleValue::Integer(i) => write!(f, "{}", i),
            SampleValue::Unsigned(u) => write!(f, "{}", u),
            SampleValue::Float(v) => write!(f, "{}", v),
            SampleValue::Text(s) | SampleValue::Json(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSample {
    pub receive_time: Time,
    pub header_stamp: Option<Time>,
    pub value: SampleValue,
    pub raw_value: serde_json::Value,
}

impl SeriesSample {
    pub fn new(receive_time: Time, value: serde_json::Value) -> Self {
        Self {
            receive_time,
            header_stamp: None,
            value: SampleValue::from_json(&value),
            raw_value: value,
        }
    }

    pub fn with_header_stamp(mut self, stamp: Time) -> Self {
        self.header_stamp = Some(stamp);
        self
    }
}

/// Decoded samples keyed by path string.
pub type ItemsByPath = HashMap<String, Arc<Vec<SeriesSample>>>;

/// One decoded block: an entry exists for every path whose topic the block carries.
pub type DecodedBlock = ItemsByPath;
