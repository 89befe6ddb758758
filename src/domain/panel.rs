// Panel configuration domain model
use serde::{Deserialize, Serialize};

const ROW_HEIGHT: f64 = 64.0;
const X_AXIS_HEIGHT: f64 = 30.0;
const MIN_PANEL_HEIGHT: f64 = 80.0;
const SLOT_SPACING: f64 = 6.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMethod {
    #[default]
    ReceiveTime,
    HeaderStamp,
}

/// One configured series, as stored in panel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathConfig {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub timestamp_method: TimestampMethod,
}

impl PathConfig {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            timestamp_method: TimestampMethod::ReceiveTime,
        }
    }

    /// Label shown next to the path's row: label, else the path, else `Series N`.
    pub fn display_name(&self, index: usize) -> String {
        match self.label.as_deref().filter(|l| !l.is_empty()) {
            Some(label) => label.to_string(),
            None if !self.value.is_empty() => self.value.clone(),
            None => format!("Series {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub paths: Vec<PathConfig>,
    #[serde(default = "default_synced")]
    pub is_synced: bool,
}

fn default_synced() -> bool {
    true
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathConfig::new("")],
            is_synced: true,
        }
    }
}

impl PanelConfig {
    /// Path descriptors with their fixed vertical slots, in configuration order.
    pub fn descriptors(&self) -> Vec<PathDescriptor> {
        self.paths
            .iter()
            .enumerate()
            .map(|(slot, path)| PathDescriptor {
                query: path.value.clone(),
                display_label: path.display_name(slot),
                timestamp_method: path.timestamp_method,
                vertical_slot: slot,
            })
            .collect()
    }

    /// Config with `topic` appended as a receive-time path, unless it is already present.
    pub fn with_topic(&self, topic: &str) -> Self {
        let mut next = self.clone();
        let candidate = PathConfig::new(topic);
        if !next.paths.contains(&candidate) {
            next.paths.push(candidate);
        }
        next
    }

    pub fn layout(&self) -> PanelLayout {
        let rows_height = self.paths.len() as f64 * ROW_HEIGHT;
        PanelLayout {
            height: MIN_PANEL_HEIGHT.max(rows_height + X_AXIS_HEIGHT),
            height_per_path: (!self.paths.is_empty()).then_some(ROW_HEIGHT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDescriptor {
    pub query: String,
    pub display_label: String,
    pub timestamp_method: TimestampMethod,
    pub vertical_slot: usize,
}

impl PathDescriptor {
    /// Paths stack downwards from the top line, one slot each.
    pub fn offset(&self) -> f64 {
        -SLOT_SPACING * (self.vertical_slot as f64 + 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PanelLayout {
    pub height: f64,
    pub height_per_path: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let mut path = PathConfig::new("/robot/state.mode");
        assert_eq!(path.display_name(0), "/robot/state.mode");

        path.label = Some("Mode".to_string());
        assert_eq!(path.display_name(0), "Mode");

        assert_eq!(PathConfig::new("").display_name(2), "Series 3");
    }

    #[test]
    fn test_with_topic_deduplicates() {
        let config = PanelConfig::default().with_topic("/status");
        assert_eq!(config.paths.len(), 2);

        let again = config.with_topic("/status");
        assert_eq!(again, config);
    }

    #[test]
    fn test_descriptor_offsets() {
        let config = PanelConfig {
            paths: vec![PathConfig::new("/a"), PathConfig::new("/b"), PathConfig::new("/c")],
            is_synced: false,
        };
        let offsets: Vec<f64> = config.descriptors().iter().map(|d| d.offset()).collect();
        assert_eq!(offsets, vec![-6.0, -12.0, -18.0]);
    }

    #[test]
    fn test_layout() {
        let config = PanelConfig::default();
        assert_eq!(config.layout().height, 94.0);
        assert_eq!(config.layout().height_per_path, Some(64.0));

        let empty = PanelConfig {
            paths: Vec::new(),
            is_synced: true,
        };
        assert_eq!(empty.layout().height, 80.0);
        assert_eq!(empty.layout().height_per_path, None);
    }

    #[test]
    fn test_deserialize_timestamp_method() {
        let path: PathConfig =
            serde_json::from_str(r#"{"value":"/a.b","timestamp_method":"header_stamp"}"#).unwrap();
        assert_eq!(path.timestamp_method, TimestampMethod::HeaderStamp);
        assert_eq!(path.label, None);

        let camel = serde_json::from_str::<PathConfig>(r#"{"value":"/a","timestamp_method":"headerStamp"}"#);
        assert!(camel.is_err());
    }

    #[test]
    fn test_serialize_path_config_is_snake_case() {
        let json = serde_json::to_value(PathConfig::new("/a")).unwrap();
        assert_eq!(json, serde_json::json!({"value": "/a", "timestamp_method": "receive_time"}));
    }
}
