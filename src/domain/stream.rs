// Frame stream messages sent to the chart
use super::dataset::{CombinedDataset, Frame, TooltipRecord, VerticalExtent};
use super::panel::{PanelConfig, PanelLayout};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSkeleton {
    pub index: usize,
    pub query: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameMessage {
    /// Sent first, and again after every configuration change
    Skeleton {
        panel_id: String,
        paths: Vec<PathSkeleton>,
        layout: PanelLayout,
        is_synced: bool,
    },
    /// Sent only when the stabilized dataset changes
    Dataset {
        dataset: Arc<CombinedDataset>,
        tooltips: HashMap<String, TooltipRecord>,
        extent: VerticalExtent,
    },
    Cursor {
        current_time_since_start: Option<f64>,
    },
}

impl FrameMessage {
    pub fn skeleton(panel_id: &str, config: &PanelConfig) -> Self {
        let paths = config
            .descriptors()
            .into_iter()
            .map(|d| PathSkeleton {
                index: d.vertical_slot,
                query: d.query,
                label: d.display_label,
            })
            .collect();

        FrameMessage::Skeleton {
            panel_id: panel_id.to_string(),
            paths,
            layout: config.layout(),
            is_synced: config.is_synced,
        }
    }

    pub fn dataset(frame: &Frame) -> Self {
        FrameMessage::Dataset {
            dataset: Arc::clone(&frame.dataset),
            tooltips: frame.tooltips.clone(),
            extent: frame.extent,
        }
    }

    pub fn cursor(frame: &Frame) -> Self {
        FrameMessage::Cursor {
            current_time_since_start: frame.current_time_since_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::panel::PathConfig;

    #[test]
    fn test_skeleton_serializes_with_type_tag() {
        let config = PanelConfig {
            paths: vec![PathConfig::new("/a.b"), PathConfig::new("")],
            is_synced: true,
        };
        let json = serde_json::to_value(FrameMessage::skeleton("main", &config)).unwrap();

        assert_eq!(json["type"], "skeleton");
        assert_eq!(json["panel_id"], "main");
        assert_eq!(json["paths"][1]["label"], "Series 2");
        assert_eq!(json["layout"]["height"], 158.0);
    }
}
