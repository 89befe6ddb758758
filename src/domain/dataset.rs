// Render-ready dataset models consumed by the chart
use super::panel::PanelLayout;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Number of colors in the chart's state palette.
pub const PALETTE_LEN: usize = 8;

/// Top line of the chart; paths stack below it.
pub const TOP_LINE_Y: f64 = -3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointStyle {
    pub color_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub style: PointStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub path_index: usize,
    pub label: String,
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipRecord {
    pub x: f64,
    pub y: f64,
    pub dataset_index: usize,
    pub path: String,
    pub value: String,
    pub raw_value: serde_json::Value,
}

impl TooltipRecord {
    pub fn key(&self) -> String {
        tooltip_key(self.x, self.y, self.dataset_index)
    }
}

pub fn tooltip_key(x: f64, y: f64, dataset_index: usize) -> String {
    format!("{}:{}:{}", x, y, dataset_index)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CombinedDataset {
    pub datasets: Vec<Dataset>,
}

impl CombinedDataset {
    pub fn point_count(&self) -> usize {
        self.datasets.iter().map(|d| d.points.len()).sum()
    }

    pub fn points_for_path(&self, path_index: usize) -> impl Iterator<Item = &PlotPoint> {
        self.datasets
            .iter()
            .filter(move |d| d.path_index == path_index)
            .flat_map(|d| d.points.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VerticalExtent {
    pub min: Option<f64>,
    pub max: f64,
}

/// Everything the chart needs for one render cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub dataset: Arc<CombinedDataset>,
    pub tooltips: HashMap<String, TooltipRecord>,
    pub extent: VerticalExtent,
    pub current_time_since_start: Option<f64>,
    pub layout: PanelLayout,
    pub is_synced: bool,
}
