use crate::domain::panel::{PanelConfig, PathConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_stream_window_limit")]
    pub stream_window_limit: usize,
}

fn default_frame_interval_ms() -> u64 {
    100
}

fn default_stream_window_limit() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelsConfig {
    #[serde(default)]
    pub panels: Vec<PanelSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelSettings {
    pub id: String,
    #[serde(default)]
    pub paths: Vec<PathConfig>,
    #[serde(default = "default_synced")]
    pub is_synced: bool,
}

fn default_synced() -> bool {
    true
}

impl PanelSettings {
    /// A panel configured without paths starts from the default single empty path
    pub fn panel_config(&self) -> PanelConfig {
        if self.paths.is_empty() {
            return PanelConfig {
                is_synced: self.is_synced,
                ..PanelConfig::default()
            };
        }
        PanelConfig {
            paths: self.paths.clone(),
            is_synced: self.is_synced,
        }
    }
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/server"))
        .add_source(
            config::Environment::with_prefix("TRANSITIONS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_panels_config() -> anyhow::Result<PanelsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/panels").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}
