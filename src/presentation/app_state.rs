// Application state for HTTP handlers
use crate::application::panel_service::PanelService;
use crate::infrastructure::memory_player::InMemoryPlayer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub panel_service: PanelService,
    pub player: Arc<InMemoryPlayer>,
}
