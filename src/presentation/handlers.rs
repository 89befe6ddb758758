// HTTP request handlers
use crate::application::panel_service::PanelError;
use crate::domain::panel::PanelConfig;
use crate::domain::sample::{MessageBlock, RawMessage};
use crate::domain::time::Time;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AddPathRequest {
    pub topic: String,
}

#[derive(Deserialize)]
pub struct SeekRequest {
    /// Seconds since the start time, as read off the chart's x axis
    pub x: f64,
}

#[derive(Serialize)]
pub struct SeekResponse {
    pub time: Time,
}

#[derive(Deserialize)]
pub struct PlayerTimeRequest {
    pub start_time: Option<Time>,
    pub current_time: Option<Time>,
}

#[derive(Deserialize)]
pub struct WindowDelivery {
    pub topic: String,
    pub messages: Vec<RawMessage>,
}

#[derive(Serialize)]
pub struct BlockAccepted {
    pub block_count: usize,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all panels
pub async fn list_panels(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let panels = state.panel_service.list_panels();
    match json_response(&panels, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn get_config(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PanelConfig>, PanelError> {
    state.panel_service.config(&id).map(Json)
}

/// Replace a panel's configuration; all of its cached frame state is dropped
pub async fn put_config(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(config): Json<PanelConfig>,
) -> Result<Json<PanelConfig>, PanelError> {
    state.panel_service.update_config(&id, config).map(Json)
}

/// Add a topic to a panel's paths
pub async fn add_path(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddPathRequest>,
) -> Result<Json<PanelConfig>, PanelError> {
    state.panel_service.add_topic(&id, &request.topic).map(Json)
}

/// Render a single frame
pub async fn get_frame(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let frame = match state.panel_service.frame(&id).await {
        Ok(frame) => frame,
        Err(e) => return e.into_response(),
    };

    match json_response(&frame, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Stream frames for a panel (only changes are sent)
pub async fn stream_frames(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.panel_service.stream_frames(&id) {
        Ok(rx) => stream_from_receiver(rx, accepts_brotli(&headers))
            .await
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Seek playback to a clicked chart position
pub async fn seek(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SeekRequest>,
) -> Result<Response, PanelError> {
    let response = match state.panel_service.seek(&id, request.x).await? {
        Some(time) => Json(SeekResponse { time }).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}

pub async fn put_player_time(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlayerTimeRequest>,
) -> StatusCode {
    state
        .player
        .set_time(request.start_time, request.current_time)
        .await;
    StatusCode::NO_CONTENT
}

/// Replace the streamed windows of the delivered topics
pub async fn post_stream(
    State(state): State<Arc<AppState>>,
    Json(deliveries): Json<Vec<WindowDelivery>>,
) -> StatusCode {
    for delivery in deliveries {
        let WindowDelivery { topic, messages } = delivery;
        let total = messages.len();
        let messages: Vec<RawMessage> = messages.into_iter().filter(|m| m.topic == topic).collect();
        if messages.len() < total {
            tracing::warn!(
                "Dropped {} messages delivered under topic {} with a different topic",
                total - messages.len(),
                topic
            );
        }
        state.player.deliver_window(topic, messages).await;
    }
    StatusCode::NO_CONTENT
}

/// Append a historical block
pub async fn post_block(
    State(state): State<Arc<AppState>>,
    Json(block): Json<MessageBlock>,
) -> Json<BlockAccepted> {
    let block_count = state.player.append_block(block).await;
    tracing::debug!("Loaded block #{}", block_count);
    Json(BlockAccepted { block_count })
}
