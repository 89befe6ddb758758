// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use state_transitions::application::panel_service::PanelService;
use state_transitions::infrastructure::config::{load_panels_config, load_server_config};
use state_transitions::infrastructure::field_path_decoder::FieldPathDecoder;
use state_transitions::infrastructure::memory_player::InMemoryPlayer;
use state_transitions::presentation::app_state::AppState;
use state_transitions::presentation::handlers::{
    add_path, get_config, get_frame, health_check, list_panels, post_block, post_stream,
    put_config, put_player_time, seek, stream_frames,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let server_config = load_server_config()?;
    let panels_config = load_panels_config()?;

    // Create collaborators (infrastructure layer)
    let player = Arc::new(InMemoryPlayer::new(server_config.server.stream_window_limit));
    let decoder = Arc::new(FieldPathDecoder::new());

    // Create services (application layer)
    let panels = panels_config
        .panels
        .iter()
        .map(|panel| (panel.id.clone(), panel.panel_config()))
        .collect();
    let panel_service = PanelService::new(
        player.clone(),
        decoder,
        panels,
        Duration::from_millis(server_config.server.frame_interval_ms),
    );

    // Create application state
    let state = Arc::new(AppState {
        panel_service,
        player,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/panels", get(list_panels))
        .route("/panels/:id/config", get(get_config).put(put_config))
        .route("/panels/:id/paths", post(add_path))
        .route("/panels/:id/frame", get(get_frame))
        .route("/panels/:id/frames", get(stream_frames))
        .route("/panels/:id/seek", post(seek))
        .route("/player/time", put(put_player_time))
        .route("/player/stream", post(post_stream))
        .route("/player/blocks", post(post_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = server_config.server.bind_addr.parse()?;
    tracing::info!("Starting state-transitions service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
