// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod field_path_decoder;
pub mod http_response;
pub mod memory_player;
