// Application layer - Frame assembly and panel use cases
pub mod dataset_builder;
pub mod deep_memo;
pub mod frame_assembler;
pub mod message_decoder;
pub mod panel_service;
pub mod player_source;
pub mod reconciler;
