// Domain layer - Panel, sample and dataset models
pub mod dataset;
pub mod panel;
pub mod sample;
pub mod stream;
pub mod time;
