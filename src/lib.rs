// State transitions panel service - frame assembly over block and streamed player data
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
