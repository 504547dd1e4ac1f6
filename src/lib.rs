pub mod config;
pub mod error;
pub mod extractor;
pub mod http;
pub mod llm;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod pending;
pub mod render;
pub mod settings;
pub mod state;
pub mod tabs;
pub mod utils;

pub use state::AppState;
