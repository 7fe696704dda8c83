//! Shared application state

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::ports::SynthesisPort;
use crate::application::services::GenerationEngine;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::config_store::ConfigStore;

/// Shared application state for the dashboard server
pub struct AppState {
    pub config: AppConfig,
    /// Project document; RwLock because style switches and config edits
    /// mutate it between generations
    pub store: RwLock<ConfigStore>,
    pub engine: GenerationEngine,
}

impl AppState {
    pub fn new(config: AppConfig, store: ConfigStore, synthesis: Arc<dyn SynthesisPort>) -> Self {
        let engine = GenerationEngine::new(synthesis, config.persist_outputs);
        Self {
            config,
            store: RwLock::new(store),
            engine,
        }
    }
}
