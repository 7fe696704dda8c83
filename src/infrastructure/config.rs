//! Application configuration

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
///
/// Only edge concerns live here (key material, paths, server port,
/// persistence toggle); everything project-specific comes from the
/// configuration document instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the project configuration document
    pub config_path: String,

    /// Synthesis API base URL
    pub synthesis_base_url: String,

    /// Dashboard server port
    pub server_port: u16,

    /// Whether generated images are written to disk
    pub persist_outputs: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            config_path: env::var("FABLEGEN_CONFIG")
                .unwrap_or_else(|_| "./config/master_config.json".to_string()),

            synthesis_base_url: env::var("FLUX_BASE_URL")
                .unwrap_or_else(|_| crate::infrastructure::flux::DEFAULT_BASE_URL.to_string()),

            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,

            persist_outputs: env::var("FABLEGEN_NO_PERSIST").is_err(),
        })
    }
}

/// Serializes tests that mutate the process environment; the default
/// test runner is parallel and `env::remove_var` is process-wide
#[cfg(test)]
pub(crate) fn env_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let _env = env_guard();
        env::remove_var("FABLEGEN_CONFIG");
        env::remove_var("SERVER_PORT");
        env::remove_var("FABLEGEN_NO_PERSIST");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.config_path, "./config/master_config.json");
        assert_eq!(config.server_port, 3000);
        assert!(config.persist_outputs);
    }
}
