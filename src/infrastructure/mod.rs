//! Infrastructure layer - external adapters and shared wiring
//!
//! This layer contains:
//! - Config: environment-level application configuration
//! - ConfigStore: the project document and its typed views
//! - Flux: HTTP client for the remote synthesis API
//! - HTTP: dashboard JSON API routes
//! - State: shared application state

pub mod config;
pub mod config_store;
pub mod flux;
pub mod http;
pub mod state;
