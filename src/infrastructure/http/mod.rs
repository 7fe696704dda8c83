//! HTTP JSON API routes for the dashboard

mod config_routes;
mod generate_routes;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::infrastructure::state::AppState;

pub use config_routes::*;
pub use generate_routes::*;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(config_routes::health))
        // Config routes
        .route("/api/config", get(config_routes::get_config))
        .route("/api/config/export", get(config_routes::export_config))
        .route("/api/config/reload", post(config_routes::reload_config))
        .route("/api/characters", get(config_routes::list_characters))
        .route("/api/characters/{id}", put(config_routes::upsert_character))
        .route("/api/characters/{id}", patch(config_routes::update_character))
        .route("/api/locations", get(config_routes::list_locations))
        .route("/api/books", get(config_routes::list_books))
        .route(
            "/api/books/{id}/characters",
            get(config_routes::list_book_characters),
        )
        .route("/api/books/{id}/scenes", put(config_routes::update_book_scenes))
        .route("/api/styles", get(config_routes::list_styles))
        .route("/api/styles", post(config_routes::add_style))
        .route("/api/style", post(config_routes::set_style))
        .route("/api/estimate", post(config_routes::estimate))
        // Generation routes
        .route("/api/generate/hero", post(generate_routes::generate_hero))
        .route("/api/generate/group", post(generate_routes::generate_group))
        .route("/api/generate/scene", post(generate_routes::generate_scene))
        .route("/api/generate/cover", post(generate_routes::generate_cover))
        .route("/api/generate/book", post(generate_routes::generate_book))
}
