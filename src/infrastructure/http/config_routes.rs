//! Configuration API routes
//!
//! Read endpoints over the project document plus the style switch and
//! cost estimate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::entities::{Book, Character, Location};
use crate::infrastructure::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Project overview: name, counts, active style, pricing
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.read().await;
    let settings = store.image_settings();
    let dimensions: Value = ["hero", "scene", "cover", "group"]
        .iter()
        .map(|kind| (kind.to_string(), json!(settings.dimensions_for(kind))))
        .collect::<serde_json::Map<_, _>>()
        .into();
    Json(json!({
        "project": store.project_name(),
        "config_path": store.path(),
        "characters": store.characters().count(),
        "locations": store.locations().count(),
        "books": store.books().len(),
        "styles": store.style_presets().count(),
        "active_style": store.active_style(),
        "api_model": store.api_model(),
        "cost_per_image": store.cost_per_image(),
        "api_key_set": std::env::var("FAL_KEY").is_ok(),
        "persist_outputs": state.engine.persists_outputs(),
        "image_dimensions": dimensions,
    }))
}

/// Full document export
pub async fn export_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.read().await;
    Json(store.export())
}

/// Re-read the project document from disk
pub async fn reload_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    store
        .reload()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "reloaded": true, "characters": store.characters().count() })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CharacterFilter {
    pub role: Option<String>,
    pub virtue: Option<String>,
}

pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CharacterFilter>,
) -> Json<Vec<Character>> {
    let store = state.store.read().await;
    let characters: Vec<Character> = match (&filter.role, &filter.virtue) {
        (Some(role), virtue) => store
            .characters_by_role(role)
            .into_iter()
            .filter(|c| virtue.as_deref().map(|v| c.has_virtue(v)).unwrap_or(true))
            .cloned()
            .collect(),
        (None, Some(virtue)) => store
            .characters_by_virtue(virtue)
            .into_iter()
            .cloned()
            .collect(),
        (None, None) => store.characters().cloned().collect(),
    };
    Json(characters)
}

/// Insert or replace a character definition and persist the document
pub async fn upsert_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> Result<Json<Character>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    store
        .upsert_character(&id, data)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    store
        .save(None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match store.character(&id) {
        Some(character) => Ok(Json(character.clone())),
        None => Err((StatusCode::INTERNAL_SERVER_ERROR, "character vanished after upsert".to_string())),
    }
}

/// Merge field updates into an existing character
pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(updates): Json<Value>,
) -> Result<Json<Character>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let known = store
        .update_character(&id, updates)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if !known {
        return Err((StatusCode::NOT_FOUND, format!("unknown character: {id}")));
    }
    store
        .save(None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match store.character(&id) {
        Some(character) => Ok(Json(character.clone())),
        None => Err((StatusCode::INTERNAL_SERVER_ERROR, "character vanished after update".to_string())),
    }
}

pub async fn list_locations(State(state): State<Arc<AppState>>) -> Json<Vec<Location>> {
    let store = state.store.read().await;
    Json(store.locations().cloned().collect())
}

pub async fn list_books(State(state): State<Arc<AppState>>) -> Json<Vec<Book>> {
    let store = state.store.read().await;
    Json(store.books().into_iter().cloned().collect())
}

/// Featured + supporting cast of a book, unknown ids skipped
pub async fn list_book_characters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Character>>, (StatusCode, String)> {
    let store = state.store.read().await;
    if store.book(&id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("unknown book: {id}")));
    }
    Ok(Json(store.book_characters(&id).into_iter().cloned().collect()))
}

/// Replace the scene list of a book and persist the document
pub async fn update_book_scenes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(scenes): Json<Value>,
) -> Result<Json<Book>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let known = store
        .update_book_scenes(&id, scenes)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if !known {
        return Err((StatusCode::NOT_FOUND, format!("unknown book: {id}")));
    }
    store
        .save(None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match store.book(&id) {
        Some(book) => Ok(Json(book.clone())),
        None => Err((StatusCode::INTERNAL_SERVER_ERROR, "book vanished after update".to_string())),
    }
}

#[derive(Serialize)]
pub struct StyleSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
}

pub async fn list_styles(State(state): State<Arc<AppState>>) -> Json<Vec<StyleSummary>> {
    let store = state.store.read().await;
    let active = store.active_style().to_string();
    Json(
        store
            .style_presets()
            .map(|s| StyleSummary {
                id: s.id.clone(),
                name: s.name.clone(),
                active: s.id == active,
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct AddStyleRequest {
    pub id: String,
    pub name: String,
    pub prompt: String,
}

/// Register a new style preset and persist the document
pub async fn add_style(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddStyleRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    store
        .add_style_preset(&body.id, &body.name, &body.prompt)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    store
        .save(None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "id": body.id, "name": body.name })))
}

#[derive(Deserialize)]
pub struct SetStyleRequest {
    pub style_id: String,
}

/// Switch the active style preset and persist the document
pub async fn set_style(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetStyleRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    if !store.set_active_style(&body.style_id) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unknown style preset: {}", body.style_id),
        ));
    }
    store
        .save(None)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(json!({ "active_style": body.style_id })))
}

#[derive(Deserialize)]
pub struct EstimateRequest {
    pub num_images: u32,
}

pub async fn estimate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EstimateRequest>,
) -> Json<Value> {
    let store = state.store.read().await;
    let cost = f64::from(body.num_images) * store.cost_per_image();
    Json(json!({ "num_images": body.num_images, "estimated_cost": cost }))
}
