//! Generation API routes
//!
//! Each endpoint maps its JSON body onto the matching engine request and
//! responds with the serialized `GenerationResult`. Engine failures are
//! carried inside the result body, not as HTTP errors; only malformed
//! requests get a 4xx before the engine is touched.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::dto::{BatchSummary, GenerationResult};
use crate::application::services::{
    BatchOrchestrator, BookBatchRequest, CoverRequest, GroupShotRequest, HeroShotRequest,
    SceneRequest,
};
use crate::infrastructure::state::AppState;

#[derive(Deserialize)]
pub struct HeroShotBody {
    pub character_id: String,
    pub reference_image: Option<String>,
    pub location_id: Option<String>,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
}

pub async fn generate_hero(
    State(state): State<Arc<AppState>>,
    Json(body): Json<HeroShotBody>,
) -> Json<GenerationResult> {
    let store = state.store.read().await;
    let result = state
        .engine
        .hero_shot(
            &store,
            HeroShotRequest {
                character_id: body.character_id,
                reference_image: body.reference_image,
                location_id: body.location_id,
                custom_prompt: body.custom_prompt,
                output_name: body.output_name,
            },
        )
        .await;
    Json(result)
}

#[derive(Deserialize)]
pub struct GroupShotBody {
    pub character_ids: Vec<String>,
    pub reference_image: Option<String>,
    pub location_id: Option<String>,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
}

pub async fn generate_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GroupShotBody>,
) -> Json<GenerationResult> {
    let store = state.store.read().await;
    let result = state
        .engine
        .group_shot(
            &store,
            GroupShotRequest {
                character_ids: body.character_ids,
                reference_image: body.reference_image,
                location_id: body.location_id,
                custom_prompt: body.custom_prompt,
                output_name: body.output_name,
            },
        )
        .await;
    Json(result)
}

#[derive(Deserialize)]
pub struct SceneBody {
    pub scene_prompt: String,
    #[serde(default)]
    pub character_ids: Vec<String>,
    pub reference_image: Option<String>,
    pub location_id: Option<String>,
    pub output_name: Option<String>,
    #[serde(default)]
    pub additional_notes: String,
}

pub async fn generate_scene(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SceneBody>,
) -> Result<Json<GenerationResult>, (StatusCode, String)> {
    let Some(reference_image) = body.reference_image else {
        return Err((
            StatusCode::BAD_REQUEST,
            "reference_image is required for scenes".to_string(),
        ));
    };

    let store = state.store.read().await;
    let result = state
        .engine
        .scene(
            &store,
            SceneRequest {
                scene_prompt: body.scene_prompt,
                character_ids: body.character_ids,
                reference_image,
                location_id: body.location_id,
                output_name: body.output_name,
                output_dir: None,
                additional_notes: body.additional_notes,
            },
        )
        .await;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct CoverBody {
    pub book_id: String,
    pub reference_image: Option<String>,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
}

pub async fn generate_cover(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CoverBody>,
) -> Result<Json<GenerationResult>, (StatusCode, String)> {
    let Some(reference_image) = body.reference_image else {
        return Err((
            StatusCode::BAD_REQUEST,
            "reference_image is required for covers".to_string(),
        ));
    };

    let store = state.store.read().await;
    let result = state
        .engine
        .cover(
            &store,
            CoverRequest {
                book_id: body.book_id,
                reference_image,
                custom_prompt: body.custom_prompt,
                output_name: body.output_name,
                output_dir: None,
            },
        )
        .await;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct BookBody {
    pub book_id: String,
    pub reference_image: Option<String>,
    #[serde(default = "default_true")]
    pub include_cover: bool,
    /// Inclusive [start, end] page range
    pub pages: Option<(u32, u32)>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
pub struct BookResponse {
    pub results: Vec<GenerationResult>,
    pub summary: BatchSummary,
}

pub async fn generate_book(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookBody>,
) -> Result<Json<BookResponse>, (StatusCode, String)> {
    let Some(reference_image) = body.reference_image else {
        return Err((
            StatusCode::BAD_REQUEST,
            "reference_image is required for books".to_string(),
        ));
    };

    let store = state.store.read().await;
    let orchestrator = BatchOrchestrator::new(&state.engine, &store);
    let results = orchestrator
        .book(BookBatchRequest {
            book_id: body.book_id,
            reference_image,
            include_cover: body.include_cover,
            page_range: body.pages,
        })
        .await;
    let summary = BatchOrchestrator::summarize(&results);
    Ok(Json(BookResponse { results, summary }))
}
