//! Batch orchestrator - sequential multi-image runs with rate limiting
//!
//! Items run strictly one after another with the configured pause between
//! them. A failed item never aborts the batch; every attempt appears in
//! the returned list in order.

use tracing::{info, warn};

use crate::application::dto::{BatchSummary, GenerationResult};
use crate::application::services::generation_service::{
    CoverRequest, GenerationEngine, HeroShotRequest, SceneRequest,
};
use crate::infrastructure::config_store::ConfigStore;

#[derive(Debug, Clone)]
pub struct BookBatchRequest {
    pub book_id: String,
    pub reference_image: String,
    pub include_cover: bool,
    /// Inclusive page range filter
    pub page_range: Option<(u32, u32)>,
}

pub struct BatchOrchestrator<'a> {
    engine: &'a GenerationEngine,
    store: &'a ConfigStore,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(engine: &'a GenerationEngine, store: &'a ConfigStore) -> Self {
        Self { engine, store }
    }

    /// Hero shots for the given characters, or every stored character
    pub async fn all_hero_shots(
        &self,
        reference_image: Option<&str>,
        character_ids: Option<Vec<String>>,
    ) -> Vec<GenerationResult> {
        let ids = character_ids.unwrap_or_else(|| self.store.character_ids());
        info!(
            count = ids.len(),
            estimated_cost = ids.len() as f64 * self.store.cost_per_image(),
            "starting hero shot batch"
        );

        let delay = self.store.rate_limit_delay();
        let mut results = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let result = self
                .engine
                .hero_shot(
                    self.store,
                    HeroShotRequest {
                        character_id: id.clone(),
                        reference_image: reference_image.map(str::to_string),
                        ..Default::default()
                    },
                )
                .await;
            results.push(result);

            if i + 1 < ids.len() {
                tokio::time::sleep(delay).await;
            }
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            successful = summary.successful,
            attempted = summary.attempted,
            total_cost = summary.total_cost,
            "hero shot batch complete"
        );
        results
    }

    /// Every page of a book, cover first when requested
    ///
    /// Pages land as `page_{NN}.jpg` (and the cover as `cover.jpg`) in a
    /// per-book directory under the configured books output path.
    pub async fn book(&self, request: BookBatchRequest) -> Vec<GenerationResult> {
        let Some(book) = self.store.book(&request.book_id) else {
            warn!(book_id = %request.book_id, "book not found");
            return Vec::new();
        };
        if book.scenes.is_empty() {
            warn!(book_id = %request.book_id, "no scenes defined for book");
            return Vec::new();
        }

        let scenes = match request.page_range {
            Some((start, end)) => book.scenes_in_range(start, end),
            None => book.scenes.iter().collect(),
        };

        let total = scenes.len() + usize::from(request.include_cover);
        info!(
            book = %book.title,
            virtue = %book.virtue,
            pages = scenes.len(),
            include_cover = request.include_cover,
            estimated_cost = total as f64 * self.store.cost_per_image(),
            "generating book"
        );

        let output_dir = self
            .store
            .path_for("books_output", "./output/books")
            .join(&book.id);
        let delay = self.store.rate_limit_delay();
        let mut results = Vec::with_capacity(total);

        if request.include_cover {
            let result = self
                .engine
                .cover(
                    self.store,
                    CoverRequest {
                        book_id: book.id.clone(),
                        reference_image: request.reference_image.clone(),
                        output_name: Some("cover".to_string()),
                        output_dir: Some(output_dir.clone()),
                        ..Default::default()
                    },
                )
                .await;
            results.push(result);
            tokio::time::sleep(delay).await;
        }

        let book_characters = book.character_ids();
        for (i, scene) in scenes.iter().enumerate() {
            let character_ids = scene
                .characters
                .clone()
                .unwrap_or_else(|| book_characters.clone());

            info!(page = scene.page, total = scenes.len(), "generating page");
            let result = self
                .engine
                .scene(
                    self.store,
                    SceneRequest {
                        scene_prompt: scene.prompt.clone(),
                        character_ids,
                        reference_image: request.reference_image.clone(),
                        location_id: Some(book.primary_location.clone()),
                        output_name: Some(format!("page_{:02}", scene.page)),
                        output_dir: Some(output_dir.clone()),
                        additional_notes: String::new(),
                    },
                )
                .await;
            results.push(result);

            if i + 1 < scenes.len() {
                tokio::time::sleep(delay).await;
            }
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            book = %book.title,
            successful = summary.successful,
            attempted = summary.attempted,
            total_cost = summary.total_cost,
            "book complete"
        );
        results
    }

    pub fn summarize(results: &[GenerationResult]) -> BatchSummary {
        BatchSummary::from_results(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{SynthesisPort, SynthesisRequest, SynthesisResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubPort {
        generates: AtomicUsize,
        fail_on_generate: Option<usize>,
    }

    #[async_trait]
    impl SynthesisPort for StubPort {
        async fn generate(&self, _request: SynthesisRequest) -> anyhow::Result<SynthesisResponse> {
            let call = self.generates.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_generate == Some(call) {
                anyhow::bail!("API error: overloaded");
            }
            Ok(SynthesisResponse {
                images: vec![format!("https://img.example/{call}.jpg")],
            })
        }

        async fn upload(&self, _bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<String> {
            Ok("https://img.example/ref.jpg".to_string())
        }

        async fn download(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xFF, 0xD8])
        }
    }

    fn store_from(value: serde_json::Value) -> ConfigStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        ConfigStore::load(file.path()).unwrap()
    }

    fn book_config() -> serde_json::Value {
        json!({
            "api": { "cost_per_image": 0.04 },
            "generation_settings": { "rate_limit_delay_seconds": 0 },
            "prompt_templates": {
                "hero_shot": "{character_name} portrait. {style_prompt}",
                "scene": "{scene_description} with {character_list}",
                "cover": "Cover of {book_title}, featuring {featured_character_name}"
            },
            "characters": {
                "barnaby_bunny": { "name": "Barnaby Bunny", "description": "a rabbit" },
                "gus_goat": { "name": "Gus Goat", "description": "a goat" }
            },
            "locations": {
                "meadow": { "name": "The Meadow", "description": "a sunlit meadow" }
            },
            "books": {
                "book_01": {
                    "title": "Barnaby Finds His Hop",
                    "book_number": 1,
                    "virtue": "courage",
                    "featured_character": "barnaby_bunny",
                    "supporting_characters": ["gus_goat"],
                    "primary_location": "meadow",
                    "scenes": [
                        { "page": 1, "prompt": "Barnaby wakes up" },
                        { "page": 2, "prompt": "Barnaby meets Gus" },
                        { "page": 3, "prompt": "Barnaby hops the fence" }
                    ]
                }
            }
        })
    }

    fn orchestration(
        fail_on_generate: Option<usize>,
    ) -> (Arc<StubPort>, GenerationEngine) {
        let port = Arc::new(StubPort {
            generates: AtomicUsize::new(0),
            fail_on_generate,
        });
        let engine = GenerationEngine::new(port.clone(), false);
        (port, engine)
    }

    #[tokio::test]
    async fn book_batch_tolerates_a_failed_page() {
        let store = store_from(book_config());
        // cover is the first call; the second call (first scene) fails
        let (_port, engine) = orchestration(Some(1));
        let orchestrator = BatchOrchestrator::new(&engine, &store);

        let results = orchestrator
            .book(BookBatchRequest {
                book_id: "book_01".to_string(),
                reference_image: "https://img.example/ref.jpg".to_string(),
                include_cover: true,
                page_range: None,
            })
            .await;

        assert_eq!(results.len(), 4);
        let failed: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.success)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(failed, vec![1]);

        let summary = BatchOrchestrator::summarize(&results);
        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.successful, 3);
        assert!((summary.total_cost - 0.12).abs() < 1e-9);
    }

    #[tokio::test]
    async fn book_batch_respects_page_range_and_cover_flag() {
        let store = store_from(book_config());
        let (port, engine) = orchestration(None);
        let orchestrator = BatchOrchestrator::new(&engine, &store);

        let results = orchestrator
            .book(BookBatchRequest {
                book_id: "book_01".to_string(),
                reference_image: "https://img.example/ref.jpg".to_string(),
                include_cover: false,
                page_range: Some((2, 3)),
            })
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(port.generates.load(Ordering::SeqCst), 2);
        assert_eq!(
            results[0].metadata.get("scene_prompt").map(String::as_str),
            Some("Barnaby meets Gus")
        );
    }

    #[tokio::test]
    async fn unknown_book_yields_empty_batch() {
        let store = store_from(book_config());
        let (port, engine) = orchestration(None);
        let orchestrator = BatchOrchestrator::new(&engine, &store);

        let results = orchestrator
            .book(BookBatchRequest {
                book_id: "book_99".to_string(),
                reference_image: "https://img.example/ref.jpg".to_string(),
                include_cover: true,
                page_range: None,
            })
            .await;

        assert!(results.is_empty());
        assert_eq!(port.generates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hero_batch_covers_all_characters_in_order() {
        let store = store_from(book_config());
        let (port, engine) = orchestration(None);
        let orchestrator = BatchOrchestrator::new(&engine, &store);

        let results = orchestrator.all_hero_shots(None, None).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(port.generates.load(Ordering::SeqCst), 2);
        // store order (BTreeMap) is alphabetical by id
        assert_eq!(
            results[0].metadata.get("character_id").map(String::as_str),
            Some("barnaby_bunny")
        );
        assert_eq!(
            results[1].metadata.get("character_id").map(String::as_str),
            Some("gus_goat")
        );
    }

    #[tokio::test]
    async fn hero_batch_accepts_explicit_subset() {
        let store = store_from(book_config());
        let (port, engine) = orchestration(None);
        let orchestrator = BatchOrchestrator::new(&engine, &store);

        let results = orchestrator
            .all_hero_shots(None, Some(vec!["gus_goat".to_string()]))
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(port.generates.load(Ordering::SeqCst), 1);
        assert_eq!(
            results[0].metadata.get("character_id").map(String::as_str),
            Some("gus_goat")
        );
    }
}
