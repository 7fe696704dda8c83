//! Generation engine - single-image operations against the synthesis port
//!
//! Each operation resolves entities from the store, builds a prompt,
//! drives the port, and optionally persists the image. Failures of any
//! kind are captured into the returned `GenerationResult` so batch runs
//! can continue past them; these methods never return `Err`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::application::dto::GenerationResult;
use crate::application::ports::{SynthesisPort, SynthesisRequest};
use crate::application::services::prompt_builder;
use crate::domain::entities::Character;
use crate::infrastructure::config_store::ConfigStore;

/// Failure modes captured into `GenerationResult.error`
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Featured character not found: {0}")]
    FeaturedCharacterNotFound(String),

    #[error("No valid characters found")]
    NoValidCharacters,

    #[error("Image not found: {0}")]
    ReferenceNotFound(String),

    #[error("synthesis service returned no images")]
    EmptyResponse,
}

#[derive(Debug, Clone, Default)]
pub struct HeroShotRequest {
    pub character_id: String,
    pub reference_image: Option<String>,
    pub location_id: Option<String>,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupShotRequest {
    pub character_ids: Vec<String>,
    pub reference_image: Option<String>,
    pub location_id: Option<String>,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneRequest {
    pub scene_prompt: String,
    pub character_ids: Vec<String>,
    /// Required: scenes are always conditioned on a reference image
    pub reference_image: String,
    pub location_id: Option<String>,
    pub output_name: Option<String>,
    /// Overrides the configured output directory (used by book batches)
    pub output_dir: Option<PathBuf>,
    pub additional_notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct CoverRequest {
    pub book_id: String,
    pub reference_image: String,
    pub custom_prompt: Option<String>,
    pub output_name: Option<String>,
    pub output_dir: Option<PathBuf>,
}

struct RenderOutcome {
    image_url: String,
    saved_path: Option<PathBuf>,
}

/// The generation engine
///
/// Holds the synthesis port, the per-engine reference upload cache, and
/// the persistence flag. Persistence is decided by whoever constructs the
/// engine; the engine itself never inspects the environment.
pub struct GenerationEngine {
    synthesis: Arc<dyn SynthesisPort>,
    reference_cache: Mutex<HashMap<String, String>>,
    persist_outputs: bool,
}

impl GenerationEngine {
    pub fn new(synthesis: Arc<dyn SynthesisPort>, persist_outputs: bool) -> Self {
        Self {
            synthesis,
            reference_cache: Mutex::new(HashMap::new()),
            persist_outputs,
        }
    }

    pub fn persists_outputs(&self) -> bool {
        self.persist_outputs
    }

    /// Resolve a reference image argument to a hosted URL
    ///
    /// URLs pass through untouched. Local paths are uploaded once and
    /// cached by their original path string; `force` refreshes the cache.
    pub async fn resolve_reference(&self, image: &str, force: bool) -> anyhow::Result<String> {
        if image.starts_with("http://") || image.starts_with("https://") {
            return Ok(image.to_string());
        }

        if !force {
            let cache = self.reference_cache.lock().await;
            if let Some(url) = cache.get(image) {
                return Ok(url.clone());
            }
        }

        let path = Path::new(image);
        if !path.exists() {
            return Err(GenerationError::ReferenceNotFound(image.to_string()).into());
        }

        info!(path = %path.display(), "uploading reference image");
        let bytes = tokio::fs::read(path).await?;
        let url = self.synthesis.upload(bytes, "image/jpeg").await?;

        self.reference_cache
            .lock()
            .await
            .insert(image.to_string(), url.clone());
        Ok(url)
    }

    // =========================================================================
    // Hero shots
    // =========================================================================

    #[instrument(skip_all, fields(character_id = %request.character_id))]
    pub async fn hero_shot(&self, store: &ConfigStore, request: HeroShotRequest) -> GenerationResult {
        let started = Instant::now();

        let Some(character) = store.character(&request.character_id) else {
            return GenerationResult::failure(
                "",
                GenerationError::CharacterNotFound(request.character_id.clone()).to_string(),
            );
        };

        let location_desc = request
            .location_id
            .as_deref()
            .and_then(|id| store.location(id))
            .map(|l| l.description.clone())
            .unwrap_or_else(|| "soft, neutral background".to_string());

        let prompt = match &request.custom_prompt {
            Some(custom) => custom.clone(),
            None => store.build_prompt(
                "hero_shot",
                &prompt_builder::hero_shot_vars(character, &location_desc),
            ),
        };

        info!(character = %character.name, style = %store.active_style(), "generating hero shot");

        let outcome: anyhow::Result<RenderOutcome> = async {
            let reference_url = match &request.reference_image {
                Some(image) => Some(self.resolve_reference(image, false).await?),
                None => None,
            };
            let output_path = self.hero_output_path(store, &request);
            self.render(store, &prompt, reference_url, output_path).await
        }
        .await;

        match outcome {
            Ok(rendered) => {
                let metadata = BTreeMap::from([
                    ("type".to_string(), "hero_shot".to_string()),
                    ("character_id".to_string(), request.character_id.clone()),
                    ("character_name".to_string(), character.name.clone()),
                ]);
                self.success(rendered, prompt, metadata, store, started)
            }
            Err(error) => GenerationResult::failure(prompt, error.to_string()),
        }
    }

    fn hero_output_path(&self, store: &ConfigStore, request: &HeroShotRequest) -> PathBuf {
        let dir = store
            .path_for("character_references", "./reference_images/characters")
            .join(&request.character_id);
        let filename = match &request.output_name {
            Some(name) => format!("{name}.jpg"),
            None => format!("hero_{}.jpg", Local::now().format("%Y%m%d_%H%M%S")),
        };
        dir.join(filename)
    }

    // =========================================================================
    // Group shots
    // =========================================================================

    #[instrument(skip_all, fields(characters = request.character_ids.len()))]
    pub async fn group_shot(
        &self,
        store: &ConfigStore,
        request: GroupShotRequest,
    ) -> GenerationResult {
        let started = Instant::now();

        let characters: Vec<&Character> = request
            .character_ids
            .iter()
            .filter_map(|id| store.character(id))
            .collect();
        if characters.is_empty() {
            return GenerationResult::failure("", GenerationError::NoValidCharacters.to_string());
        }

        let location_desc = request
            .location_id
            .as_deref()
            .and_then(|id| store.location(id))
            .map(|l| l.description.clone())
            .unwrap_or_else(|| "beautiful farm setting with rolling hills".to_string());

        let prompt = match &request.custom_prompt {
            Some(custom) => custom.clone(),
            None => store.build_prompt(
                "group_shot",
                &prompt_builder::group_shot_vars(&characters, &location_desc),
            ),
        };

        info!(group = %prompt_builder::name_list(&characters), "generating group shot");

        let outcome: anyhow::Result<RenderOutcome> = async {
            let reference_url = match &request.reference_image {
                Some(image) => Some(self.resolve_reference(image, false).await?),
                None => None,
            };
            let output_path = self.group_output_path(store, &request);
            self.render(store, &prompt, reference_url, output_path).await
        }
        .await;

        match outcome {
            Ok(rendered) => {
                let metadata = BTreeMap::from([
                    ("type".to_string(), "group_shot".to_string()),
                    ("character_ids".to_string(), request.character_ids.join(",")),
                    (
                        "character_names".to_string(),
                        prompt_builder::name_list(&characters),
                    ),
                ]);
                self.success(rendered, prompt, metadata, store, started)
            }
            Err(error) => GenerationResult::failure(prompt, error.to_string()),
        }
    }

    fn group_output_path(&self, store: &ConfigStore, request: &GroupShotRequest) -> PathBuf {
        let dir = store.path_for("group_shots", "./reference_images/group_shots");
        let filename = match &request.output_name {
            Some(name) => format!("{name}.jpg"),
            None => {
                let abbrev = request
                    .character_ids
                    .iter()
                    .take(4)
                    .map(|id| id.chars().take(3).collect::<String>())
                    .collect::<Vec<_>>()
                    .join("_");
                format!("group_{abbrev}_{}.jpg", Local::now().format("%Y%m%d_%H%M%S"))
            }
        };
        dir.join(filename)
    }

    // =========================================================================
    // Scenes
    // =========================================================================

    #[instrument(skip_all)]
    pub async fn scene(&self, store: &ConfigStore, request: SceneRequest) -> GenerationResult {
        let started = Instant::now();

        let characters: Vec<&Character> = request
            .character_ids
            .iter()
            .filter_map(|id| store.character(id))
            .collect();
        let character_list = prompt_builder::name_list(&characters);
        let character_descriptions = store.character_description_block(&request.character_ids);

        let location_desc = request
            .location_id
            .as_deref()
            .and_then(|id| store.location(id))
            .map(|l| l.description.clone())
            .unwrap_or_default();

        let prompt = store.build_prompt(
            "scene",
            &prompt_builder::scene_vars(
                &request.scene_prompt,
                character_list,
                character_descriptions,
                &location_desc,
                &request.additional_notes,
            ),
        );
        let prompt =
            prompt_builder::append_consistency(prompt, store.prompt_template("consistency_suffix"));

        info!(scene = %truncate(&request.scene_prompt, 50), "generating scene");

        let outcome: anyhow::Result<RenderOutcome> = async {
            let reference_url = self.resolve_reference(&request.reference_image, false).await?;
            let output_path = self.scene_output_path(store, &request);
            self.render(store, &prompt, Some(reference_url), output_path)
                .await
        }
        .await;

        match outcome {
            Ok(rendered) => {
                let metadata = BTreeMap::from([
                    ("type".to_string(), "scene".to_string()),
                    ("scene_prompt".to_string(), request.scene_prompt.clone()),
                    ("character_ids".to_string(), request.character_ids.join(",")),
                ]);
                self.success(rendered, prompt, metadata, store, started)
            }
            Err(error) => GenerationResult::failure(prompt, error.to_string()),
        }
    }

    fn scene_output_path(&self, store: &ConfigStore, request: &SceneRequest) -> PathBuf {
        let dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| store.path_for("output", "./output"));
        let filename = match &request.output_name {
            Some(name) => format!("{name}.jpg"),
            None => format!(
                "scene_{}_{}.jpg",
                scene_slug(&request.scene_prompt),
                Local::now().format("%H%M%S")
            ),
        };
        dir.join(filename)
    }

    // =========================================================================
    // Covers
    // =========================================================================

    #[instrument(skip_all, fields(book_id = %request.book_id))]
    pub async fn cover(&self, store: &ConfigStore, request: CoverRequest) -> GenerationResult {
        let started = Instant::now();

        let Some(book) = store.book(&request.book_id) else {
            return GenerationResult::failure(
                "",
                GenerationError::BookNotFound(request.book_id.clone()).to_string(),
            );
        };
        let Some(featured) = store.character(&book.featured_character) else {
            return GenerationResult::failure(
                "",
                GenerationError::FeaturedCharacterNotFound(book.featured_character.clone())
                    .to_string(),
            );
        };

        let location_desc = store
            .location(&book.primary_location)
            .map(|l| l.description.clone())
            .unwrap_or_else(|| "beautiful farm setting".to_string());

        let prompt = match &request.custom_prompt {
            Some(custom) => custom.clone(),
            None => store.build_prompt(
                "cover",
                &prompt_builder::cover_vars(book, featured, &location_desc),
            ),
        };

        info!(book = %book.title, featured = %featured.name, "generating cover");

        let outcome: anyhow::Result<RenderOutcome> = async {
            let reference_url = self.resolve_reference(&request.reference_image, false).await?;
            let output_path = self.cover_output_path(store, &request);
            self.render(store, &prompt, Some(reference_url), output_path)
                .await
        }
        .await;

        match outcome {
            Ok(rendered) => {
                let metadata = BTreeMap::from([
                    ("type".to_string(), "cover".to_string()),
                    ("book_id".to_string(), request.book_id.clone()),
                    ("book_title".to_string(), book.title.clone()),
                ]);
                self.success(rendered, prompt, metadata, store, started)
            }
            Err(error) => GenerationResult::failure(prompt, error.to_string()),
        }
    }

    fn cover_output_path(&self, store: &ConfigStore, request: &CoverRequest) -> PathBuf {
        let dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| store.path_for("covers_output", "./output/covers"));
        let filename = match &request.output_name {
            Some(name) => format!("{name}.jpg"),
            None => format!("cover_{}.jpg", request.book_id),
        };
        dir.join(filename)
    }

    // =========================================================================
    // Shared flow
    // =========================================================================

    async fn render(
        &self,
        store: &ConfigStore,
        prompt: &str,
        reference_url: Option<String>,
        output_path: PathBuf,
    ) -> anyhow::Result<RenderOutcome> {
        let defaults = store.api_defaults();
        let response = self
            .synthesis
            .generate(SynthesisRequest {
                prompt: prompt.to_string(),
                reference_url,
                guidance_scale: defaults.guidance_scale,
                num_inference_steps: defaults.num_inference_steps,
                output_format: defaults.output_format,
            })
            .await?;

        let image_url = response
            .images
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?;

        let saved_path = if self.persist_outputs {
            Some(self.persist(store, &image_url, &output_path, prompt).await?)
        } else {
            None
        };

        Ok(RenderOutcome {
            image_url,
            saved_path,
        })
    }

    async fn persist(
        &self,
        store: &ConfigStore,
        image_url: &str,
        output_path: &Path,
        prompt: &str,
    ) -> anyhow::Result<PathBuf> {
        let bytes = self.synthesis.download(image_url).await?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(output_path, &bytes).await?;

        if store.save_prompts() && !prompt.is_empty() {
            tokio::fs::write(output_path.with_extension("txt"), prompt).await?;
        }

        info!(path = %output_path.display(), "saved image");
        Ok(output_path.to_path_buf())
    }

    fn success(
        &self,
        rendered: RenderOutcome,
        prompt: String,
        metadata: BTreeMap<String, String>,
        store: &ConfigStore,
        started: Instant,
    ) -> GenerationResult {
        GenerationResult {
            success: true,
            output_path: rendered.saved_path,
            image_url: Some(rendered.image_url),
            prompt_used: prompt,
            error: None,
            cost: store.cost_per_image(),
            generation_time: started.elapsed(),
            metadata,
        }
    }
}

/// First 25 characters of the scene prompt, filesystem-friendly
fn scene_slug(prompt: &str) -> String {
    prompt
        .chars()
        .take(25)
        .collect::<String>()
        .replace(' ', "_")
        .replace(',', "")
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
