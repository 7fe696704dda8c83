//! Configuration store - loads the project document and serves typed views
//!
//! The whole project (characters, locations, books, style presets, prompt
//! templates, API settings) lives in one JSON document. The store keeps the
//! raw `serde_json::Value` as the source of truth and rebuilds the typed
//! maps from it after every mutation, so dot-path edits and typed lookups
//! never drift apart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::domain::entities::{Book, Character, Location, StylePreset};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Default API parameters for the synthesis service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDefaults {
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self {
            guidance_scale: default_guidance_scale(),
            num_inference_steps: default_inference_steps(),
            output_format: default_output_format(),
        }
    }
}

fn default_guidance_scale() -> f64 {
    3.5
}

fn default_inference_steps() -> u32 {
    28
}

fn default_output_format() -> String {
    "jpeg".to_string()
}

/// Aspect-ratio bookkeeping for the different shot kinds
///
/// The synthesis API does not take an aspect ratio directly; these are
/// tracked for documentation and downstream cropping.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    #[serde(default)]
    pub aspect_ratios: BTreeMap<String, String>,
    #[serde(default = "ratio_square")]
    pub default_aspect_ratio: String,
    #[serde(default = "ratio_square")]
    pub hero_shot_ratio: String,
    #[serde(default = "ratio_landscape")]
    pub scene_ratio: String,
    #[serde(default = "ratio_portrait")]
    pub cover_ratio: String,
    #[serde(default = "ratio_landscape")]
    pub group_shot_ratio: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            aspect_ratios: BTreeMap::new(),
            default_aspect_ratio: ratio_square(),
            hero_shot_ratio: ratio_square(),
            scene_ratio: ratio_landscape(),
            cover_ratio: ratio_portrait(),
            group_shot_ratio: ratio_landscape(),
        }
    }
}

fn ratio_square() -> String {
    "square".to_string()
}

fn ratio_landscape() -> String {
    "landscape".to_string()
}

fn ratio_portrait() -> String {
    "portrait".to_string()
}

impl ImageSettings {
    /// Aspect ratio string ("W:H") for a shot kind, falling back to the
    /// default selection and then to "1:1"
    pub fn ratio_for(&self, kind: &str) -> String {
        let key = match kind {
            "hero" => &self.hero_shot_ratio,
            "scene" => &self.scene_ratio,
            "cover" => &self.cover_ratio,
            "group" => &self.group_shot_ratio,
            _ => &self.default_aspect_ratio,
        };
        self.aspect_ratios
            .get(key)
            .cloned()
            .unwrap_or_else(|| "1:1".to_string())
    }

    /// Pixel dimensions for a shot kind, scaled so the long edge is 1024
    pub fn dimensions_for(&self, kind: &str) -> (u32, u32) {
        const BASE: u32 = 1024;
        let ratio = self.ratio_for(kind);
        let (w, h) = match ratio.split_once(':') {
            Some((w, h)) => (
                w.trim().parse::<u32>().unwrap_or(1).max(1),
                h.trim().parse::<u32>().unwrap_or(1).max(1),
            ),
            None => (1, 1),
        };
        // widened so huge ratio terms cannot overflow the product
        let scaled = |num: u32, den: u32| (u64::from(BASE) * u64::from(num) / u64::from(den)) as u32;
        if w > h {
            (BASE, scaled(h, w))
        } else if h > w {
            (scaled(w, h), BASE)
        } else {
            (BASE, BASE)
        }
    }
}

/// The project configuration store
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    raw: Value,
    characters: BTreeMap<String, Character>,
    locations: BTreeMap<String, Location>,
    books: BTreeMap<String, Book>,
    styles: BTreeMap<String, StylePreset>,
    templates: BTreeMap<String, String>,
    image_settings: ImageSettings,
}

impl ConfigStore {
    /// Load the project document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let text = std::fs::read_to_string(&path)?;
        let raw: Value = serde_json::from_str(&text)?;

        let mut store = Self {
            path,
            raw,
            characters: BTreeMap::new(),
            locations: BTreeMap::new(),
            books: BTreeMap::new(),
            styles: BTreeMap::new(),
            templates: BTreeMap::new(),
            image_settings: ImageSettings::default(),
        };
        store.rebuild_views()?;

        info!(
            path = %store.path.display(),
            characters = store.characters.len(),
            locations = store.locations.len(),
            books = store.books.len(),
            "loaded project configuration"
        );
        Ok(store)
    }

    /// Re-read the document from disk, replacing all state
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let fresh = Self::load(&self.path)?;
        *self = fresh;
        Ok(())
    }

    /// Write the document back out as pretty JSON
    ///
    /// Defaults to the path it was loaded from; parent directories are
    /// created as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let target = path.unwrap_or(&self.path);
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.raw)?;
        std::fs::write(target, text)?;
        info!(path = %target.display(), "saved project configuration");
        Ok(())
    }

    /// Rebuild the typed maps from the raw document
    ///
    /// All views parse into locals before any field is assigned, so a
    /// parse failure leaves the previous views intact.
    fn rebuild_views(&mut self) -> Result<(), serde_json::Error> {
        let characters = parse_section(&self.raw, "characters")?;
        let locations = parse_section(&self.raw, "locations")?;
        let books = parse_section(&self.raw, "books")?;
        let styles = parse_section(&self.raw, "style_presets")?;

        let templates = match self.raw.get("prompt_templates").and_then(Value::as_object) {
            Some(map) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            None => BTreeMap::new(),
        };

        let image_settings = match self.raw.get("image_settings") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => ImageSettings::default(),
        };

        self.characters = characters;
        self.locations = locations;
        self.books = books;
        self.styles = styles;
        self.templates = templates;
        self.image_settings = image_settings;
        Ok(())
    }

    /// Rebuild the views after a mutation; on failure the raw document
    /// is restored to the pre-mutation snapshot so views and document
    /// never diverge
    fn commit(&mut self, before: Value) -> Result<(), ConfigError> {
        match self.rebuild_views() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.raw = before;
                Err(err.into())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Project / API settings
    // =========================================================================

    pub fn project_name(&self) -> &str {
        self.get_value("project.name")
            .and_then(Value::as_str)
            .unwrap_or("Untitled Project")
    }

    pub fn api_model(&self) -> &str {
        self.get_value("api.model")
            .and_then(Value::as_str)
            .unwrap_or("fal-ai/flux-pro/kontext")
    }

    pub fn api_defaults(&self) -> ApiDefaults {
        self.get_value("api.defaults")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn cost_per_image(&self) -> f64 {
        self.get_value("api.cost_per_image")
            .and_then(Value::as_f64)
            .unwrap_or(0.04)
    }

    /// Output path for a category, falling back to the given default
    pub fn path_for(&self, category: &str, default: &str) -> PathBuf {
        self.get_value(&format!("paths.{category}"))
            .and_then(Value::as_str)
            .unwrap_or(default)
            .into()
    }

    /// Pause between consecutive batch items
    pub fn rate_limit_delay(&self) -> Duration {
        let secs = self
            .get_value("generation_settings.rate_limit_delay_seconds")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Whether to write a `.txt` prompt sidecar next to each saved image
    pub fn save_prompts(&self) -> bool {
        self.get_value("generation_settings.save_prompts")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn image_settings(&self) -> &ImageSettings {
        &self.image_settings
    }

    // =========================================================================
    // Characters
    // =========================================================================

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn character_ids(&self) -> Vec<String> {
        self.characters.keys().cloned().collect()
    }

    pub fn characters_by_role(&self, role: &str) -> Vec<&Character> {
        self.characters.values().filter(|c| c.role == role).collect()
    }

    pub fn characters_by_virtue(&self, virtue: &str) -> Vec<&Character> {
        self.characters
            .values()
            .filter(|c| c.has_virtue(virtue))
            .collect()
    }

    /// Insert or replace a character definition in the raw document
    pub fn upsert_character(&mut self, id: &str, data: Value) -> Result<(), ConfigError> {
        let before = self.raw.clone();
        ensure_object(&mut self.raw, "characters").insert(id.to_string(), data);
        self.commit(before)
    }

    /// Merge field updates into an existing character; false when unknown
    pub fn update_character(&mut self, id: &str, updates: Value) -> Result<bool, ConfigError> {
        let before = self.raw.clone();
        let Some(existing) = self
            .raw
            .get_mut("characters")
            .and_then(|c| c.get_mut(id))
            .and_then(Value::as_object_mut)
        else {
            return Ok(false);
        };
        if let Value::Object(fields) = updates {
            for (key, value) in fields {
                existing.insert(key, value);
            }
        }
        self.commit(before)?;
        Ok(true)
    }

    /// "{name}: {description}" lines for the given ids, unknown ids skipped
    pub fn character_description_block(&self, ids: &[String]) -> String {
        ids.iter()
            .filter_map(|id| self.characters.get(id))
            .map(|c| format!("{}: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // =========================================================================
    // Locations
    // =========================================================================

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    // =========================================================================
    // Books
    // =========================================================================

    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.get(id)
    }

    /// All books, ascending by book number
    pub fn books(&self) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.values().collect();
        books.sort_by_key(|b| b.book_number);
        books
    }

    /// Featured + supporting characters of a book, in order, unknowns skipped
    pub fn book_characters(&self, book_id: &str) -> Vec<&Character> {
        let Some(book) = self.books.get(book_id) else {
            return Vec::new();
        };
        book.character_ids()
            .iter()
            .filter_map(|id| self.characters.get(id))
            .collect()
    }

    /// Replace the scene list of a book; false when the book is unknown
    pub fn update_book_scenes(&mut self, book_id: &str, scenes: Value) -> Result<bool, ConfigError> {
        let before = self.raw.clone();
        let Some(book) = self
            .raw
            .get_mut("books")
            .and_then(|b| b.get_mut(book_id))
            .and_then(Value::as_object_mut)
        else {
            return Ok(false);
        };
        book.insert("scenes".to_string(), scenes);
        self.commit(before)?;
        Ok(true)
    }

    // =========================================================================
    // Styles
    // =========================================================================

    pub fn style_preset(&self, id: &str) -> Option<&StylePreset> {
        self.styles.get(id)
    }

    pub fn style_presets(&self) -> impl Iterator<Item = &StylePreset> {
        self.styles.values()
    }

    pub fn active_style(&self) -> &str {
        self.raw
            .get("active_style")
            .and_then(Value::as_str)
            .unwrap_or("default")
    }

    /// Prompt fragment of the active style preset, empty when unset
    pub fn active_style_prompt(&self) -> String {
        self.styles
            .get(self.active_style())
            .map(|s| s.prompt.clone())
            .unwrap_or_default()
    }

    /// Switch the active style; false (and no change) when the preset is
    /// unknown
    pub fn set_active_style(&mut self, id: &str) -> bool {
        if !self.styles.contains_key(id) {
            return false;
        }
        self.raw["active_style"] = Value::String(id.to_string());
        true
    }

    pub fn add_style_preset(
        &mut self,
        id: &str,
        name: &str,
        prompt: &str,
    ) -> Result<(), ConfigError> {
        let before = self.raw.clone();
        ensure_object(&mut self.raw, "style_presets").insert(
            id.to_string(),
            serde_json::json!({ "name": name, "prompt": prompt }),
        );
        self.commit(before)
    }

    // =========================================================================
    // Prompt templates
    // =========================================================================

    pub fn prompt_template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Render a prompt template with partial substitution
    ///
    /// Every supplied `{name}` is replaced; placeholders with no supplied
    /// value stay literal so the gap is visible in the output rather than
    /// failing the whole generation. `style_prompt` is filled from the
    /// active preset unless the caller supplies it. Unknown template names
    /// render as the empty string.
    pub fn build_prompt(&self, template_name: &str, vars: &[(&str, String)]) -> String {
        let Some(template) = self.templates.get(template_name) else {
            return String::new();
        };
        let mut prompt = template.clone();
        for (key, value) in vars {
            prompt = prompt.replace(&format!("{{{key}}}"), value);
        }
        if !vars.iter().any(|(key, _)| *key == "style_prompt") {
            prompt = prompt.replace("{style_prompt}", &self.active_style_prompt());
        }
        prompt
    }

    // =========================================================================
    // Dot-path access
    // =========================================================================

    /// Read a value by dot-separated path, None when any segment is absent
    pub fn get_value(&self, dot_path: &str) -> Option<&Value> {
        let mut current = &self.raw;
        for key in dot_path.split('.') {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Set a value by dot-separated path, creating intermediate objects
    ///
    /// Non-object intermediates are replaced. Typed views are rebuilt so
    /// the edit is immediately visible through the typed accessors; an
    /// edit that breaks an entity section is rolled back entirely.
    pub fn set_value(&mut self, dot_path: &str, value: Value) -> Result<(), ConfigError> {
        let before = self.raw.clone();
        let mut keys = dot_path.split('.').peekable();
        let mut current = &mut self.raw;
        while let Some(key) = keys.next() {
            if keys.peek().is_none() {
                match current.as_object_mut() {
                    Some(map) => {
                        map.insert(key.to_string(), value);
                    }
                    None => {
                        *current = serde_json::json!({ key: value });
                    }
                }
                break;
            }
            if !current.is_object() {
                *current = Value::Object(serde_json::Map::new());
            }
            let map = match current.as_object_mut() {
                Some(map) => map,
                None => break,
            };
            current = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
        }
        self.commit(before)
    }

    /// Full document copy for export
    pub fn export(&self) -> Value {
        self.raw.clone()
    }
}

fn parse_section<T: serde::de::DeserializeOwned + HasId>(
    raw: &Value,
    section: &str,
) -> Result<BTreeMap<String, T>, serde_json::Error> {
    let mut out = BTreeMap::new();
    if let Some(map) = raw.get(section).and_then(Value::as_object) {
        for (id, data) in map {
            let mut entity: T = serde_json::from_value(data.clone())?;
            entity.set_id(id);
            out.insert(id.clone(), entity);
        }
    }
    Ok(out)
}

fn ensure_object<'a>(raw: &'a mut Value, key: &str) -> &'a mut serde_json::Map<String, Value> {
    if !raw.is_object() {
        *raw = Value::Object(serde_json::Map::new());
    }
    let Value::Object(map) = raw else {
        unreachable!("normalized to an object above")
    };
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(serde_json::Map::new());
    }
    let Value::Object(section) = entry else {
        unreachable!("normalized to an object above")
    };
    section
}

/// Entities keyed by their configuration map key
trait HasId {
    fn set_id(&mut self, id: &str);
}

impl HasId for Character {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

impl HasId for Location {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

impl HasId for Book {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

impl HasId for StylePreset {
    fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn sample_config() -> Value {
        json!({
            "project": { "name": "Sunrise Meadow" },
            "api": {
                "model": "fal-ai/flux-pro/kontext",
                "cost_per_image": 0.04,
                "defaults": { "guidance_scale": 3.5, "num_inference_steps": 28, "output_format": "jpeg" }
            },
            "active_style": "watercolor",
            "style_presets": {
                "watercolor": { "name": "Watercolor", "prompt": "soft watercolor, gentle light" },
                "flat": { "name": "Flat", "prompt": "flat vector shapes" }
            },
            "prompt_templates": {
                "hero_shot": "{character_name}, {character_description}, in {location}. {style_prompt}",
                "consistency_suffix": "Keep every character on-model."
            },
            "image_settings": {
                "aspect_ratios": { "square": "1:1", "landscape": "3:2", "portrait": "2:3" },
                "scene_ratio": "landscape"
            },
            "characters": {
                "barnaby_bunny": {
                    "name": "Barnaby Bunny",
                    "description": "a small gray rabbit with floppy ears",
                    "virtues": ["courage"],
                    "reference_image": "./refs/barnaby.jpg"
                },
                "gus_goat": { "name": "Gus Goat", "description": "a sturdy brown goat" }
            },
            "locations": {
                "meadow": { "name": "The Meadow", "description": "a sunlit meadow dotted with daisies" }
            },
            "books": {
                "book_02": { "title": "Second", "book_number": 2, "featured_character": "gus_goat" },
                "book_01": {
                    "title": "First", "book_number": 1,
                    "featured_character": "barnaby_bunny",
                    "supporting_characters": ["gus_goat"],
                    "primary_location": "meadow",
                    "scenes": [
                        { "page": 1, "prompt": "Barnaby wakes up" },
                        { "page": 2, "prompt": "Barnaby meets Gus" }
                    ]
                }
            }
        })
    }

    fn store_from(value: Value) -> ConfigStore {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        ConfigStore::load(file.path()).unwrap()
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ConfigStore::load("./no/such/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = ConfigStore::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn typed_lookup_and_miss() {
        let store = store_from(sample_config());
        let barnaby = store.character("barnaby_bunny").unwrap();
        assert_eq!(barnaby.id, "barnaby_bunny");
        assert_eq!(barnaby.name, "Barnaby Bunny");
        assert!(store.character("nobody").is_none());
        assert!(store.location("meadow").is_some());
        assert!(store.book("book_99").is_none());
    }

    #[test]
    fn books_sorted_by_number() {
        let store = store_from(sample_config());
        let titles: Vec<&str> = store.books().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let store = store_from(sample_config());
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("config.json");
        store.save(Some(&out)).unwrap();

        let reloaded = ConfigStore::load(&out).unwrap();
        assert_eq!(reloaded.character_ids(), store.character_ids());
        assert_eq!(reloaded.active_style(), "watercolor");
        assert_eq!(reloaded.export(), store.export());
    }

    #[test]
    fn active_style_switching() {
        let mut store = store_from(sample_config());
        assert_eq!(store.active_style(), "watercolor");
        assert!(store.set_active_style("flat"));
        assert_eq!(store.active_style(), "flat");
        assert_eq!(store.active_style_prompt(), "flat vector shapes");
        assert!(!store.set_active_style("neon"));
        assert_eq!(store.active_style(), "flat");
    }

    #[test]
    fn partial_template_substitution() {
        let mut store = store_from(sample_config());
        store
            .set_value(
                "prompt_templates.two_vars",
                json!("first {a} then {b} end"),
            )
            .unwrap();
        let rendered = store.build_prompt("two_vars", &[("a", "A".to_string())]);
        assert_eq!(rendered, "first A then {b} end");
    }

    #[test]
    fn style_prompt_injected_unless_supplied() {
        let store = store_from(sample_config());
        let rendered = store.build_prompt(
            "hero_shot",
            &[
                ("character_name", "Barnaby Bunny".to_string()),
                ("character_description", "a rabbit".to_string()),
                ("location", "the meadow".to_string()),
            ],
        );
        assert!(rendered.ends_with("soft watercolor, gentle light"));

        let overridden = store.build_prompt(
            "hero_shot",
            &[
                ("character_name", "Barnaby Bunny".to_string()),
                ("character_description", "a rabbit".to_string()),
                ("location", "the meadow".to_string()),
                ("style_prompt", "charcoal sketch".to_string()),
            ],
        );
        assert!(overridden.ends_with("charcoal sketch"));
    }

    #[test]
    fn unknown_template_renders_empty() {
        let store = store_from(sample_config());
        assert_eq!(store.build_prompt("no_such_template", &[]), "");
    }

    #[test]
    fn dot_path_get_and_set() {
        let mut store = store_from(sample_config());
        assert_eq!(
            store.get_value("api.defaults.output_format"),
            Some(&json!("jpeg"))
        );
        assert!(store.get_value("api.nope.deeper").is_none());

        store
            .set_value("generation_settings.rate_limit_delay_seconds", json!(0.5))
            .unwrap();
        assert_eq!(store.rate_limit_delay(), Duration::from_millis(500));

        // intermediate objects created on demand
        store.set_value("brand.palette.primary", json!("#ffaa00")).unwrap();
        assert_eq!(store.get_value("brand.palette.primary"), Some(&json!("#ffaa00")));
    }

    #[test]
    fn failed_set_value_rolls_back_the_document() {
        let mut store = store_from(sample_config());
        let err = store
            .set_value("characters.barnaby_bunny.name", json!(5))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        // typed view and raw document both still hold the old value
        assert_eq!(store.character("barnaby_bunny").unwrap().name, "Barnaby Bunny");
        assert_eq!(
            store.get_value("characters.barnaby_bunny.name"),
            Some(&json!("Barnaby Bunny"))
        );

        // the document is still loadable after a save
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("config.json");
        store.save(Some(&out)).unwrap();
        assert!(ConfigStore::load(&out).is_ok());
    }

    #[test]
    fn failed_upsert_leaves_no_partial_entity() {
        let mut store = store_from(sample_config());
        assert!(store.upsert_character("zed", json!({ "name": 5 })).is_err());
        assert!(store.character("zed").is_none());
        assert!(store.get_value("characters.zed").is_none());

        assert!(store
            .update_character("barnaby_bunny", json!({ "virtues": "not-a-list" }))
            .is_err());
        assert!(store.character("barnaby_bunny").unwrap().has_virtue("courage"));
        assert_eq!(
            store.get_value("characters.barnaby_bunny.virtues"),
            Some(&json!(["courage"]))
        );
    }

    #[test]
    fn set_value_refreshes_typed_views() {
        let mut store = store_from(sample_config());
        store
            .set_value("characters.barnaby_bunny.name", json!("Sir Barnaby"))
            .unwrap();
        assert_eq!(store.character("barnaby_bunny").unwrap().name, "Sir Barnaby");
    }

    #[test]
    fn description_block_skips_unknown_ids() {
        let store = store_from(sample_config());
        let block = store.character_description_block(&[
            "barnaby_bunny".to_string(),
            "nobody".to_string(),
            "gus_goat".to_string(),
        ]);
        assert_eq!(
            block,
            "Barnaby Bunny: a small gray rabbit with floppy ears\nGus Goat: a sturdy brown goat"
        );
    }

    #[test]
    fn api_defaults_fall_back_when_absent() {
        let store = store_from(json!({ "characters": {} }));
        let defaults = store.api_defaults();
        assert_eq!(defaults.guidance_scale, 3.5);
        assert_eq!(defaults.num_inference_steps, 28);
        assert_eq!(defaults.output_format, "jpeg");
        assert_eq!(store.cost_per_image(), 0.04);
        assert!(store.save_prompts());
    }

    #[test]
    fn ratio_lookup_and_dimensions() {
        let store = store_from(sample_config());
        let settings = store.image_settings();
        assert_eq!(settings.ratio_for("scene"), "3:2");
        assert_eq!(settings.dimensions_for("scene"), (1024, 682));
        assert_eq!(settings.dimensions_for("cover"), (682, 1024));
        // unknown kind falls through default selection to 1:1
        assert_eq!(settings.dimensions_for("unknown"), (1024, 1024));
    }

    #[test]
    fn huge_ratio_terms_do_not_overflow() {
        let mut settings = ImageSettings::default();
        settings
            .aspect_ratios
            .insert("wide".to_string(), "8000000:5000000".to_string());
        settings.default_aspect_ratio = "wide".to_string();
        assert_eq!(settings.dimensions_for("anything"), (1024, 640));
    }
}
