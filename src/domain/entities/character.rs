//! Character entity - a cast member with a canonical visual identity

use serde::{Deserialize, Serialize};

/// A character in the storybook cast
///
/// Loaded from the `characters` section of the project configuration.
/// The `id` is the configuration map key; every other field defaults to
/// empty when the document omits it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Narrative role tag, e.g. "core" or "supporting"
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub visual_cues: String,
    #[serde(default)]
    pub virtues: Vec<String>,
    /// Path or URL of the canonical reference image
    #[serde(default)]
    pub reference_image: String,
    /// Location ids this character may appear in
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub special_function: Option<String>,
    /// Whether this character's entrance carries the chime cue
    #[serde(default)]
    pub appears_with_chime: bool,
}

fn default_role() -> String {
    "core".to_string()
}

impl Character {
    pub fn has_virtue(&self, virtue: &str) -> bool {
        self.virtues.iter().any(|v| v == virtue)
    }
}
