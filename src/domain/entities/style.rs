//! Style preset entity - a reusable visual-style prompt fragment

use serde::{Deserialize, Serialize};

/// A named visual style whose prompt fragment is merged into every
/// generation prompt while the preset is active
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylePreset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Prompt fragment appended to generated prompts
    #[serde(default)]
    pub prompt: String,
}
