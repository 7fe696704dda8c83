//! Location entity - a recurring setting characters appear in

use serde::{Deserialize, Serialize};

/// A location in the storybook world (read-only reference data)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub associated_virtues: Vec<String>,
    #[serde(default)]
    pub associated_characters: Vec<String>,
}
