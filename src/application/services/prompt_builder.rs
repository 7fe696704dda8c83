//! Prompt assembly helpers
//!
//! Pure functions that turn entities into the variable sets consumed by
//! the prompt templates. Substitution itself lives on the configuration
//! store; everything here is deterministic string building.

use crate::domain::entities::{Book, Character};

/// Character names joined with ", "
pub fn name_list(characters: &[&Character]) -> String {
    characters
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One "- {name}: {description}" line per character, used by group shots
pub fn bulleted_description_block(characters: &[&Character]) -> String {
    characters
        .iter()
        .map(|c| format!("- {}: {}", c.name, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Variables for the `hero_shot` template
pub fn hero_shot_vars(character: &Character, location_desc: &str) -> Vec<(&'static str, String)> {
    vec![
        ("character_name", character.name.clone()),
        ("character_description", character.description.clone()),
        ("location", location_desc.to_string()),
    ]
}

/// Variables for the `group_shot` template
pub fn group_shot_vars(
    characters: &[&Character],
    location_desc: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("character_list", name_list(characters)),
        ("character_descriptions", bulleted_description_block(characters)),
        ("location_description", location_desc.to_string()),
    ]
}

/// Variables for the `scene` template
pub fn scene_vars(
    scene_description: &str,
    character_list: String,
    character_descriptions: String,
    location_desc: &str,
    additional_notes: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("scene_description", scene_description.to_string()),
        ("character_list", character_list),
        ("character_descriptions", character_descriptions),
        ("location_description", location_desc.to_string()),
        ("additional_notes", additional_notes.to_string()),
    ]
}

/// Variables for the `cover` template
pub fn cover_vars(
    book: &Book,
    featured: &Character,
    location_desc: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("book_title", book.title.clone()),
        ("virtue", book.virtue.clone()),
        ("featured_character_name", featured.name.clone()),
        ("featured_character_description", featured.description.clone()),
        ("location_description", location_desc.to_string()),
    ]
}

/// Append the consistency suffix after a blank line, when one is configured
pub fn append_consistency(prompt: String, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) if !suffix.is_empty() => format!("{prompt}\n\n{suffix}"),
        _ => prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(name: &str, description: &str) -> Character {
        Character {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn name_list_preserves_order() {
        let barnaby = character("Barnaby Bunny", "a rabbit");
        let gus = character("Gus Goat", "a goat");
        assert_eq!(name_list(&[&barnaby, &gus]), "Barnaby Bunny, Gus Goat");
    }

    #[test]
    fn bulleted_block_one_line_per_character() {
        let barnaby = character("Barnaby Bunny", "a rabbit");
        let gus = character("Gus Goat", "a goat");
        assert_eq!(
            bulleted_description_block(&[&barnaby, &gus]),
            "- Barnaby Bunny: a rabbit\n- Gus Goat: a goat"
        );
    }

    #[test]
    fn consistency_suffix_appended_after_blank_line() {
        let out = append_consistency("base prompt".to_string(), Some("stay on-model"));
        assert_eq!(out, "base prompt\n\nstay on-model");
        let untouched = append_consistency("base prompt".to_string(), None);
        assert_eq!(untouched, "base prompt");
        let empty = append_consistency("base prompt".to_string(), Some(""));
        assert_eq!(empty, "base prompt");
    }
}
