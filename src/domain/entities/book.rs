//! Book entity - a multi-page story with an ordered scene list

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One illustrated page of a book
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenePage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub prompt: String,
    /// Characters present in this scene; when absent the book's
    /// featured + supporting set is used instead.
    #[serde(default)]
    pub characters: Option<Vec<String>>,
}

/// A book in the series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Display ordering within the series
    #[serde(default)]
    pub book_number: u32,
    /// Primary virtue this book teaches
    #[serde(default)]
    pub virtue: String,
    #[serde(default)]
    pub featured_character: String,
    #[serde(default)]
    pub supporting_characters: Vec<String>,
    #[serde(default)]
    pub primary_location: String,
    #[serde(default)]
    pub prop: String,
    #[serde(default)]
    pub mantra: String,
    #[serde(default)]
    pub micro_ritual: BTreeMap<String, String>,
    #[serde(default)]
    pub scenes: Vec<ScenePage>,
}

impl Book {
    /// All character ids for this book, featured first
    pub fn character_ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(1 + self.supporting_characters.len());
        ids.push(self.featured_character.clone());
        ids.extend(self.supporting_characters.iter().cloned());
        ids
    }

    /// Scenes whose page number falls within the range, inclusive on
    /// both bounds. Page numbers need not be contiguous.
    pub fn scenes_in_range(&self, start: u32, end: u32) -> Vec<&ScenePage> {
        self.scenes
            .iter()
            .filter(|s| s.page >= start && s.page <= end)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with_pages(pages: &[u32]) -> Book {
        Book {
            id: "book_01".to_string(),
            scenes: pages
                .iter()
                .map(|&page| ScenePage {
                    page,
                    prompt: format!("page {page}"),
                    characters: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn scene_range_is_inclusive_on_both_bounds() {
        let book = book_with_pages(&[1, 2, 3, 5, 8]);
        let filtered: Vec<u32> = book.scenes_in_range(2, 5).iter().map(|s| s.page).collect();
        assert_eq!(filtered, vec![2, 3, 5]);
    }

    #[test]
    fn character_ids_keep_featured_first() {
        let book = Book {
            featured_character: "barnaby_bunny".to_string(),
            supporting_characters: vec!["gus_goat".to_string(), "christy_cow".to_string()],
            ..Default::default()
        };
        assert_eq!(
            book.character_ids(),
            vec!["barnaby_bunny", "gus_goat", "christy_cow"]
        );
    }
}
