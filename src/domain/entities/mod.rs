//! Storybook entities - characters, locations, books, and style presets

mod book;
mod character;
mod location;
mod style;

pub use book::{Book, ScenePage};
pub use character::Character;
pub use location::Location;
pub use style::StylePreset;
