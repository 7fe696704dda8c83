//! Domain layer - storybook entities loaded from the project configuration

pub mod entities;
