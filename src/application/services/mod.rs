//! Application services - the generation use cases
//!
//! The engine performs single-image operations; the batch orchestrator
//! sequences them with rate limiting; the prompt builder holds the pure
//! string assembly both lean on.

pub mod batch_service;
pub mod generation_service;
pub mod prompt_builder;

pub use batch_service::{BatchOrchestrator, BookBatchRequest};
pub use generation_service::{
    CoverRequest, GenerationEngine, GenerationError, GroupShotRequest, HeroShotRequest,
    SceneRequest,
};
