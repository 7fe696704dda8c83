//! Data Transfer Objects - For API boundaries
//!
//! DTOs live in the application layer so infrastructure (HTTP/CLI) can
//! serialize without pulling presentation concerns into the domain model.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Outcome of a single image generation
///
/// Generation never raises out of the engine: lookup misses, upload
/// failures, API errors, and I/O errors are all captured here so batch
/// runs can keep going past individual failures.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    /// Where the image was written, when persistence is enabled
    pub output_path: Option<PathBuf>,
    /// Hosted URL returned by the synthesis service
    pub image_url: Option<String>,
    pub prompt_used: String,
    pub error: Option<String>,
    pub cost: f64,
    /// Wall-clock time for the whole operation
    #[serde(serialize_with = "duration_secs")]
    pub generation_time: Duration,
    pub metadata: BTreeMap<String, String>,
}

impl GenerationResult {
    /// A failed result, preserving whatever prompt was built before the
    /// failure occurred
    pub fn failure(prompt: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            image_url: None,
            prompt_used: prompt.into(),
            error: Some(error.into()),
            cost: 0.0,
            generation_time: Duration::ZERO,
            metadata: BTreeMap::new(),
        }
    }
}

fn duration_secs<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_secs_f64())
}

/// Aggregate view over an ordered batch of generation results
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub successful: usize,
    /// Spend on successful generations only
    pub total_cost: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[GenerationResult]) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let total_cost = results.iter().filter(|r| r.success).map(|r| r.cost).sum();
        Self {
            attempted: results.len(),
            successful,
            total_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_with_cost(cost: f64) -> GenerationResult {
        GenerationResult {
            success: true,
            output_path: None,
            image_url: Some("https://img.example/out.jpg".to_string()),
            prompt_used: "a prompt".to_string(),
            error: None,
            cost,
            generation_time: Duration::from_millis(1200),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_counts_and_prices_successes_only() {
        let results = vec![
            success_with_cost(0.04),
            GenerationResult::failure("p", "API error"),
            success_with_cost(0.04),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.successful, 2);
        assert!((summary.total_cost - 0.08).abs() < 1e-9);
    }

    #[test]
    fn failure_preserves_prompt_and_message() {
        let result = GenerationResult::failure("built prompt", "Character not found: zed");
        assert!(!result.success);
        assert_eq!(result.prompt_used, "built prompt");
        assert_eq!(result.error.as_deref(), Some("Character not found: zed"));
        assert_eq!(result.cost, 0.0);
    }
}
