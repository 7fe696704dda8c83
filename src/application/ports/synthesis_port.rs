//! Synthesis port - interface to the hosted image synthesis API
//!
//! Application services drive all remote image work through this trait so
//! the engine never depends on a concrete HTTP client. The infrastructure
//! layer provides the implementation.

use async_trait::async_trait;

/// Parameters for one synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub prompt: String,
    /// Hosted URL of the reference image used for identity consistency
    pub reference_url: Option<String>,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub output_format: String,
}

/// Outcome of a synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    /// Hosted URLs of the generated images; services use the first
    pub images: Vec<String>,
}

/// Port for the remote image synthesis service
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    /// Submit a prompt and wait for the finished image
    async fn generate(&self, request: SynthesisRequest) -> anyhow::Result<SynthesisResponse>;

    /// Upload local image bytes, returning the hosted URL
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String>;

    /// Fetch the bytes of a generated image
    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}
