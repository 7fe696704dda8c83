//! Flux synthesis client
//!
//! reqwest adapter for the hosted Flux Kontext API. Implements the
//! `SynthesisPort` the application layer is written against.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::ports::{SynthesisPort, SynthesisRequest, SynthesisResponse};

pub const DEFAULT_BASE_URL: &str = "https://fal.run";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("synthesis API error: {0}")]
    Api(String),

    #[error("FAL_KEY environment variable not set")]
    MissingApiKey,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    guidance_scale: f64,
    num_inference_steps: u32,
    output_format: &'a str,
}

#[derive(Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

/// Client for the Flux Kontext synthesis API
#[derive(Debug)]
pub struct FluxClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl FluxClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Construct from `FAL_KEY`; missing key fails here, at startup,
    /// rather than mid-batch
    pub fn from_env(
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, SynthesisError> {
        let api_key = std::env::var("FAL_KEY").map_err(|_| SynthesisError::MissingApiKey)?;
        Ok(Self::new(base_url, model, api_key))
    }

    async fn submit(&self, request: &SynthesisRequest) -> Result<Vec<String>, SynthesisError> {
        let url = format!("{}/{}", self.base_url, self.model);
        debug!(url = %url, "submitting synthesis request");

        let body = GenerateBody {
            prompt: &request.prompt,
            image_url: request.reference_url.as_deref(),
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
            output_format: &request.output_format,
        };

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(format!("{status}: {detail}")));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.images.into_iter().map(|i| i.url).collect())
    }

    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, SynthesisError> {
        let url = format!("{}/storage/upload", self.base_url);
        debug!(url = %url, size = bytes.len(), "uploading image");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key))
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api(format!("upload failed: {status}: {detail}")));
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(parsed.url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SynthesisError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::Api(format!("download failed: {status}")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SynthesisPort for FluxClient {
    async fn generate(&self, request: SynthesisRequest) -> anyhow::Result<SynthesisResponse> {
        let images = self.submit(&request).await?;
        Ok(SynthesisResponse { images })
    }

    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        Ok(self.upload_bytes(bytes, content_type).await?)
    }

    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        Ok(self.fetch(url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_body_omits_absent_reference() {
        let body = GenerateBody {
            prompt: "a rabbit",
            image_url: None,
            guidance_scale: 3.5,
            num_inference_steps: 28,
            output_format: "jpeg",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("image_url").is_none());
        assert_eq!(json["guidance_scale"], 3.5);

        let with_ref = GenerateBody {
            image_url: Some("https://img.example/ref.jpg"),
            ..body
        };
        let json = serde_json::to_value(&with_ref).unwrap();
        assert_eq!(json["image_url"], "https://img.example/ref.jpg");
    }

    #[test]
    fn missing_key_is_reported_at_construction() {
        let _env = crate::infrastructure::config::env_guard();
        std::env::remove_var("FAL_KEY");
        let err = FluxClient::from_env(DEFAULT_BASE_URL, "fal-ai/flux-pro/kontext").unwrap_err();
        assert!(matches!(err, SynthesisError::MissingApiKey));
    }
}
