pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ModelError;

/// Hosted model provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the provider API
    pub api_base: String,

    /// Provider credential. Usually supplied through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vision-capable model used for analysis and verification
    pub analysis_model: String,

    /// Image generation model
    pub image_model: String,

    /// Sampling temperature for analysis and verification
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            analysis_model: "gemini-2.5-flash".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            temperature: 0.4,
            timeout_seconds: 180,
        }
    }
}

impl ModelConfig {
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

/// Raw image bytes plus their MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_data_uri(&self) -> String {
        crate::media::encode_data_uri(&self.mime_type, &self.data)
    }
}

/// The two capabilities the processing pipeline needs from a provider
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Ask the vision model about an image; returns its free-text answer
    async fn describe_image(&self, instruction: &str, image: &InlineImage) -> Result<String, ModelError>;

    /// Generate one square image. `Ok(None)` means the provider answered
    /// without any image data.
    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, ModelError>;

    fn name(&self) -> &str;
}

/// Create the provider client for the given configuration
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>, ModelError> {
    Ok(Arc::new(providers::GeminiProvider::new(config.clone())?))
}
