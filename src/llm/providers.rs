use super::{GenerativeModel, InlineImage, ModelConfig};
use crate::error::ModelError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Gemini provider: `generateContent` for vision, Imagen `predict` for images
pub struct GeminiProvider {
    config: ModelConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: String,
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::Configuration("Gemini API key required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        let model = model.trim().trim_start_matches("models/");
        format!("{}/models/{}:{}", base, model, method)
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    async fn describe_image(&self, instruction: &str, image: &InlineImage) -> Result<String, ModelError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart {
                        text: None,
                        inline_data: Some(GeminiInlineData {
                            mime_type: image.mime_type.clone(),
                            data: STANDARD.encode(&image.data),
                        }),
                    },
                    GeminiPart {
                        text: Some(instruction.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let url = self.endpoint(&self.config.analysis_model, "generateContent");
        debug!("Sending vision request to {} ({} image bytes)", self.config.analysis_model, image.data.len());

        let response: GeminiResponse = self.post(&url, &request).await?.json().await?;

        let text = response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }

        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>, ModelError> {
        let request = ImagenRequest {
            instances: vec![ImagenInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio: "1:1".to_string(),
            },
        };

        let url = self.endpoint(&self.config.image_model, "predict");
        debug!("Sending image generation request to {}", self.config.image_model);

        let response: ImagenResponse = self.post(&url, &request).await?.json().await?;

        let Some(prediction) = response
            .predictions
            .into_iter()
            .find(|p| p.bytes_base64_encoded.as_deref().map_or(false, |b| !b.is_empty()))
        else {
            return Ok(None);
        };

        let encoded = prediction.bytes_base64_encoded.unwrap_or_default();
        let data = STANDARD.decode(encoded.as_bytes())?;
        let mime_type = prediction.mime_type.unwrap_or_else(|| "image/png".to_string());

        Ok(Some(InlineImage { mime_type, data }))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
