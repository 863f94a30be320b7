//! HTTP client for the remote processing endpoint

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

use crate::error::ClientError;
use crate::pipeline::ProcessedResult;
use crate::processing::ProcessingEndpoint;
use crate::state::SourceFile;
use crate::style::StyleParams;

/// Client-side settings for reaching the processing server
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the server exposing `/api/process`
    pub server_url: String,
    /// Request timeout in seconds; one request covers all three model stages
    pub request_timeout_seconds: u64,
    /// Where the CLI writes generated images and reports
    pub output_dir: std::path::PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_seconds: 600,
            output_dir: std::path::PathBuf::from("./output"),
        }
    }
}

/// Calls `POST /api/process` with a multipart body
pub struct HttpProcessingEndpoint {
    url: String,
    client: reqwest::Client,
}

impl HttpProcessingEndpoint {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            url: format!("{}/api/process", config.server_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_form(file: &SourceFile, style: &StyleParams) -> Result<Form, ClientError> {
        let image = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;

        Ok(Form::new()
            .part("image", image)
            .text("location", style.location.clone())
            .text("lens", style.lens.id())
            .text("dynamic", style.dynamic.id())
            .text("includeInteriors", style.include_interiors.to_string()))
    }
}

#[async_trait]
impl ProcessingEndpoint for HttpProcessingEndpoint {
    async fn process(&self, file: &SourceFile, style: &StyleParams) -> Result<ProcessedResult, ClientError> {
        let form = Self::build_form(file, style)?;

        debug!("Posting {} ({} bytes) to {}", file.name, file.size(), self.url);
        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: server_message(status.as_u16(), &text),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<ProcessedResult>(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Prefer the `error` field of a JSON error body, then the raw text
fn server_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Processing failed with status {}", status)
    } else {
        body.to_string()
    }
}
