//! API request handlers

use anyhow::Result;
use axum::extract::Multipart;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use super::models::{OptionsResponse, ProcessForm};
use super::server::AppState;
use crate::error::PipelineError;
use crate::llm::InlineImage;
use crate::media;
use crate::pipeline::{Pipeline, ProcessedResult};

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Result<Value> {
    Ok(serde_json::json!({
        "status": "healthy",
        "service": "boat-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "credentialConfigured": state.pipeline.is_some() || state.provider_error.is_some(),
        "providerError": state.provider_error,
        "model": state.pipeline.as_ref().map(|p| p.model_name().to_string()),
    }))
}

/// Handle style option listing requests
pub async fn list_options() -> Result<Value> {
    Ok(serde_json::to_value(OptionsResponse::current())?)
}

/// Read the multipart body of a processing request
pub async fn read_process_form(mut multipart: Multipart) -> Result<ProcessForm, PipelineError> {
    let mut form = ProcessForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let mime_type = image_mime_type(field.content_type(), field.file_name());
            let data = field
                .bytes()
                .await
                .map_err(|e| PipelineError::BadRequest(e.to_string()))?;
            debug!("Received image field: {} bytes ({})", data.len(), mime_type);
            if !data.is_empty() {
                form.image = Some((mime_type, data.to_vec()));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| PipelineError::BadRequest(e.to_string()))?;

        match name.as_str() {
            "location" => form.location = Some(value),
            "lens" => form.lens = Some(value),
            "dynamic" => form.dynamic = Some(value),
            "includeInteriors" => form.include_interiors = Some(value),
            other => debug!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(form)
}

/// Run the analyze, generate and verify stages for one submitted image
pub async fn process_image(pipeline: &Pipeline, form: ProcessForm) -> Result<ProcessedResult, PipelineError> {
    let style = form.style();
    let (mime_type, data) = form.image.ok_or(PipelineError::MissingImage)?;

    info!("📥 Processing request for {} KB image", data.len() / 1024);
    pipeline.run(&InlineImage::new(mime_type, data), &style).await
}

/// Declared part type first, then the file extension, then JPEG
fn image_mime_type(content_type: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(content_type) = content_type.filter(|c| c.starts_with("image/")) {
        return content_type.to_string();
    }

    match file_name.map(|n| media::mime_for_path(Path::new(n))) {
        Some(mime) if mime.starts_with("image/") => mime.to_string(),
        _ => "image/jpeg".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Some("image/png"), Some("boat.jpg")), "image/png");
        assert_eq!(image_mime_type(Some("application/octet-stream"), Some("boat.webp")), "image/webp");
        assert_eq!(image_mime_type(None, Some("boat")), "image/jpeg");
        assert_eq!(image_mime_type(None, None), "image/jpeg");
    }
}
