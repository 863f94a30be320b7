//! Analyze → generate → verify pipeline behind `POST /api/process`

pub mod analysis;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::llm::{GenerativeModel, InlineImage};
use crate::style::StyleParams;

pub use analysis::{BoatAnalysis, BoatInsights};

pub const VERIFICATION_INSTRUCTION: &str = "You are a quality reviewer for AI-generated marine marketing photos. Inspect this image and, in one short paragraph, point out any residual trailer fragments (bunks, rollers, winch posts, straps), distortion of the hull shape or graphics, and water physics problems such as missing waterline contact, wrong reflections or an implausible wake. If the image is clean, say so plainly.";

/// Final output attached to a queue item on success
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResult {
    /// Generated image as a `data:` URI
    pub generated_image: String,
    /// Exact prompt sent to the image model
    pub prompt: String,
    pub summary: String,
    /// Advisory text from the verification stage
    pub quality_report: String,
    #[serde(default)]
    pub insights: BoatInsights,
}

/// The three sequential model calls for one source image
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn GenerativeModel>,
}

impl Pipeline {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn run(&self, image: &InlineImage, style: &StyleParams) -> Result<ProcessedResult, PipelineError> {
        let start_time = Instant::now();
        info!(
            "🚤 Processing {} bytes ({}) lens={} dynamic={} location=\"{}\"",
            image.data.len(),
            image.mime_type,
            style.lens,
            style.dynamic,
            style.location
        );

        let analysis = self.analyze(image, style).await?;
        if analysis.should_reject {
            let reason = analysis.rejection_reason();
            warn!("Source photo rejected: {}", reason);
            return Err(PipelineError::Rejected(reason));
        }

        let prompt = prompt::build_generation_prompt(style, &analysis.insights);
        let generated = self.generate(&prompt).await?;
        let quality_report = self.verify(&generated).await?;

        info!("✅ Pipeline finished in {:.2}s", start_time.elapsed().as_secs_f64());

        Ok(ProcessedResult {
            generated_image: generated.to_data_uri(),
            prompt,
            summary: analysis.summary,
            quality_report,
            insights: analysis.insights,
        })
    }

    async fn analyze(&self, image: &InlineImage, style: &StyleParams) -> Result<BoatAnalysis, PipelineError> {
        let instruction = analysis::analysis_instruction(style.location.trim());
        let text = self.model.describe_image(&instruction, image).await?;
        debug!("Analysis response: {}", text);
        Ok(analysis::parse_analysis(&text))
    }

    async fn generate(&self, prompt: &str) -> Result<InlineImage, PipelineError> {
        debug!("Generation prompt:\n{}", prompt);
        match self.model.generate_image(prompt).await? {
            Some(image) if !image.data.is_empty() => {
                info!("🖼️ Generated {} bytes ({})", image.data.len(), image.mime_type);
                Ok(image)
            }
            _ => Err(PipelineError::Generation(
                "the image model returned no image data".to_string(),
            )),
        }
    }

    async fn verify(&self, generated: &InlineImage) -> Result<String, PipelineError> {
        let report = self
            .model
            .describe_image(VERIFICATION_INSTRUCTION, generated)
            .await?;
        Ok(report.trim().to_string())
    }
}
