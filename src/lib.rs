/// Boat Studio - turns photos of boats on trailers into on-water marketing images
///
/// The server side runs a three stage pipeline (analyze, generate, verify)
/// against hosted generative models. The client side feeds a queue of
/// uploads through that endpoint one item at a time.

pub mod api;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod intake;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod processing;
pub mod state;
pub mod style;

// Re-export main types for easy access
pub use crate::client::{ClientConfig, HttpProcessingEndpoint};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{ClientError, ModelError, PipelineError};
pub use crate::intake::{intake, IntakeReport};
pub use crate::llm::{GenerativeModel, InlineImage, ModelConfig};
pub use crate::pipeline::{BoatAnalysis, BoatInsights, Pipeline, ProcessedResult};
pub use crate::processing::{Orchestrator, PassOutcome, PassSummary, ProcessingEndpoint};
pub use crate::state::{ItemStatus, QueueEvent, QueueItem, QueueStore, SourceFile};
pub use crate::style::{LensProfile, ShotDynamic, StyleParams};
