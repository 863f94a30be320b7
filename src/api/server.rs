//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use crate::config::Config;
use crate::error::{ModelError, PipelineError};
use crate::llm::{create_model, GenerativeModel};
use crate::pipeline::{Pipeline, ProcessedResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when the provider could not be set up; every processing
    /// request then fails with a server error.
    pub pipeline: Option<Pipeline>,
    /// Why a configured provider failed to build
    pub provider_error: Option<String>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the provider client from configuration
    pub fn from_config(config: Arc<Config>) -> Self {
        if !config.provider.has_credential() {
            warn!("⚠️  No provider credential configured; /api/process will return 500");
            return Self {
                pipeline: None,
                provider_error: None,
                config,
            };
        }

        let model = create_model(&config.provider);
        Self::from_model_result(model, config)
    }

    /// Use an already constructed model
    pub fn with_model(model: Arc<dyn GenerativeModel>, config: Arc<Config>) -> Self {
        Self::from_model_result(Ok(model), config)
    }

    /// Keep the construction error so requests can report it
    pub fn from_model_result(model: Result<Arc<dyn GenerativeModel>, ModelError>, config: Arc<Config>) -> Self {
        match model {
            Ok(model) => Self {
                pipeline: Some(Pipeline::new(model)),
                provider_error: None,
                config,
            },
            Err(e) => {
                warn!("⚠️  Failed to create model provider: {}", e);
                Self {
                    pipeline: None,
                    provider_error: Some(e.to_string()),
                    config,
                }
            }
        }
    }

    /// The pipeline, or the reason processing is impossible
    pub fn pipeline(&self) -> Result<&Pipeline, PipelineError> {
        match (&self.pipeline, &self.provider_error) {
            (Some(pipeline), _) => Ok(pipeline),
            (None, Some(reason)) => Err(PipelineError::Unavailable(reason.clone())),
            (None, None) => Err(PipelineError::MissingCredential),
        }
    }
}

/// Build the application router with its middleware
pub fn build_router(state: AppState) -> Router {
    let server_config = state.config.server.clone();

    let app = Router::new()
        // Health check endpoints (both paths for compatibility)
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/options", get(options_handler))
        .route("/api/process", post(process_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server_config.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    if server_config.enable_cors {
        // Configure CORS to allow browser access
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

/// Configure and start the HTTP server
pub async fn start_http_server(config: Arc<Config>) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("🚀 Starting HTTP server on {}", addr);

    let app = build_router(AppState::from_config(config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🌐 API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match handlers::health_check(&state).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    }
}

/// Style options handler
async fn options_handler() -> impl IntoResponse {
    match handlers::list_options().await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    }
}

/// Image processing handler. The credential is checked before the body is read.
async fn process_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessedResult>, PipelineError> {
    let pipeline = state.pipeline()?;
    let form = handlers::read_process_form(multipart).await?;

    match handlers::process_image(pipeline, form).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!("❌ Processing request failed ({}): {}", e.status_code(), e);
            Err(e)
        }
    }
}
