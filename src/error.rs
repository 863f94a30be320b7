//! Error types shared by the model providers, the processing endpoint and the
//! queue client

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

/// Errors raised while talking to the hosted model provider
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Image payload decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Outcomes of `POST /api/process` other than success.
///
/// Each variant maps onto one HTTP status; the response body is always
/// `{"error": <display text>}`.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("No image was provided")]
    MissingImage,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The analysis stage judged the source photo unusable. Displays the
    /// model's reason verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Server is missing the model provider credential")]
    MissingCredential,

    /// A credential is configured but the provider client could not be built
    #[error("Model provider unavailable: {0}")]
    Unavailable(String),

    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingImage | PipelineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::MissingCredential
            | PipelineError::Unavailable(_)
            | PipelineError::Generation(_)
            | PipelineError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Errors seen by the queue client when calling the processing endpoint
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response. Displays the server-provided text verbatim.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}
