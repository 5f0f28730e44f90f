//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{debug, error};

use paperscope_core::Error as CoreError;

/// Error returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request is missing or malformed before any work starts.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Status code for a core error.
pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Fetch(_)
        | CoreError::IntentExtraction(_)
        | CoreError::HydeGeneration(_)
        | CoreError::Embedding(_)
        | CoreError::Inference(_)
        | CoreError::Vision(_)
        | CoreError::Request(_) => StatusCode::BAD_GATEWAY,
        CoreError::Index(_) | CoreError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => status_for(err),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Core(err) => err.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            // "No text found" and friends are user-facing as-is
            ApiError::Core(CoreError::InvalidInput(msg)) => msg.clone(),
            ApiError::Core(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), kind, error = %message, "Request failed");
        } else {
            debug!(status = status.as_u16(), kind, error = %message, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));
        (status, body).into_response()
    }
}
