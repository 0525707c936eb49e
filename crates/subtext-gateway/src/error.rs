//! Error types for the Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use subtext_core::PipelineError;

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A pipeline failure rendered as an HTTP response.
///
/// Input-validation failures are the only class that reaches the caller
/// with field-level detail; every other failure becomes a generic 500 whose
/// body optionally carries internal detail when the gateway was started in
/// a non-production mode.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl ApiFailure {
    pub fn from_pipeline(err: &PipelineError, expose_details: bool) -> Self {
        if err.is_caller_fault() {
            return Self {
                status: StatusCode::BAD_REQUEST,
                body: serde_json::json!({ "error": err.public_message() }),
            };
        }

        let mut body = serde_json::json!({ "error": err.public_message() });
        if expose_details {
            // Internal rendering carries the stage and upstream detail.
            body["details"] = serde_json::Value::String(err.to_string());
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
