use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::core::EngineError;

use super::json_response;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request")]
    Validation(Vec<String>),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid API JSON payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    details: Vec<String>,
}

impl ApiError {
    pub fn details(&self) -> Vec<String> {
        match self {
            ApiError::Validation(errors) => errors.clone(),
            _ => Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        json_response(
            status,
            ErrorResponse {
                error: self.to_string(),
                details: self.details(),
            },
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
