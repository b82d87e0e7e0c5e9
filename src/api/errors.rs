//! HTTP mapping for engine errors.
//!
//! Every failing handler responds with a JSON body of the shape
//! `{"message": "..."}` and a status code derived from the error class.
//! Internal failures never leak their detail to clients.

use crate::errors::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Wrapper giving `EngineError` an axum response mapping.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::InsufficientFunds => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            EngineError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            EngineError::Duplicate(msg) => (StatusCode::CONFLICT, msg.clone()),
            EngineError::Transaction(msg) | EngineError::Configuration(msg) => {
                error!("Internal error serving request: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}
