//! Maps `CodeqaError` onto the HTTP surface (§6.1, §7), in the shape
//! the `rag-api-server` example's `ApiError` uses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use error::CodeqaError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Thin wrapper so `CodeqaError` (defined in a lower crate) can implement
/// axum's `IntoResponse` here without an orphan-rule violation.
pub struct ApiError(pub CodeqaError);

impl From<CodeqaError> for ApiError {
    fn from(err: CodeqaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CodeqaError::Validation { .. } | CodeqaError::Json(_) => StatusCode::BAD_REQUEST,
            CodeqaError::NotFound { .. } => StatusCode::NOT_FOUND,
            CodeqaError::Provider { .. } | CodeqaError::Store { .. } | CodeqaError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CodeqaError::Tool { .. } | CodeqaError::Config { .. } | CodeqaError::IterationBudgetExhausted { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }

        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}
