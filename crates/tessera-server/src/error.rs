//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the error type of every batch operation. It implements
//! `axum::response::IntoResponse` to produce structured JSON error responses
//! with appropriate HTTP status codes. [`BatchFailure`] wraps an `ApiError`
//! with the index of the operation that failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use tessera_core::CoreError;
use tessera_storage::StorageError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "UNKNOWN_IDENTIFIER").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional structured details (operation index, validation issues).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// A required argument is absent (400).
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// An id names no model, node, relation or variable (404).
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// A batch named two different models (400).
    #[error("multiple model ids in one batch: {0}")]
    MultipleModelIds(String),

    /// Meta and non-meta operations were mixed (400).
    #[error("unsupported operation combination: {0}")]
    UnsupportedOperationCombination(String),

    /// The validator rejected the model on save (422).
    #[error("validation failed")]
    ValidationFailure(Vec<String>),

    /// The user has no undoable change on this model (409).
    #[error("nothing to undo")]
    NothingToUndo,

    /// The user has no redoable change on this model (409).
    #[error("nothing to redo")]
    NothingToRedo,

    /// The id of a new node or model is already in use (409).
    #[error("identifier conflict: {0}")]
    IdentifierConflict(String),

    /// Malformed operation, argument or payload (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Machine-readable code of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "MISSING_PARAMETER",
            ApiError::UnknownIdentifier(_) => "UNKNOWN_IDENTIFIER",
            ApiError::MultipleModelIds(_) => "MULTIPLE_MODEL_IDS",
            ApiError::UnsupportedOperationCombination(_) => "UNSUPPORTED_OPERATION_COMBINATION",
            ApiError::ValidationFailure(_) => "VALIDATION_FAILURE",
            ApiError::NothingToUndo => "NOTHING_TO_UNDO",
            ApiError::NothingToRedo => "NOTHING_TO_REDO",
            ApiError::IdentifierConflict(_) => "IDENTIFIER_CONFLICT",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_)
            | ApiError::MultipleModelIds(_)
            | ApiError::UnsupportedOperationCombination(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownIdentifier(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NothingToUndo
            | ApiError::NothingToRedo
            | ApiError::IdentifierConflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self, extra: Option<serde_json::Value>) -> ApiErrorDetail {
        let message = match self {
            ApiError::ValidationFailure(issues) => {
                format!("{} validation issue(s)", issues.len())
            }
            other => other.to_string(),
        };
        let mut details = extra.unwrap_or(serde_json::Value::Null);
        if let ApiError::ValidationFailure(issues) = self {
            if !details.is_object() {
                details = serde_json::json!({});
            }
            details["issues"] = serde_json::json!(issues);
        }
        ApiErrorDetail {
            code: self.code().to_string(),
            message,
            details: (!details.is_null()).then_some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.detail(None),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::NodeNotFound { .. } | CoreError::EdgeNotFound { .. } => {
                ApiError::UnknownIdentifier(err.to_string())
            }
            CoreError::IdentifierConflict { .. } => ApiError::IdentifierConflict(err.to_string()),
            CoreError::Snapshot(_) => ApiError::BadRequest(err.to_string()),
            CoreError::InvalidChange { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::ModelNotFound(_) => ApiError::UnknownIdentifier(err.to_string()),
            _ => ApiError::InternalError(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch failures
// ---------------------------------------------------------------------------

/// A batch that stopped at its first error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct BatchFailure {
    /// Index of the failing operation; `None` when the batch failed while
    /// committing.
    pub operation_index: Option<usize>,
    pub error: ApiError,
    /// Free-form explanation (validation issues, one per line).
    pub commentary: Option<String>,
}

impl BatchFailure {
    pub fn at(operation_index: usize, error: ApiError) -> Self {
        let commentary = match &error {
            ApiError::ValidationFailure(issues) => Some(issues.join("\n")),
            _ => None,
        };
        BatchFailure {
            operation_index: Some(operation_index),
            error,
            commentary,
        }
    }

    pub fn on_commit(error: ApiError) -> Self {
        BatchFailure {
            operation_index: None,
            error,
            commentary: None,
        }
    }
}

impl IntoResponse for BatchFailure {
    fn into_response(self) -> Response {
        let extra = serde_json::json!({
            "operation_index": self.operation_index,
            "commentary": self.commentary,
        });
        let body = serde_json::json!({
            "success": false,
            "error": self.error.detail(Some(extra)),
        });
        (self.error.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_kinds() {
        let err: ApiError = CoreError::NodeNotFound { iri: "x".into() }.into();
        assert_eq!(err.code(), "UNKNOWN_IDENTIFIER");
        let err: ApiError = CoreError::IdentifierConflict { iri: "x".into() }.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_failure_carries_commentary() {
        let failure = BatchFailure::at(
            2,
            ApiError::ValidationFailure(vec!["a".to_string(), "b".to_string()]),
        );
        assert_eq!(failure.commentary.as_deref(), Some("a\nb"));
        let detail = failure.error.detail(None);
        assert_eq!(detail.details.unwrap()["issues"][1], "b");
    }
}
