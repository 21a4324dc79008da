use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Standard error payload returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Request with ID 550e8400-e29b-41d4-a716-446655440000 not found",
    "timestamp": "2025-11-02T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Request with ID 550e8400-e29b-41d4-a716-446655440000 not found")]
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    #[schema(example = "2025-11-02T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0} already exists")]
    Duplicate(String),

    /// Delete blocked by rows that still reference the target. Carries the
    /// entity description and the blocking count for the user-facing message.
    #[error("Cannot delete {entity}. It is referenced by {count} {referrer}.")]
    ReferencedByOthers {
        entity: String,
        referrer: String,
        count: u64,
    },

    /// Re-auth gate failure. The message is deliberately generic: it must not
    /// reveal whether the user exists or which check failed.
    #[error("Invalid password. Please try again.")]
    InvalidCredentials,

    #[error("Request must contain at least one valid line item")]
    EmptyRequest,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::EmptyRequest => StatusCode::BAD_REQUEST,
            Self::Duplicate(_) | Self::ReferencedByOthers { .. } => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Storage-layer failures return a generic message so raw database
    /// internals never reach the user; details are logged at the error site.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.response_message();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed with internal error");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::EmptyRequest.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Duplicate("Office".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::ReferencedByOthers {
                entity: "item".into(),
                referrer: "request(s)".into(),
                count: 3,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn response_message_hides_storage_details() {
        let err = ServiceError::DatabaseError(sea_orm::error::DbErr::Custom(
            "connection string with password".into(),
        ));
        assert_eq!(err.response_message(), "Internal server error");

        // User-correctable errors keep their actual message.
        assert_eq!(
            ServiceError::ValidationError("Item name is required".into()).response_message(),
            "Validation error: Item name is required"
        );
    }

    #[test]
    fn referenced_by_others_message_includes_count() {
        let err = ServiceError::ReferencedByOthers {
            entity: "item".into(),
            referrer: "request(s)".into(),
            count: 4,
        };
        assert_eq!(
            err.to_string(),
            "Cannot delete item. It is referenced by 4 request(s)."
        );
    }

    #[test]
    fn invalid_credentials_message_is_generic() {
        assert_eq!(
            ServiceError::InvalidCredentials.to_string(),
            "Invalid password. Please try again."
        );
    }

    #[tokio::test]
    async fn error_response_body_shape() {
        let response = ServiceError::NotFound("Request not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Not Found");
        assert_eq!(payload.message, "Not found: Request not found");
    }
}
