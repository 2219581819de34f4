use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Error payload returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Product mismatch: 1 of 2 requested products could not be resolved",
    "details": null,
    "timestamp": "2025-06-01T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional error details (validation errors in dev mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The supplied payment signature does not match the gateway secret.
    /// Terminal: never retried, nothing is written.
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// A cart line referenced a product the catalog could not resolve.
    #[error("Product mismatch: {0}")]
    ProductMismatch(String),

    /// The payment gateway rejected or failed the order-creation call.
    #[error("Payment initiation failed: {0}")]
    PaymentFailed(String),

    /// Write conflict on the idempotency key; safe for the caller to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

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
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidSignature | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ProductMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PaymentFailed(_) | Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message suitable for HTTP responses. Infrastructure errors return
    /// generic text so implementation details never leak to the caller.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::ExternalServiceError(_) => "Upstream service unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// True when the failure category is safe for the caller to retry:
    /// the settlement idempotency key turns a retry into a no-op if the
    /// first attempt actually committed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_)
                | Self::DatabaseError(_)
                | Self::ExternalServiceError(_)
                | Self::PaymentFailed(_)
        )
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_errors_are_not_retryable() {
        assert!(!ServiceError::InvalidSignature.is_retryable());
        assert!(!ServiceError::ProductMismatch("missing".into()).is_retryable());
        assert!(ServiceError::Conflict("duplicate payment ref".into()).is_retryable());
    }

    #[test]
    fn database_errors_hide_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("secret table".into()));
        assert_eq!(err.response_message(), "Database error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn signature_failures_map_to_unauthorized() {
        assert_eq!(
            ServiceError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
