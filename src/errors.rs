use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional machine-usable details (offending item ids, allowed transitions)
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

    #[error("Invalid response token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot transition from '{current}' to '{requested}'")]
    IllegalTransition {
        current: String,
        requested: String,
        allowed: Vec<String>,
    },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Quote already has an order")]
    AlreadyOrdered,

    #[error("Quote total must be a positive amount, got {0}")]
    InvalidAmount(i64),

    #[error("No active budget for this scope")]
    NoActiveBudget,

    #[error("Insufficient budget: requested {requested}, remaining {remaining}")]
    InsufficientBudget { requested: i64, remaining: i64 },

    #[error("Vendor request has expired")]
    Expired,

    #[error("Vendor request is cancelled")]
    Cancelled,

    #[error("Response edit limit of {limit} reached")]
    EditLimitExceeded { limit: i32 },

    #[error("Submitted items are not part of the request snapshot")]
    InvalidItems(Vec<Uuid>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
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
            Self::DatabaseError(_) | Self::EventError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidToken
            | Self::InvalidStatus(_)
            | Self::IllegalTransition { .. }
            | Self::InvalidAmount(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AlreadyOrdered | Self::Conflict(_) | Self::EditLimitExceeded { .. } => {
                StatusCode::CONFLICT
            }
            Self::Expired | Self::Cancelled => StatusCode::GONE,
            Self::InvalidItems(_) | Self::NoActiveBudget | Self::InsufficientBudget { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    /// Message suitable for HTTP responses. Internal errors return generic
    /// text so implementation details never leak to callers.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Structured details the caller can act on, where they exist.
    pub fn response_details(&self) -> Option<String> {
        match self {
            Self::IllegalTransition { allowed, .. } => {
                Some(format!("allowed transitions: {}", allowed.join(", ")))
            }
            Self::InvalidItems(ids) => Some(format!(
                "unknown item ids: {}",
                ids.iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.response_details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

/// API error type for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            ApiError::ServiceError(service_error) => (
                service_error.status_code(),
                service_error.response_message(),
                service_error.response_details(),
            ),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None)
            }
        };

        let error_response = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            ServiceError::InvalidToken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::AlreadyOrdered.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServiceError::Expired.status_code(), StatusCode::GONE);
        assert_eq!(
            ServiceError::InsufficientBudget {
                requested: 10,
                remaining: 5
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::NoActiveBudget.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::EditLimitExceeded { limit: 3 }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::NotFound("Quote not found".into()).response_message(),
            "Not found: Quote not found"
        );
    }

    #[test]
    fn illegal_transition_reports_allowed_targets() {
        let err = ServiceError::IllegalTransition {
            current: "PURCHASED".into(),
            requested: "PENDING".into(),
            allowed: vec![],
        };
        assert_eq!(err.response_details().unwrap(), "allowed transitions: ");
        let err = ServiceError::IllegalTransition {
            current: "PENDING".into(),
            requested: "PURCHASED".into(),
            allowed: vec!["PARSED".into(), "SENT".into()],
        };
        assert!(err
            .response_details()
            .unwrap()
            .contains("PARSED, SENT"));
    }
}
