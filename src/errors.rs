use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::stock::StockWarning;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Unprocessable Entity")
    pub error: String,
    /// Stable machine-readable kind, e.g. `insufficient_stock`
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Structured detail, currently the offending lines of a stock failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Container is empty: {0}")]
    EmptyContainer(String),

    #[error("Insufficient stock for {} line(s)", .0.len())]
    InsufficientStock(Vec<StockWarning>),

    #[error("Payment for order {0} is already completed")]
    PaymentAlreadyCompleted(Uuid),

    #[error("Order {0} has no payable total")]
    InvalidOrderTotal(Uuid),

    #[error("Order {order_id} cannot be paid while {status}")]
    InvalidOrderStatus { order_id: Uuid, status: String },

    #[error("Unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),

    #[error("External payment reference {supplied} does not match order {order_id}")]
    ExternalPaymentMismatch { order_id: Uuid, supplied: String },

    #[error("External capture incomplete: {0}")]
    ExternalCaptureIncomplete(String),

    #[error("Payment processor unreachable: {0}")]
    TransportFailure(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

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
    /// Whether a storage error is a unique-constraint violation.
    pub fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }

    /// Maps a storage error to `Conflict` when it is a unique-constraint violation.
    pub fn from_db_conflict(err: DbErr, what: impl Into<String>) -> Self {
        if Self::is_unique_violation(&err) {
            ServiceError::Conflict(what.into())
        } else {
            ServiceError::DatabaseError(err)
        }
    }

    /// Stable machine-readable kind for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::ValidationError(_) => "validation_error",
            Self::EmptyContainer(_) => "empty_container",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::PaymentAlreadyCompleted(_) => "payment_already_completed",
            Self::InvalidOrderTotal(_) => "invalid_order_total",
            Self::InvalidOrderStatus { .. } => "invalid_order_status",
            Self::UnsupportedPaymentMethod(_) => "unsupported_payment_method",
            Self::ExternalPaymentMismatch { .. } => "external_payment_mismatch",
            Self::ExternalCaptureIncomplete(_) => "external_capture_incomplete",
            Self::TransportFailure(_) => "transport_failure",
            Self::ExternalServiceError(_) => "external_service_error",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// True when the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure(_) | Self::ConcurrentModification(_)
        )
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::EmptyContainer(_)
            | Self::InvalidOrderTotal(_)
            | Self::InvalidOrderStatus { .. }
            | Self::UnsupportedPaymentMethod(_)
            | Self::ExternalPaymentMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_)
            | Self::ConcurrentModification(_)
            | Self::PaymentAlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ExternalCaptureIncomplete(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::TransportFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InsufficientStock(lines) => serde_json::to_value(lines).ok(),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {}", self);
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.kind().to_string(),
            message: self.response_message(),
            details: self.details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
