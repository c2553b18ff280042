//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::community::CommunityError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::dose::DoseError;
use crate::news::NewsError;
use crate::notifications::NotificationError;
use crate::prescriptions::PrescriptionError;
use crate::scheduling::SchedulingError;
use crate::symptom_chat::ChatError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::AuthFailed(detail) => (
                StatusCode::UNAUTHORIZED,
                "AUTH_FAILED",
                detail.clone(),
            ),
            ApiError::Forbidden(detail) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                detail.clone(),
            ),
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::Conflict(detail) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                detail.clone(),
            ),
            ApiError::Storage(detail) => {
                tracing::error!(detail, "API storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE",
                    "Could not load data. Please try again later.".to_string(),
                )
            }
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "API upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_FAILED",
                    "The service is temporarily unavailable. Please try again.".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            other => ApiError::Storage(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredential | AuthError::InvalidSession => {
                ApiError::AuthFailed(err.to_string())
            }
            AuthError::DuplicateAccount => ApiError::Conflict(err.to_string()),
            AuthError::WeakPassword | AuthError::InvalidEmail | AuthError::MissingName => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::WrongRole(_) => ApiError::Forbidden(err.to_string()),
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidTemplate(_) | SchedulingError::SlotNotOffered(_) => {
                ApiError::BadRequest(err.to_string())
            }
            SchedulingError::UnknownDoctor(_) | SchedulingError::AppointmentNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            SchedulingError::SlotAlreadyBooked | SchedulingError::NotPending => {
                ApiError::Conflict(err.to_string())
            }
            SchedulingError::Database(e) => e.into(),
        }
    }
}

impl From<PrescriptionError> for ApiError {
    fn from(err: PrescriptionError) -> Self {
        match err {
            PrescriptionError::UnknownPatient(_)
            | PrescriptionError::NotFound(_)
            | PrescriptionError::MedicineNotFound(_) => ApiError::NotFound(err.to_string()),
            PrescriptionError::Database(e) => e.into(),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<DoseError> for ApiError {
    fn from(err: DoseError) -> Self {
        match err {
            DoseError::PrescriptionNotFound(_) | DoseError::MedicineNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            DoseError::PrescriptionInactive(_) | DoseError::NotScheduled { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            DoseError::AlreadyTaken | DoseError::OutOfStock(_) => {
                ApiError::Conflict(err.to_string())
            }
            DoseError::Database(e) => e.into(),
        }
    }
}

impl From<CommunityError> for ApiError {
    fn from(err: CommunityError) -> Self {
        match err {
            CommunityError::EmptyContent => ApiError::BadRequest(err.to_string()),
            CommunityError::Database(e) => e.into(),
            _ => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(_) => ApiError::NotFound(err.to_string()),
            NotificationError::EmptyMessage | NotificationError::NotLowStock => {
                ApiError::BadRequest(err.to_string())
            }
            NotificationError::Database(e) => e.into(),
        }
    }
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::Database(e) => e.into(),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}
