use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::scheduling::SlotConflict;

/// Which uniqueness constraint an insert collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    ConfirmationCode,
    Slot,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("uniqueness violation: {0:?}")]
    UniquenessViolation(UniqueKey),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::UniquenessViolation(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Why a booking request or a booking lookup/cancellation was refused.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("The {0} field is required.")]
    MissingField(&'static str),

    #[error("Name must have between 2 and 100 characters.")]
    InvalidName,

    #[error("Phone number must have 10 or 11 digits including the area code.")]
    InvalidPhone,

    #[error("Service '{0}' is not available.")]
    InvalidService(String),

    #[error("{0}")]
    InvalidDate(String),

    #[error("Start time must use the HH:MM format.")]
    InvalidTime,

    #[error("That time is not available ({0}). Please choose another one.")]
    SlotUnavailable(SlotConflict),

    #[error("The confirmation code is already in use.")]
    UniquenessViolation,

    #[error("Booking not found or already cancelled.")]
    NotFound,

    #[error("Internal server error. Please try again.")]
    Internal(anyhow::Error),
}

impl BookingError {
    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::MissingField(_) => "missing_field",
            BookingError::InvalidName => "invalid_name",
            BookingError::InvalidPhone => "invalid_phone",
            BookingError::InvalidService(_) => "invalid_service",
            BookingError::InvalidDate(_) => "invalid_date",
            BookingError::InvalidTime => "invalid_time",
            BookingError::SlotUnavailable(_) => "slot_unavailable",
            BookingError::UniquenessViolation => "uniqueness_violation",
            BookingError::NotFound => "not_found",
            BookingError::Internal(_) => "internal_error",
        }
    }
}

impl From<anyhow::Error> for BookingError {
    fn from(e: anyhow::Error) -> Self {
        BookingError::Internal(e)
    }
}

impl From<rusqlite::Error> for BookingError {
    fn from(e: rusqlite::Error) -> Self {
        BookingError::Internal(e.into())
    }
}

impl From<AppError> for BookingError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::UniquenessViolation(UniqueKey::ConfirmationCode) => {
                BookingError::UniquenessViolation
            }
            AppError::UniquenessViolation(UniqueKey::Slot) => {
                BookingError::SlotUnavailable(SlotConflict::Booked)
            }
            other => BookingError::Internal(other.into()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::NotFound => AppError::NotFound(e.to_string()),
            BookingError::Internal(inner) => AppError::Internal(inner),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::SlotUnavailable(_) | BookingError::UniquenessViolation => {
                StatusCode::CONFLICT
            }
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::Internal(e) => {
                tracing::error!(error = %e, "booking operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        if status != StatusCode::INTERNAL_SERVER_ERROR {
            tracing::info!(reason = self.code(), "booking request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "reason": self.code(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
