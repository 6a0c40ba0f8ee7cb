use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::db::services::ServiceError;
use crate::web::middleware::i18n::current_locale;
use crate::web::models::ApiResponse;

/// Error returned by every handler. Each variant fixes the envelope's
/// `errorCode` and the HTTP status; the payload is the (localized) message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Duplicate: {0}")]
    Duplicate(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("Tag in use: {0}")]
    TagInUse(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Missing tag id: {0}")]
    MissingTagId(String),
    #[error("Missing user id: {0}")]
    MissingUserId(String),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppError {
    pub fn error_code(&self) -> i32 {
        match self {
            AppError::NotFound(_) | AppError::Unauthorized(_) | AppError::MissingTagId(_) => 100,
            AppError::TagInUse(_) | AppError::DatabaseError(_) => 101,
            AppError::Duplicate(_) => 102,
            AppError::InvalidInput(_) => 103,
            AppError::InvalidAction(_) => 108,
            AppError::MissingUserId(_) => 400,
            AppError::TagNotFound(_) => 404,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::MissingTagId(_)
            | AppError::MissingUserId(_)
            | AppError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate(_) | AppError::TagInUse(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) | AppError::TagNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_message(self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::Duplicate(msg)
            | AppError::NotFound(msg)
            | AppError::TagNotFound(msg)
            | AppError::TagInUse(msg)
            | AppError::Unauthorized(msg)
            | AppError::MissingTagId(msg)
            | AppError::MissingUserId(msg)
            | AppError::InvalidAction(msg)
            | AppError::DatabaseError(msg) => msg,
        }
    }

    /// On the assignment endpoint a missing tag is reported with code 404.
    pub fn from_assignment(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => AppError::TagNotFound(t!("errors.not_found", locale = &current_locale(), what = what).to_string()),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.into_message();
        (status, Json(ApiResponse::error(error_code, message))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let locale = current_locale();
        match err {
            ServiceError::Validation(msg) => AppError::InvalidInput(t!("errors.validation", locale = &locale, detail = msg).to_string()),
            ServiceError::Duplicate(what) => AppError::Duplicate(t!("errors.duplicate", locale = &locale, what = what).to_string()),
            ServiceError::NotFound(what) => AppError::NotFound(t!("errors.not_found", locale = &locale, what = what).to_string()),
            ServiceError::TagInUse(_) => AppError::TagInUse(t!("tags.in_use", locale = &locale).to_string()),
            ServiceError::Unauthorized { .. } => AppError::Unauthorized(t!("tags.delete_forbidden", locale = &locale).to_string()),
            ServiceError::InvalidAction(_) => AppError::InvalidAction(t!("errors.invalid_action", locale = &locale).to_string()),
            ServiceError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        error!(error = %err, "Unexpected database failure.");
        AppError::DatabaseError(t!("errors.database", locale = &current_locale(), detail = err.to_string()).to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(t!("errors.validation", locale = &current_locale(), detail = rejection.body_text()).to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(t!("errors.validation", locale = &current_locale(), detail = rejection.body_text()).to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::NotFound(t!("errors.not_found", locale = &current_locale(), what = rejection.body_text()).to_string())
    }
}
