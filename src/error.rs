use axum::{Json, http::StatusCode, response::IntoResponse};
use handlebars::{RenderError, TemplateError};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RosterError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Template render error: {0}")]
    Template(#[from] RenderError),

    #[error("Template registration error: {0}")]
    TemplateRegistration(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Section name already exists: {0}")]
    DuplicateSection(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Section {0} not found")]
    SectionNotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Too many attempts; try again shortly")]
    RateLimited,
}

impl RosterError {
    pub fn status(&self) -> StatusCode {
        match self {
            RosterError::DuplicateUsername(_) | RosterError::DuplicateSection(_) => {
                StatusCode::CONFLICT
            }
            RosterError::UserNotFound(_) => StatusCode::NOT_FOUND,
            // An unknown section id can only come from a stale or forged form.
            RosterError::SectionNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RosterError::Validation(_) => StatusCode::BAD_REQUEST,
            RosterError::Unauthorized => StatusCode::UNAUTHORIZED,
            RosterError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RosterError::Database(_)
            | RosterError::Template(_)
            | RosterError::TemplateRegistration(_)
            | RosterError::Io(_)
            | RosterError::Config(_)
            | RosterError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors the admin caused and can fix from the page they are on.
    pub fn is_user_facing(&self) -> bool {
        !self.status().is_server_error()
    }

    fn code(&self) -> &'static str {
        match self {
            RosterError::DuplicateUsername(_) => "DUPLICATE_USERNAME",
            RosterError::DuplicateSection(_) => "DUPLICATE_SECTION",
            RosterError::UserNotFound(_) => "USER_NOT_FOUND",
            RosterError::SectionNotFound(_) => "SECTION_NOT_FOUND",
            RosterError::Validation(_) => "INVALID_INPUT",
            RosterError::Unauthorized => "UNAUTHORIZED",
            RosterError::RateLimited => "RATE_LIMIT",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for RosterError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if self.is_user_facing() {
            self.to_string()
        } else {
            tracing::error!(error = %self, "request failed");
            "An internal server error occurred.".to_string()
        };
        let body = ApiErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
