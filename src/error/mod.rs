use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::template::{TemplateError, Violation};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    violations: Option<Vec<Violation>>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn template_status(err: &TemplateError) -> (StatusCode, &'static str) {
    match err {
        TemplateError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TemplateError::AlreadyExists(_) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
        TemplateError::InvalidName(_) => (StatusCode::BAD_REQUEST, "INVALID_NAME"),
        TemplateError::InvalidTemplate(_) => (StatusCode::BAD_REQUEST, "INVALID_TEMPLATE"),
        TemplateError::InvalidLocale(_) => (StatusCode::BAD_REQUEST, "INVALID_LOCALE"),
        TemplateError::LocaleArchived(_) => (StatusCode::CONFLICT, "LOCALE_ARCHIVED"),
        TemplateError::LocaleInUse(_) => (StatusCode::CONFLICT, "LOCALE_IN_USE"),
        TemplateError::ContentInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CONTENT_INVALID"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = match &self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Internal(e) => {
                let log_msg = e.clone();
                let client_msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    log_msg.clone()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", client_msg, log_msg)
            }
            AppError::Template(e) => {
                let (status, code) = template_status(e);
                (status, code, e.to_string(), e.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let violations = match self {
            AppError::Template(TemplateError::ContentInvalid(violations)) => Some(violations),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
                violations,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
