use std::io::Error as IoError;

use actix_web::{
    http::StatusCode,
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;

pub mod config;
pub mod repository;
pub mod service;

pub use config::ConfigError;
pub use repository::RepositoryError;
pub use service::ServiceError;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum AppError {
    // Service-level domain errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict error: {0}")]
    Conflict(String),
    #[error("Not found error: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Password required: link '{0}' is password protected")]
    PasswordRequired(String),
    #[error("Internal error: {0}")]
    Internal(String),
    // Infrastructure/system errors
    #[error("Server error: {0}")]
    Server(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Logger error: {0}")]
    Logger(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<DatabaseError> for AppError {
    fn from(e: DatabaseError) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidUrl
            | ServiceError::InvalidSlug(_)
            | ServiceError::InvalidExpiration => AppError::Validation(err.to_string()),
            ServiceError::SlugUnavailable(_) => AppError::Conflict(err.to_string()),
            ServiceError::InvalidPassword => AppError::Unauthorized("invalid password".into()),
            ServiceError::NotFound => AppError::NotFound("link not found or expired".into()),
            ServiceError::Internal(msg) => {
                log::error!("Internal service error: {}", msg);
                AppError::Internal("An internal error occurred".into())
            }
            ServiceError::Repository(e) => {
                log::error!("Storage failure: {}", e);
                AppError::Internal("A storage error occurred".into())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Flatten field errors into a single string
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reasons = errs
                    .iter()
                    .map(|e| e.message.clone().unwrap_or_else(|| "invalid".into()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, reasons)
            })
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation(message)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) | AppError::PasswordRequired(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_)
            | AppError::Server(_)
            | AppError::Config(_)
            | AppError::Logger(_)
            | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_string = self.to_string();
        let (error_type, message) = error_string
            .split_once(":")
            .map(|(t, m)| (t.trim(), m.trim()))
            .unwrap_or(("Error", "An error occurred"));

        let error_message = if message.is_empty() {
            "An error occurred"
        } else {
            message
        };

        let code = self.status_code().as_u16();
        HttpResponse::build(self.status_code()).json(json!({
            "type": error_type.to_uppercase().replace(' ', "_"),
            "message": error_message,
            "status_code": code,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (ServiceError::InvalidUrl, StatusCode::BAD_REQUEST),
            (ServiceError::InvalidSlug("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidExpiration, StatusCode::BAD_REQUEST),
            (ServiceError::SlugUnavailable("docs".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidPassword, StatusCode::UNAUTHORIZED),
            (ServiceError::NotFound, StatusCode::NOT_FOUND),
            (ServiceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = AppError::from(ServiceError::Internal("pool exhausted on 10.0.0.3".into()));
        assert!(!err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn repository_not_found_becomes_service_not_found() {
        let err = ServiceError::from(RepositoryError::NotFound("abc".into()));
        assert!(matches!(err, ServiceError::NotFound));
    }
}
