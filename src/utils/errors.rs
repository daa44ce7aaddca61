use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::store::StoreError;
use crate::utils::logger::LOGGER;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<HashMap<String, Vec<String>>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub enum AppError {
    ValidationError(HashMap<String, Vec<String>>),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    UnsupportedMediaType(String),
    PayloadTooLarge(String),
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("Please authenticate".to_string())
    }

    pub fn job_not_found() -> Self {
        AppError::NotFound("Job not found".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            AppError::ValidationError(errors) => {
                ("VALIDATION_ERROR", "Validation failed".to_string(), Some(errors))
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg, None),
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg, None),
            AppError::UnsupportedMediaType(msg) => ("UNSUPPORTED_MEDIA_TYPE", msg, None),
            AppError::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE", msg, None),
            AppError::InternalServerError(msg) => {
                LOGGER.log_error(&msg, HashMap::new());
                // the cause stays in the log
                ("INTERNAL_SERVER_ERROR", "Server error".to_string(), None)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
            timestamp: Utc::now(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("Invalid value for field '{}'", field))
                })
                .collect();
            error_map.insert(field.to_string(), messages);
        }

        AppError::ValidationError(error_map)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection.status() {
            StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMediaType(message),
            StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(message),
            _ => AppError::BadRequest(message),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match &error {
            // callers that expect a conflict translate it into their own message first
            StoreError::Conflict(msg) => AppError::BadRequest(msg.clone()),
            StoreError::InvalidPattern(_) => AppError::BadRequest(error.to_string()),
            StoreError::Database(_) => AppError::InternalServerError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_hide_internal_error_message() {
        let response = AppError::InternalServerError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_should_map_store_errors() {
        let err: AppError = StoreError::Conflict("User already exists".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: AppError = StoreError::InvalidPattern("invalid escape \\ sequence".to_string()).into();
        match err {
            AppError::BadRequest(msg) => {
                assert_eq!(msg, "Invalid search pattern: invalid escape \\ sequence")
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err: AppError = StoreError::Database("boom".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_should_collect_validation_details() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("email", validator::ValidationError::new("email"));
        match AppError::from(errors) {
            AppError::ValidationError(details) => {
                assert_eq!(
                    details.get("email").map(Vec::as_slice),
                    Some(&["Invalid value for field 'email'".to_string()][..])
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
