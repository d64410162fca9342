use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// `message` is what the client sees; the source stays in the logs.
    #[error("Database error: {message}")]
    DatabaseError {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Upload error: {message}")]
    UploadError {
        message: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// Wraps a store failure with the message shown to the client.
    pub fn database(message: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::DatabaseError { message, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UploadError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg) => {
                warn!(status = %self.status_code(), message = %msg, "Request rejected");
            }
            AppError::DatabaseError { message, source } => {
                error!(error = ?source, message = %message, "Database error");
            }
            AppError::UploadError { message, source } => {
                error!(error = ?source, message = %message, "Upload error");
            }
            AppError::Unavailable(msg) => {
                error!(message = %msg, "Service unavailable");
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::DatabaseError { message, .. } | AppError::UploadError { message, .. } => {
                (*message).to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal details
        self.log();

        error_response(self.public_message(), status)
    }
}
