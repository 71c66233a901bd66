use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use super::validation::FieldError;
use crate::auth::AuthError;
use crate::service::{ProducerError, ReadError};

/// Every error an API handler can return. Bodies are always `{message, ...}`;
/// internal failures never expose their cause.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(#[from] AuthError),

    #[error("Order not found")]
    NotFound,

    #[error("{0}")]
    Internal(&'static str),
}

impl From<ProducerError> for ApiError {
    fn from(error: ProducerError) -> Self {
        match error {
            ProducerError::InvalidOrder(_) => ApiError::Validation(vec![FieldError {
                field: "items".into(),
                message: "Order total is too large",
            }]),
            ProducerError::Persistence(_) => ApiError::Internal("Error creating order"),
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(error: ReadError) -> Self {
        match error {
            ReadError::NotFound => ApiError::NotFound,
            ReadError::Persistence(e) => {
                tracing::error!(error = %e, "Order lookup failed");
                ApiError::Internal("Error fetching order")
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(AuthError::Misconfigured(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors,
            }),
            ApiError::Unauthorized(AuthError::Misconfigured(_)) => json!({
                "message": "Authentication unavailable",
            }),
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
