use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::TokenError;
use crate::store::StoreError;

use super::json_response;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("No token, authorization denied")]
    MissingToken,

    #[error("Token is not valid")]
    InvalidToken(#[from] TokenError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("User not found")]
    UserNotFound,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::InvalidToken(_)
            | ApiError::InvalidCredentials
            | ApiError::Store(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::UserNotFound | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => ErrorResponse {
                message: "Invalid request".to_string(),
                errors,
            },
            ApiError::InvalidToken(e) => {
                tracing::debug!("rejected token: {e}");
                ErrorResponse {
                    message: "Token is not valid".to_string(),
                    errors: Vec::new(),
                }
            }
            ApiError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                ErrorResponse {
                    message: "Server error".to_string(),
                    errors: Vec::new(),
                }
            }
            other => ErrorResponse {
                message: other.to_string(),
                errors: Vec::new(),
            },
        };
        json_response(status, body)
    }
}
