//! API Error Handling
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::CasinoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (VALIDATION_ERROR, FORBIDDEN, NOT_FOUND, etc.)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    Casino(CasinoError),
    BadRequest(String),
    Unauthorized(String),
}

impl ApiError {
    pub fn casino(request_id: String, error: CasinoError) -> Self {
        Self {
            kind: ApiErrorKind::Casino(error),
            request_id,
        }
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn unauthorized(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized(message),
            request_id,
        }
    }
}

/// HTTP status for a domain error
pub fn status_for(error: &CasinoError) -> StatusCode {
    match error.code() {
        "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
        "FORBIDDEN" => StatusCode::FORBIDDEN,
        "OWNERSHIP_ERROR" | "CONFLICT" => StatusCode::CONFLICT,
        "INSUFFICIENT_FUNDS" => StatusCode::PAYMENT_REQUIRED,
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::Casino(e) => write!(f, "[{}] {}: {}", self.request_id, e.code(), e),
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::Unauthorized(msg) => write!(f, "[{}] Unauthorized: {}", self.request_id, msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.kind {
            ApiErrorKind::Casino(e) => {
                let status = status_for(e);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(request_id = %self.request_id, error = %e, "request failed");
                }
                (status, e.code(), e.to_string())
            }
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiErrorKind::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: code.to_string(),
                message,
                details: None,
            },
        });

        (status, body).into_response()
    }
}
