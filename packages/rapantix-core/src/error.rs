//! Centralized error types for the Rapantix core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type for session and lookup operations.
///
/// None of these are retried inside the core; retrying (re-polling,
/// re-submitting) is the caller's decision.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// A required field was blank or malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The session code does not address a live session.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The caller is not a member of the session.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The session cannot accept the operation in its current state
    /// (full on join, finished on guess).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An internal invariant does not hold.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type GameResult<T> = Result<T, GameError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
