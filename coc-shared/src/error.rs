//! Crate-wide error taxonomy.
//!
//! A single enum covers every failure mode the core surfaces: validation,
//! not-found, conflict, capacity, and internal. Each variant maps to both an
//! HTTP status (for the transport layer) and a process exit code (for the
//! CLI wrapper), so the mapping lives in one place instead of being
//! reimplemented per handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CocError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Capacity(String),

    #[error("{0}")]
    Internal(String),
}

impl CocError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Capacity(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// CLI process exit code per the wire contract (0 success is handled by callers).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Capacity(_) | Self::NotFound(_) | Self::Conflict(_) => 2,
            Self::Internal(_) => 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CocError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }
        let status = self.http_status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type CocResult<T> = Result<T, CocError>;
