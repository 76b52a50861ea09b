//! Translation of application errors to HTTP responses.
//!
//! | kind | status | code |
//! |---|---|---|
//! | InvalidArgument | 400 | `INVALID_ARGUMENT` (with details) |
//! | NotFound | 404 | `NOT_FOUND` |
//! | Conflict | 409 | `ALREADY_EXISTS` (with details) |
//! | Internal | 500 | `INTERNAL` |
//! | Unauthenticated | 401 | `UNAUTHENTICATED` |
//! | Forbidden | 403 | `PERMISSION_DENIED` |
//! | Canceled | 499 | `CANCELLED` |
//! | DeadlineExceeded | 504 | `DEADLINE_EXCEEDED` |

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::{AppError, ErrorKind};

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

/// Status and wire code for an error kind.
pub fn status_for(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        ErrorKind::Canceled => (
            StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            "CANCELLED",
        ),
        ErrorKind::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED"),
    }
}

/// Response sent to callers arriving while the service shuts down.
pub fn unavailable() -> Response {
    let body = ErrorBody {
        code: "UNAVAILABLE".to_string(),
        message: "Service is shutting down".to_string(),
        details: BTreeMap::new(),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = status_for(self.kind);

        // Runs inside the request span, so the request id is attached.
        tracing::error!(
            kind = %self.kind,
            error = %self,
            cause = ?self.cause.as_ref().map(ToString::to_string),
            "Request failed"
        );

        let details = match self.kind {
            ErrorKind::InvalidArgument | ErrorKind::Conflict => self.metadata,
            _ => BTreeMap::new(),
        };
        let body = ErrorBody {
            code: code.to_string(),
            message: self.message,
            details,
        };
        (status, Json(body)).into_response()
    }
}
