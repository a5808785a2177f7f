// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`CurbsideError`] onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use curbside_core::{CurbsideError, ErrorKind};
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// A [`CurbsideError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub CurbsideError);

impl From<CurbsideError> for ApiError {
    fn from(err: CurbsideError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CurbsideError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(CurbsideError::validation("query", rejection.body_text()))
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::AlreadyProcessed => StatusCode::CONFLICT,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::OutOfRange => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Dispatch => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        // Infrastructure details stay in the log.
        let error = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            tracing::error!(error = %self.0, kind = %kind, "request failed");
            match kind {
                ErrorKind::Timeout => "upstream timed out".to_string(),
                ErrorKind::Dispatch => "upstream dispatch failed".to_string(),
                _ => "internal error".to_string(),
            }
        };
        let body = ErrorResponse {
            error,
            kind: kind.into(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for gateway handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use curbside_core::{ConflictKind, ExpiredKind};

    use super::*;

    fn status(err: CurbsideError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn client_errors_map_to_distinct_statuses() {
        assert_eq!(status(CurbsideError::validation("code", "empty")), StatusCode::BAD_REQUEST);
        assert_eq!(status(CurbsideError::InvalidLinkingCode), StatusCode::NOT_FOUND);
        assert_eq!(
            status(CurbsideError::conflict(ConflictKind::DuplicateActiveSession, "busy")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CurbsideError::Expired {
                what: ExpiredKind::LinkingCode
            }),
            StatusCode::GONE
        );
        assert_eq!(
            status(CurbsideError::OutOfRange {
                message: "latitude".into()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(CurbsideError::RateLimited {
                message: "too many".into()
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(CurbsideError::AlreadyProcessed {
                message: "redeemed".into()
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn infrastructure_errors_are_opaque() {
        assert_eq!(
            status(CurbsideError::Storage {
                source: "disk full".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(CurbsideError::Timeout {
                duration: std::time::Duration::from_secs(10)
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status(CurbsideError::Dispatch {
                message: "503".into(),
                retryable: true,
                source: None,
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
