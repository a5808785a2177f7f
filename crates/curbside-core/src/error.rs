// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Curbside arrival coordinator.
//!
//! Every client-facing failure is a typed variant that leaves persisted state
//! untouched. Infrastructure failures (storage, collaborator dispatch) carry
//! their source for logging but are reported to clients as internal errors.

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Broad taxonomy of an error, used to choose a client-facing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Expired,
    OutOfRange,
    RateLimited,
    AlreadyProcessed,
    Dispatch,
    Timeout,
    Internal,
}

/// Why a request conflicted with the current state of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictKind {
    /// The session changed between read and compare-and-swap write.
    StaleState,
    /// The actor already has a non-terminal session for this destination.
    DuplicateActiveSession,
    /// An idempotency key was replayed with a different request.
    IdempotencyKeyReused,
    /// The session is not in a state that accepts this request.
    WrongState,
}

/// Which deadline elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExpiredKind {
    LinkingCode,
    Session,
    RedemptionCode,
}

/// Entity named by a not-found error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Session,
    Destination,
    Order,
    RedemptionCode,
}

/// The primary error type used across all Curbside traits and operations.
#[derive(Debug, Error)]
pub enum CurbsideError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed client input.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The request conflicts with current state (stale CAS, duplicate session, ...).
    #[error("conflict ({kind}): {message}")]
    Conflict { kind: ConflictKind, message: String },

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// A linking code that does not exist, or was already consumed.
    ///
    /// Clients cannot tell the two cases apart.
    #[error("invalid or already used linking code")]
    InvalidLinkingCode,

    /// A time-to-live elapsed.
    #[error("{}", expired_message(*what))]
    Expired { what: ExpiredKind },

    /// A coordinate outside the valid WGS84 domain.
    #[error("position out of range: {message}")]
    OutOfRange { message: String },

    /// An attempt bound was exceeded.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// The request was already applied; nothing was reprocessed.
    #[error("already processed: {message}")]
    AlreadyProcessed { message: String },

    /// Persistence backend errors (connection, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Downstream collaborator dispatch failed.
    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        retryable: bool,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn expired_message(what: ExpiredKind) -> &'static str {
    match what {
        ExpiredKind::LinkingCode => "linking code expired; request a new code",
        ExpiredKind::Session => "session expired; start a new session",
        ExpiredKind::RedemptionCode => "redemption code expired",
    }
}

impl CurbsideError {
    /// Shorthand for a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a conflict error.
    pub fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the taxonomy tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } | Self::InvalidLinkingCode => ErrorKind::NotFound,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::AlreadyProcessed { .. } => ErrorKind::AlreadyProcessed,
            Self::Dispatch { .. } => ErrorKind::Dispatch,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Config(_) | Self::Storage { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Internal | ErrorKind::Dispatch | ErrorKind::Timeout
        )
    }

    /// Whether a collaborator failure may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Dispatch { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Storage { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_linking_code_message_is_actionable() {
        let err = CurbsideError::Expired {
            what: ExpiredKind::LinkingCode,
        };
        assert!(err.to_string().contains("request a new code"));
        assert_eq!(err.kind(), ErrorKind::Expired);
    }

    #[test]
    fn invalid_linking_code_is_not_found_category() {
        let err = CurbsideError::InvalidLinkingCode;
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "invalid or already used linking code");
    }

    #[test]
    fn client_errors_are_distinguished_from_internal() {
        assert!(CurbsideError::validation("latitude", "not a number").is_client_error());
        assert!(
            CurbsideError::conflict(ConflictKind::StaleState, "raced").is_client_error()
        );
        assert!(!CurbsideError::Internal("boom".into()).is_client_error());
        assert!(
            !CurbsideError::Storage {
                source: "disk full".into()
            }
            .is_client_error()
        );
    }

    #[test]
    fn retryability_follows_dispatch_flag() {
        let retry = CurbsideError::Dispatch {
            message: "503".into(),
            retryable: true,
            source: None,
        };
        let fatal = CurbsideError::Dispatch {
            message: "400".into(),
            retryable: false,
            source: None,
        };
        assert!(retry.is_retryable());
        assert!(!fatal.is_retryable());
        assert!(!CurbsideError::InvalidLinkingCode.is_retryable());
    }

    #[test]
    fn kind_tags_are_snake_case() {
        let tag: &'static str = ErrorKind::AlreadyProcessed.into();
        assert_eq!(tag, "already_processed");
        assert_eq!(ErrorKind::OutOfRange.to_string(), "out_of_range");
    }
}
