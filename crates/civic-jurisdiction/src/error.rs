//! Error types for the jurisdiction engine.
//!
//! Every failure carries a distinguishing [`ErrorKind`] and a human-readable
//! message so the outer layer can surface it without inspecting variants.

use civic_core::{LocationId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a leader already holding a (role, location) seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderSummary {
    /// The existing leader's id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidRole,
    InvalidStatus,
    Conflict,
    Unavailable,
    Validation,
    Internal,
}

/// Errors that can occur while resolving jurisdiction or mutating state.
#[derive(Debug, Clone, Error)]
pub enum JurisdictionError {
    /// No authenticated actor accompanies the call.
    #[error("Unauthorized")]
    Unauthorized,

    /// The actor is authenticated but lacks jurisdiction or delegation rights.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A referenced user, location or ticket does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of resource ("User", "District", "Ticket", ...).
        resource: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// A role value outside the enumerated set, or one not usable here.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// A ticket status value outside the enumerated set.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// A uniqueness invariant would be violated.
    #[error("Conflict: {message}")]
    Conflict {
        /// What collided.
        message: String,
        /// The leader already occupying the seat, for leader conflicts.
        existing_leader: Option<LeaderSummary>,
    },

    /// An advisory external capability (classifier, summarizer) failed.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Malformed input.
    #[error("Validation error on field '{field}': {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// A stored location points at a parent that does not exist or sits at
    /// the wrong level.
    #[error("Location {0} has a broken ancestry")]
    DanglingLocation(LocationId),

    /// A non-administrator user has no anchor village.
    #[error("User {0} has no anchor village")]
    MissingAnchor(UserId),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl JurisdictionError {
    /// Shorthand for [`JurisdictionError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Shorthand for [`JurisdictionError::NotFound`].
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`JurisdictionError::Validation`].
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a conflict that does not involve a leader seat.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            existing_leader: None,
        }
    }

    /// The coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRole(_) => ErrorKind::InvalidRole,
            Self::InvalidStatus(_) => ErrorKind::InvalidStatus,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::DanglingLocation(_) | Self::MissingAnchor(_) | Self::Store(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status code the outer layer should map this error to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidRole | ErrorKind::InvalidStatus | ErrorKind::Validation => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Machine-readable error code for JSON responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRole => "invalid_role",
            ErrorKind::InvalidStatus => "invalid_status",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// The conflicting leader, when this is a leader-seat conflict.
    #[must_use]
    pub fn existing_leader(&self) -> Option<&LeaderSummary> {
        match self {
            Self::Conflict {
                existing_leader, ..
            } => existing_leader.as_ref(),
            _ => None,
        }
    }
}

/// Convenience Result type for the jurisdiction engine.
pub type Result<T> = std::result::Result<T, JurisdictionError>;
