//! Shared primitives for all Rust crates in Obratrack.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Obratrack crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
///
/// Authorization and credential failures carry their own variants so route
/// handlers can map them to transport responses without string matching.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No credential was presented where one is required.
    #[error("missing credential")]
    MissingCredential,

    /// Presented credential failed verification or has expired.
    #[error("invalid or expired credential")]
    InvalidCredential,

    /// Credential is valid but the subject no longer exists or is disabled.
    #[error("unknown or inactive subject")]
    UnknownOrInactiveSubject,

    /// Mutating action denied because the actor's sector does not cover the
    /// resource sector.
    #[error("sector mismatch: {0}")]
    SectorMismatch(String),

    /// Default-deny fallthrough: the role holds no grant for the action.
    #[error("no permission: {0}")]
    NoPermission(String),

    /// Progress value outside the valid percentage range.
    #[error("invalid progress: {0}")]
    InvalidProgress(String),

    /// Deletion blocked by progress, history, or role eligibility rules.
    #[error("resource not deletable: {0}")]
    NonDeletableResource(String),

    /// Audit persistence failed after the business mutation succeeded.
    /// Never surfaced to the end user; logged for operator follow-up.
    #[error("audit write failed: {0}")]
    AuditWriteFailed(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true for the credential failures that callers must collapse
    /// into one generic unauthorized response.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::InvalidCredential | Self::UnknownOrInactiveSubject
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn non_empty_string_keeps_value() {
        let result = NonEmptyString::new("torre-3");
        assert_eq!(result.map(String::from).ok(), Some("torre-3".to_owned()));
    }

    #[test]
    fn credential_failures_are_grouped() {
        assert!(AppError::MissingCredential.is_credential_failure());
        assert!(AppError::InvalidCredential.is_credential_failure());
        assert!(AppError::UnknownOrInactiveSubject.is_credential_failure());
        assert!(!AppError::NoPermission("x".to_owned()).is_credential_failure());
    }
}
