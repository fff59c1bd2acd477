use std::borrow::Cow;

use thiserror::Error;

/// Failure reported by a backend collaborator (document store, object storage).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An update targeted a document that does not exist.
    #[error("no document at {path}")]
    Missing { path: String },

    /// The collaborator refused or could not serve the request.
    #[error("backend unavailable: {message}")]
    Unavailable { message: Cow<'static, str> },
}

impl StoreError {
    pub fn unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Returned by every write path when no viewer is signed in.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no authenticated viewer")]
pub struct NotAuthenticated;

/// Top-level error type returned by immerse services and feed components.
#[derive(Debug, Error)]
pub enum ImmerseError {
    /// A backend read failed; prior state is left intact.
    #[error("failed to fetch {what}: {source}")]
    RemoteFetch {
        what: Cow<'static, str>,
        #[source]
        source: StoreError,
    },

    /// A backend write failed; optimistic local state has been rolled back.
    #[error("failed to write {what}: {source}")]
    RemoteWrite {
        what: Cow<'static, str>,
        #[source]
        source: StoreError,
    },

    /// Input rejected before any remote call was made.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Media could not be prepared for playback.
    #[error("media resource error: {message}")]
    Resource { message: Cow<'static, str> },

    #[error(transparent)]
    NotAuthenticated(#[from] NotAuthenticated),

    /// Target document does not exist (or is not in the local feed).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The viewer may not perform this action on the target.
    #[error("not permitted: {message}")]
    NotPermitted { message: Cow<'static, str> },

    /// The authentication provider rejected the request.
    #[error("authentication failed: {message}")]
    Auth { message: Cow<'static, str> },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: Cow<'static, str> },

    /// An annotation task panicked or was cancelled.
    #[error("background task failed: {message}")]
    Task { message: Cow<'static, str> },
}

impl ImmerseError {
    pub fn fetch(what: impl Into<Cow<'static, str>>, source: StoreError) -> Self {
        Self::RemoteFetch {
            what: what.into(),
            source,
        }
    }

    pub fn write(what: impl Into<Cow<'static, str>>, source: StoreError) -> Self {
        Self::RemoteWrite {
            what: what.into(),
            source,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// True when the error came from a backend write and local state was reverted.
    pub fn is_remote_write(&self) -> bool {
        matches!(self, Self::RemoteWrite { .. })
    }
}

/// Collection of validation issues encountered while preparing a request.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = ImmerseError> = std::result::Result<T, E>;
