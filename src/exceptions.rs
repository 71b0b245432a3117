use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PagesError {
    /// Process exit status reported to whatever triggered the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            PagesError::Fetch(_) => 2,
            PagesError::Validation(_) | PagesError::Merge(_) => 3,
            PagesError::Publish(_) => 4,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Unavailable,
    Partial,
    Malformed,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Unavailable => write!(f, "unavailable"),
            FetchErrorKind::Partial => write!(f, "partial"),
            FetchErrorKind::Malformed => write!(f, "malformed"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Rate fetch failed ({kind}): {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Partial,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Malformed,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Observation for {date} has no rates")]
    EmptyRates { date: NaiveDate },

    #[error("Rate for {currency} on {date} must be strictly positive, got {rate}")]
    NonPositiveRate {
        date: NaiveDate,
        currency: String,
        rate: f64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("Update aborted, fetched observation failed validation: {0}")]
    AbortedDueToValidation(#[source] ValidationError),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to write {file}: {source} (previous artifacts restored: {rolled_back})")]
    PartialWrite {
        file: String,
        #[source]
        source: std::io::Error,
        rolled_back: bool,
    },

    #[error(
        "Another update is in progress: {} is held by {holder}. If that process is gone, delete the file and re-run.",
        .path.display()
    )]
    LockUnavailable { path: PathBuf, holder: String },

    #[error("Store has no observations to publish")]
    EmptyStore,

    #[error("IO error while staging artifacts: {0}")]
    Io(#[from] std::io::Error),
}
