//! Errors produced by REST calls.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use reqwest::StatusCode;

use super::retry::FailureStatus;

/// One failed attempt of a call.
#[derive(Debug, Clone)]
pub struct AttemptError {
    status: FailureStatus,
    message: String,
    status_code: Option<StatusCode>,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl AttemptError {
    /// A failure of the given kind.
    pub fn new(status: FailureStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    /// Records the HTTP status of the response that came with this failure.
    pub fn with_status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Keeps the underlying error as this failure's source.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// What kind of failure this was.
    pub fn status(&self) -> FailureStatus {
        self.status
    }

    /// Human-readable description, including the root cause when known.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response, when the server answered.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status_code
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl StdError for AttemptError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

/// A call that produced no usable response.
#[derive(Debug)]
pub struct CallError {
    cause: anyhow::Error,
    attempt_errors: Vec<AttemptError>,
}

impl CallError {
    pub(crate) fn new(cause: anyhow::Error, attempt_errors: Vec<AttemptError>) -> Self {
        Self {
            cause,
            attempt_errors,
        }
    }

    /// The error that ended the call.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Every failed attempt, oldest first.
    pub fn attempt_errors(&self) -> &[AttemptError] {
        &self.attempt_errors
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("REST caller error")
    }
}

impl StdError for CallError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.cause)
    }
}

/// Everything a call can fail with.
#[derive(Debug)]
pub enum RestCallerError {
    /// The request was rejected before anything was sent.
    InvalidArgument(String),
    /// No attempt produced a response.
    Call(CallError),
}

impl RestCallerError {
    /// Failed attempts behind this error; empty for invalid arguments.
    pub fn attempt_errors(&self) -> &[AttemptError] {
        match self {
            RestCallerError::InvalidArgument(_) => &[],
            RestCallerError::Call(error) => error.attempt_errors(),
        }
    }

    /// Whether the request was rejected before any attempt.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RestCallerError::InvalidArgument(_))
    }
}

impl fmt::Display for RestCallerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestCallerError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RestCallerError::Call(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl StdError for RestCallerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RestCallerError::InvalidArgument(_) => None,
            RestCallerError::Call(error) => error.source(),
        }
    }
}

impl From<CallError> for RestCallerError {
    fn from(error: CallError) -> Self {
        RestCallerError::Call(error)
    }
}
