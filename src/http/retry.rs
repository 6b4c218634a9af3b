//! Retry classification and backoff for REST calls.

use std::fmt;
use std::time::Duration;

use super::error::AttemptError;

/// Base delay for the linear backoff between attempts, in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 100;

/// Delay to wait after `failed_attempts` failures before trying again.
pub fn backoff_delay(failed_attempts: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS * u64::from(failed_attempts))
}

/// Why a single attempt failed at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStatus {
    Success,
    NameResolutionFailure,
    ConnectFailure,
    ReceiveFailure,
    SendFailure,
    PipelineFailure,
    RequestCanceled,
    /// The server answered, but with a non-success status code.
    ProtocolError,
    ConnectionClosed,
    TrustFailure,
    SecureChannelFailure,
    ServerProtocolViolation,
    KeepAliveFailure,
    Pending,
    Timeout,
    ProxyNameResolutionFailure,
    UnknownError,
    MessageLengthLimitExceeded,
    CacheEntryNotFound,
    RequestProhibitedByCachePolicy,
    RequestProhibitedByProxy,
}

impl fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStatus::Success => "success",
            FailureStatus::NameResolutionFailure => "name resolution failure",
            FailureStatus::ConnectFailure => "connect failure",
            FailureStatus::ReceiveFailure => "receive failure",
            FailureStatus::SendFailure => "send failure",
            FailureStatus::PipelineFailure => "pipeline failure",
            FailureStatus::RequestCanceled => "request canceled",
            FailureStatus::ProtocolError => "protocol error",
            FailureStatus::ConnectionClosed => "connection closed",
            FailureStatus::TrustFailure => "trust failure",
            FailureStatus::SecureChannelFailure => "secure channel failure",
            FailureStatus::ServerProtocolViolation => "server protocol violation",
            FailureStatus::KeepAliveFailure => "keep-alive failure",
            FailureStatus::Pending => "pending",
            FailureStatus::Timeout => "timeout",
            FailureStatus::ProxyNameResolutionFailure => "proxy name resolution failure",
            FailureStatus::UnknownError => "unknown error",
            FailureStatus::MessageLengthLimitExceeded => "message length limit exceeded",
            FailureStatus::CacheEntryNotFound => "cache entry not found",
            FailureStatus::RequestProhibitedByCachePolicy => "request prohibited by cache policy",
            FailureStatus::RequestProhibitedByProxy => "request prohibited by proxy",
        };
        f.write_str(name)
    }
}

/// Decides whether a failed attempt is worth repeating.
///
/// Any `Fn(&AttemptError) -> bool` closure is also a strategy, so callers can
/// swap the policy without defining a type.
pub trait RetryStrategy: Send + Sync {
    fn is_transient(&self, error: &AttemptError) -> bool;
}

impl<F> RetryStrategy for F
where
    F: Fn(&AttemptError) -> bool + Send + Sync,
{
    fn is_transient(&self, error: &AttemptError) -> bool {
        self(error)
    }
}

/// Retries only network-level failures that usually clear up on their own.
///
/// Anything outside the allow-list fails fast, including causes this crate
/// does not know about.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetryStrategy;

const TRANSIENT_STATUSES: [FailureStatus; 7] = [
    FailureStatus::ConnectFailure,
    FailureStatus::ConnectionClosed,
    FailureStatus::NameResolutionFailure,
    FailureStatus::PipelineFailure,
    FailureStatus::ReceiveFailure,
    FailureStatus::SendFailure,
    FailureStatus::Timeout,
];

impl RetryStrategy for DefaultRetryStrategy {
    fn is_transient(&self, error: &AttemptError) -> bool {
        TRANSIENT_STATUSES.contains(&error.status())
    }
}
