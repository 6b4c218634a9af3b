//! Request execution and retry engine.

mod client;
mod error;
pub(crate) mod executor;
mod request;
mod response;
mod retry;
pub(crate) mod transport;

pub use client::RestCaller;
pub use error::{AttemptError, CallError, RestCallerError};
pub use request::{
    DEFAULT_ACCEPT, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, RestRequest,
};
pub use response::RestCallerResponse;
pub use retry::{
    DefaultRetryStrategy, FailureStatus, RETRY_BASE_DELAY_MS, RetryStrategy, backoff_delay,
};
pub use transport::{
    OutboundRequest, ReqwestTransport, Transport, TransportFailure, TransportResponse,
    classify_reqwest_error,
};
