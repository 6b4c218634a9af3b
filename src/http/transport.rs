//! Transport seam between the retry engine and the HTTP client.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use url::Url;

use super::error::AttemptError;
use super::retry::FailureStatus;

/// A fully prepared request for one attempt.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// A response with its body already read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// A failed attempt, with the server's response when there was one.
#[derive(Debug)]
pub struct TransportFailure {
    pub error: AttemptError,
    pub response: Option<TransportResponse>,
}

impl TransportFailure {
    /// A failure with no response.
    pub fn new(error: AttemptError) -> Self {
        Self {
            error,
            response: None,
        }
    }

    /// A failure that came with a response.
    pub fn with_response(error: AttemptError, response: TransportResponse) -> Self {
        Self {
            error,
            response: Some(response),
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(error: reqwest::Error) -> Self {
        let status = classify_reqwest_error(&error);
        let message = error_chain_message(&error);
        debug!("Transport error classified as {}: {}", status, message);
        TransportFailure::new(AttemptError::new(status, message).with_source(error))
    }
}

/// Sends prepared requests without blocking the caller's thread.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportFailure>;
}

/// Transport backed by an async reqwest [`Client`].
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client. Response decompression follows the client's
    /// settings; `Client::new()` decompresses gzip.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        finish(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Turns a non-success status into a failure that still carries the response.
pub(crate) fn finish(response: TransportResponse) -> Result<TransportResponse, TransportFailure> {
    if response.status.is_success() {
        return Ok(response);
    }

    let error = AttemptError::new(
        FailureStatus::ProtocolError,
        format!(
            "The remote server returned an error: ({}) {}",
            response.status.as_u16(),
            response.status.canonical_reason().unwrap_or("Unknown")
        ),
    )
    .with_status_code(response.status);
    Err(TransportFailure::with_response(error, response))
}

/// Maps a reqwest error onto the failure taxonomy used for retry decisions.
pub fn classify_reqwest_error(error: &reqwest::Error) -> FailureStatus {
    if error.is_timeout() {
        return FailureStatus::Timeout;
    }

    let chain = error_chain_message(error).to_lowercase();

    if error.is_connect() {
        if chain.contains("dns error") || chain.contains("failed to lookup address") {
            return FailureStatus::NameResolutionFailure;
        }
        if chain.contains("certificate") {
            return FailureStatus::TrustFailure;
        }
        if chain.contains("tls") || chain.contains("handshake") {
            return FailureStatus::SecureChannelFailure;
        }
        return FailureStatus::ConnectFailure;
    }

    if error.is_redirect() {
        return FailureStatus::ProtocolError;
    }
    if error.is_builder() {
        return FailureStatus::UnknownError;
    }
    if connection_was_closed(error) || chain.contains("connection closed") {
        return FailureStatus::ConnectionClosed;
    }
    if error.is_request() {
        return FailureStatus::SendFailure;
    }
    if error.is_body() || error.is_decode() {
        return FailureStatus::ReceiveFailure;
    }

    FailureStatus::UnknownError
}

/// The error's message followed by each of its sources, `: `-separated.
fn error_chain_message(error: &(dyn StdError + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        text.push_str(": ");
        text.push_str(&err.to_string());
        source = err.source();
    }
    text
}

fn connection_was_closed(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
