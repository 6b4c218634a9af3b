//! Blocking REST caller.
//!
//! Same retry semantics as [`crate::http::RestCaller`], but every wait blocks
//! the calling thread. Do not use it from inside an async runtime; wrap the
//! call in `tokio::task::spawn_blocking` instead.

use std::sync::Arc;
use std::thread;

use log::debug;
use reqwest::blocking::Client;
use url::Url;

use crate::http::executor::{CallState, Next, prepare};
use crate::http::transport::{OutboundRequest, TransportFailure, TransportResponse, finish};
use crate::http::{DefaultRetryStrategy, RestCallerError, RestCallerResponse, RestRequest, RetryStrategy};

/// Sends prepared requests, blocking until the response body is read.
#[cfg_attr(test, mockall::automock)]
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportFailure>;
}

/// Transport backed by a blocking reqwest [`Client`].
#[derive(Clone)]
pub struct BlockingReqwestTransport {
    client: Client,
}

impl BlockingReqwestTransport {
    /// Wraps an existing blocking client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

impl Default for BlockingReqwestTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl BlockingTransport for BlockingReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text()?;

        finish(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Blocking variant of [`crate::http::RestCaller`].
#[derive(Clone)]
pub struct RestCaller {
    transport: Arc<dyn BlockingTransport>,
    strategy: Arc<dyn RetryStrategy>,
}

impl RestCaller {
    /// A caller using a default blocking client and [`DefaultRetryStrategy`].
    pub fn new() -> Self {
        Self::with_transport(BlockingReqwestTransport::default(), DefaultRetryStrategy)
    }

    /// A caller using a default blocking client and a custom retry strategy.
    pub fn with_strategy(strategy: impl RetryStrategy + 'static) -> Self {
        Self::with_transport(BlockingReqwestTransport::default(), strategy)
    }

    /// A caller sending through `transport`.
    pub fn with_transport(
        transport: impl BlockingTransport + 'static,
        strategy: impl RetryStrategy + 'static,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            strategy: Arc::new(strategy),
        }
    }

    /// Makes the call described by `request`, blocking until it is done.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub fn make_request(
        &self,
        request: &RestRequest,
    ) -> Result<RestCallerResponse, RestCallerError> {
        let method = request.validate()?;
        let mut state = CallState::new(&*self.strategy, request.max_attempts);

        loop {
            let outbound = match prepare(request, &method) {
                Ok(outbound) => outbound,
                Err(e) => return Err(state.abort(e)),
            };

            debug!("{} {}...", outbound.method, outbound.url);

            match self.transport.send(outbound) {
                Ok(response) => return Ok(state.succeeded(response)),
                Err(failure) => match state.failed(failure) {
                    Next::Retry(delay) => thread::sleep(delay),
                    Next::Respond(response) => return Ok(response),
                    Next::Fail(err) => return Err(err),
                },
            }
        }
    }

    /// GET `url` with default settings.
    pub fn get(&self, url: Url) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::get(url))
    }

    /// POST `body` to `url` with default settings.
    pub fn post(
        &self,
        url: Url,
        body: impl Into<String>,
    ) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::post(url, body))
    }

    /// PUT `body` to `url` with default settings.
    pub fn put(
        &self,
        url: Url,
        body: impl Into<String>,
    ) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::put(url, body))
    }

    /// DELETE `url` with default settings.
    pub fn delete(&self, url: Url) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::delete(url))
    }
}

impl Default for RestCaller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{AttemptError, FailureStatus};
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use std::time::{Duration, Instant};

    fn request() -> RestRequest {
        RestRequest::get(Url::parse("https://example.com/api").unwrap())
    }

    fn timeout() -> TransportFailure {
        TransportFailure::new(AttemptError::new(
            FailureStatus::Timeout,
            "The operation has timed out",
        ))
    }

    #[test]
    fn test_transient_failures_then_success() {
        let mut transport = MockBlockingTransport::new();
        let mut calls = 0;
        transport.expect_send().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(timeout())
            } else {
                Ok(TransportResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body: "ok".to_string(),
                })
            }
        });

        let caller = RestCaller::with_transport(transport, DefaultRetryStrategy);
        let start = Instant::now();
        let response = caller.make_request(&request().max_attempts(3)).unwrap();

        assert_eq!(response.text(), "ok");
        assert_eq!(response.attempt_errors().len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_exhausted_transient_failures() {
        let mut transport = MockBlockingTransport::new();
        transport.expect_send().times(3).returning(|_| Err(timeout()));

        let caller = RestCaller::with_transport(transport, DefaultRetryStrategy);
        let err = caller.make_request(&request().max_attempts(3)).unwrap_err();

        assert!(matches!(err, RestCallerError::Call(_)));
        assert_eq!(err.attempt_errors().len(), 3);
    }

    #[test]
    fn test_invalid_request_makes_no_attempt() {
        let transport = MockBlockingTransport::new();
        let caller = RestCaller::with_transport(transport, DefaultRetryStrategy);

        let err = caller.make_request(&request().accept(" ")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_get_over_http() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version": "3.0.0"}"#)
            .create();

        let caller = RestCaller::new();
        let response = caller
            .get(Url::parse(&format!("{}/v3/index.json", server.url())).unwrap())
            .unwrap();

        mock.assert();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("application/json"));
        assert!(response.attempt_errors().is_empty());
        assert!(response.header("Content-Type").is_some());
    }

    #[test]
    fn test_not_found_is_a_response() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v3/does_not_exist.json")
            .with_status(404)
            .with_body("not here")
            .expect(1)
            .create();

        let caller = RestCaller::new();
        let request = RestRequest::get(
            Url::parse(&format!("{}/v3/does_not_exist.json", server.url())).unwrap(),
        )
        .max_attempts(3);
        let response = caller.make_request(&request).unwrap();

        mock.assert();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "not here");
        assert_eq!(response.attempt_errors().len(), 1);
    }

    #[test]
    fn test_post_compressed_body_over_http() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/events")
            .match_header("content-encoding", "gzip")
            .with_status(200)
            .with_body_from_request(|request| {
                use std::io::Read;
                let mut decoded = Vec::new();
                flate2::read::GzDecoder::new(&request.body().unwrap()[..])
                    .read_to_end(&mut decoded)
                    .unwrap();
                decoded
            })
            .create();

        let caller = RestCaller::new();
        let request = RestRequest::post(
            Url::parse(&format!("{}/events", server.url())).unwrap(),
            "event payload",
        )
        .compress_body(true);
        let response = caller.make_request(&request).unwrap();

        mock.assert();
        assert_eq!(response.text(), "event payload");
    }
}
