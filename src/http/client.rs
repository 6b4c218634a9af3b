//! Async REST caller with bounded retries.

use std::sync::Arc;

use log::debug;
use url::Url;

use super::error::RestCallerError;
use super::executor::{CallState, Next, prepare};
use super::request::RestRequest;
use super::response::RestCallerResponse;
use super::retry::{DefaultRetryStrategy, RetryStrategy};
use super::transport::{ReqwestTransport, Transport};

/// Makes REST calls, retrying transient failures.
///
/// Cheap to clone; clones share the transport and the retry strategy.
#[derive(Clone)]
pub struct RestCaller {
    transport: Arc<dyn Transport>,
    strategy: Arc<dyn RetryStrategy>,
}

impl RestCaller {
    /// A caller using a default reqwest client and [`DefaultRetryStrategy`].
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::default(), DefaultRetryStrategy)
    }

    /// A caller using a default reqwest client and a custom retry strategy.
    pub fn with_strategy(strategy: impl RetryStrategy + 'static) -> Self {
        Self::with_transport(ReqwestTransport::default(), strategy)
    }

    /// A caller sending through `transport`.
    pub fn with_transport(
        transport: impl Transport + 'static,
        strategy: impl RetryStrategy + 'static,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            strategy: Arc::new(strategy),
        }
    }

    /// Makes the call described by `request`.
    ///
    /// A response is returned whenever the server answered, whatever its
    /// status code. An error means no attempt produced a response, or the
    /// request was invalid.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn make_request(
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

            match self.transport.send(outbound).await {
                Ok(response) => return Ok(state.succeeded(response)),
                Err(failure) => match state.failed(failure) {
                    Next::Retry(delay) => tokio::time::sleep(delay).await,
                    Next::Respond(response) => return Ok(response),
                    Next::Fail(err) => return Err(err),
                },
            }
        }
    }

    /// GET `url` with default settings.
    pub async fn get(&self, url: Url) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::get(url)).await
    }

    /// POST `body` to `url` with default settings.
    pub async fn post(
        &self,
        url: Url,
        body: impl Into<String>,
    ) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::post(url, body)).await
    }

    /// PUT `body` to `url` with default settings.
    pub async fn put(
        &self,
        url: Url,
        body: impl Into<String>,
    ) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::put(url, body)).await
    }

    /// DELETE `url` with default settings.
    pub async fn delete(&self, url: Url) -> Result<RestCallerResponse, RestCallerError> {
        self.make_request(&RestRequest::delete(url)).await
    }
}

impl Default for RestCaller {
    fn default() -> Self {
        Self::new()
    }
}
