//! Attempt preparation and the retry state machine shared by the async and
//! blocking callers.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, warn};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use super::error::{AttemptError, CallError, RestCallerError};
use super::request::RestRequest;
use super::response::RestCallerResponse;
use super::retry::{RetryStrategy, backoff_delay};
use super::transport::{OutboundRequest, TransportFailure, TransportResponse};
use crate::uri::compose_url;

/// Builds the request for one attempt. The URL is composed from the request's
/// parameters every time, so repeated attempts send the same thing.
pub(crate) fn prepare(request: &RestRequest, method: &Method) -> Result<OutboundRequest> {
    let url = match &request.parameters {
        Some(parameters) if !parameters.is_empty() => compose_url(&request.url, parameters)?,
        _ => request.url.clone(),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&request.content_type).context("Invalid content type")?,
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_str(&request.accept).context("Invalid accept header")?,
    );
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name '{}'", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header '{}'", name))?;
        headers.append(name, value);
    }

    let body = match request.body.as_deref() {
        Some(body) if !body.trim().is_empty() => {
            if request.compress_body {
                headers.append(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                Some(gzip(body)?)
            } else {
                Some(body.as_bytes().to_vec())
            }
        }
        _ => None,
    };

    Ok(OutboundRequest {
        method: method.clone(),
        url,
        headers,
        body,
        timeout: request.timeout,
    })
}

fn gzip(body: &str) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body.as_bytes())
        .context("Failed to compress request body")?;
    encoder.finish().context("Failed to compress request body")
}

/// What the caller should do after a failed attempt.
#[derive(Debug)]
pub(crate) enum Next {
    /// Wait, then attempt again.
    Retry(Duration),
    /// Stop and hand this response back.
    Respond(RestCallerResponse),
    /// Stop with an error.
    Fail(RestCallerError),
}

/// Attempt history of one call and the decisions made from it.
pub(crate) struct CallState<'a> {
    strategy: &'a dyn RetryStrategy,
    max_attempts: u32,
    attempt_errors: Vec<AttemptError>,
}

impl<'a> CallState<'a> {
    pub(crate) fn new(strategy: &'a dyn RetryStrategy, max_attempts: u32) -> Self {
        Self {
            strategy,
            max_attempts,
            attempt_errors: Vec::new(),
        }
    }

    pub(crate) fn succeeded(&mut self, response: TransportResponse) -> RestCallerResponse {
        RestCallerResponse::new(response, std::mem::take(&mut self.attempt_errors))
    }

    pub(crate) fn failed(&mut self, failure: TransportFailure) -> Next {
        let TransportFailure { error, response } = failure;
        let transient = self.strategy.is_transient(&error);
        self.attempt_errors.push(error.clone());

        let attempts = self.attempt_errors.len() as u32;
        if attempts < self.max_attempts && transient {
            let delay = backoff_delay(attempts);
            warn!(
                "Attempt {}/{} failed ({}), retrying in {}ms...",
                attempts,
                self.max_attempts,
                error,
                delay.as_millis()
            );
            return Next::Retry(delay);
        }

        match response {
            Some(response) => {
                debug!(
                    "Attempt {}/{} returned status {}",
                    attempts, self.max_attempts, response.status
                );
                Next::Respond(self.succeeded(response))
            }
            None => {
                debug!(
                    "Giving up after {} attempt(s): {}",
                    attempts, error
                );
                Next::Fail(self.abort(anyhow::Error::new(error)))
            }
        }
    }

    /// Ends the call with `cause`, handing over the history collected so far.
    pub(crate) fn abort(&mut self, cause: anyhow::Error) -> RestCallerError {
        CallError::new(cause, std::mem::take(&mut self.attempt_errors)).into()
    }
}
