//! Response returned by a REST call.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;

use super::error::AttemptError;
use super::transport::TransportResponse;

/// Status, headers and body of the response a call ended with, plus the
/// attempts that failed before it.
#[derive(Debug, Clone)]
pub struct RestCallerResponse {
    status: StatusCode,
    content_type: Option<String>,
    text: String,
    headers: HashMap<String, String>,
    attempt_errors: Vec<AttemptError>,
}

impl RestCallerResponse {
    pub(crate) fn new(response: TransportResponse, attempt_errors: Vec<AttemptError>) -> Self {
        let content_type = response
            .headers
            .get(CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        Self {
            status: response.status,
            content_type,
            text: response.body,
            headers: flatten_headers(&response.headers),
            attempt_errors,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Response headers keyed by lower-cased name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Failed attempts that came before this response, oldest first.
    pub fn attempt_errors(&self) -> &[AttemptError] {
        &self.attempt_errors
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.text).with_context(|| {
            format!(
                "Failed to parse JSON response (status {})",
                self.status.as_u16()
            )
        })
    }
}

/// One value per header name; the last one wins.
fn flatten_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut flat = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        flat.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    flat
}
