//! Request descriptor for a single REST call.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use url::Url;

use super::error::RestCallerError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const DEFAULT_ACCEPT: &str = "application/json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Everything needed to make one call, including its retry budget.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub(crate) url: Url,
    pub(crate) method: String,
    pub(crate) parameters: Option<BTreeMap<String, Option<String>>>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<String>,
    pub(crate) content_type: String,
    pub(crate) accept: String,
    pub(crate) timeout: Duration,
    pub(crate) compress_body: bool,
    pub(crate) max_attempts: u32,
}

impl RestRequest {
    /// A request with default headers, timeout and a single attempt.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            url,
            method: method.into(),
            parameters: None,
            headers: Vec::new(),
            body: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            compress_body: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// A GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A POST request carrying `body`.
    pub fn post(url: Url, body: impl Into<String>) -> Self {
        Self::new("POST", url).body(body)
    }

    /// A PUT request carrying `body`.
    pub fn put(url: Url, body: impl Into<String>) -> Self {
        Self::new("PUT", url).body(body)
    }

    /// A DELETE request.
    pub fn delete(url: Url) -> Self {
        Self::new("DELETE", url)
    }

    /// Adds a query parameter. A `None` value is kept in the set but never
    /// sent; a later value for the same key replaces the earlier one.
    pub fn parameter(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.map(Into::into));
        self
    }

    /// Replaces the whole parameter set.
    pub fn parameters(mut self, parameters: BTreeMap<String, Option<String>>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Adds an extra header. Repeating a name sends it more than once.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request body, sent as UTF-8. A blank body is not sent.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Content-Type header value.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Accept header value.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Timeout for each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gzip the body before sending it.
    pub fn compress_body(mut self, compress: bool) -> Self {
        self.compress_body = compress;
        self
    }

    /// Total number of attempts, the first one included.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Base URL, before parameters are composed into it.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP method as given.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Checks the request before anything goes over the wire and returns the
    /// parsed method.
    pub(crate) fn validate(&self) -> Result<Method, RestCallerError> {
        if self.method.trim().is_empty() {
            return Err(invalid("method must not be blank"));
        }
        if self.content_type.trim().is_empty() {
            return Err(invalid("content type must not be blank"));
        }
        if self.accept.trim().is_empty() {
            return Err(invalid("accept must not be blank"));
        }
        if self.max_attempts < 1 {
            return Err(invalid("max_attempts must be at least 1"));
        }

        Method::from_bytes(self.method.trim().as_bytes())
            .map_err(|_| invalid(&format!("'{}' is not a valid HTTP method", self.method)))
    }
}

fn invalid(msg: &str) -> RestCallerError {
    RestCallerError::InvalidArgument(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/api").unwrap()
    }

    #[test]
    fn test_defaults() {
        let request = RestRequest::get(url());
        assert_eq!(request.method(), "GET");
        assert_eq!(request.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(request.accept, DEFAULT_ACCEPT);
        assert_eq!(request.timeout, Duration::from_secs(60));
        assert_eq!(request.max_attempts, 1);
        assert!(!request.compress_body);
        assert!(request.parameters.is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn test_verb_constructors() {
        assert_eq!(RestRequest::delete(url()).method(), "DELETE");

        let post = RestRequest::post(url(), "{}");
        assert_eq!(post.method(), "POST");
        assert_eq!(post.body.as_deref(), Some("{}"));

        let put = RestRequest::put(url(), "{}");
        assert_eq!(put.method(), "PUT");
    }

    #[test]
    fn test_parameter_keys_are_unique() {
        let request = RestRequest::get(url())
            .parameter("a", Some("1"))
            .parameter("a", Some("2"))
            .parameter("b", None::<String>);

        let parameters = request.parameters.unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters["a"].as_deref(), Some("2"));
        assert_eq!(parameters["b"], None);
    }

    #[test]
    fn test_headers_are_additive() {
        let request = RestRequest::get(url())
            .header("X-Trace", "1")
            .header("X-Trace", "2");
        assert_eq!(request.headers.len(), 2);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let method = RestRequest::get(url()).validate().unwrap();
        assert_eq!(method, Method::GET);
    }

    #[test]
    fn test_validate_rejects_blank_method() {
        let err = RestRequest::new(" ", url()).validate().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_validate_rejects_invalid_method() {
        let err = RestRequest::new("GE T", url()).validate().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_validate_rejects_blank_content_type() {
        let err = RestRequest::get(url())
            .content_type("")
            .validate()
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_validate_rejects_blank_accept() {
        let err = RestRequest::get(url()).accept("\t").validate().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let err = RestRequest::get(url())
            .max_attempts(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validate_accepts_custom_method() {
        let method = RestRequest::new("PATCH", url()).validate().unwrap();
        assert_eq!(method, Method::PATCH);
    }
}
