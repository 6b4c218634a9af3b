//! URL composition helpers.

use std::collections::BTreeMap;

use url::{Url, form_urlencoded};

use crate::http::RestCallerError;

/// Replaces the query string of `url` with `parameters`.
///
/// Values are form-encoded; keys are used as given. Parameters without a
/// value are left out. When every value is missing the URL is returned
/// unchanged.
pub fn compose_url(
    url: &Url,
    parameters: &BTreeMap<String, Option<String>>,
) -> Result<Url, RestCallerError> {
    if parameters.is_empty() {
        return Err(RestCallerError::InvalidArgument(
            "parameters must not be empty".to_string(),
        ));
    }

    let query = parameters
        .iter()
        .filter_map(|(key, value)| {
            value.as_ref().map(|value| {
                let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("{}={}", key, encoded)
            })
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut composed = url.clone();
    if !query.is_empty() {
        composed.set_query(Some(&query));
    }
    Ok(composed)
}

/// Appends a relative path to `base`, keeping exactly one `/` between them
/// and ending the result with `/`.
pub fn add_path(base: &Url, relative: &str) -> Result<Url, RestCallerError> {
    if relative.trim().is_empty() {
        return Err(RestCallerError::InvalidArgument(
            "relative path must not be blank".to_string(),
        ));
    }

    let mut relative = relative.to_string();
    if !relative.ends_with('/') {
        relative.push('/');
    }
    if relative.starts_with('/') && relative.len() != 1 {
        relative.remove(0);
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(&relative).map_err(|e| {
        RestCallerError::InvalidArgument(format!("cannot join '{}' onto {}: {}", relative, base, e))
    })
}
