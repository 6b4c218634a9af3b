//! Parameterized REST calls over reqwest with optional gzip request bodies
//! and a bounded, linearly backed-off retry loop for transient failures.
//!
//! ```no_run
//! use restcaller::{RestCaller, RestRequest};
//! use url::Url;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let caller = RestCaller::new();
//! let request = RestRequest::get(Url::parse("https://api.nuget.org/v3/index.json")?)
//!     .parameter("semVerLevel", Some("2.0.0"))
//!     .max_attempts(3);
//!
//! let response = caller.make_request(&request).await?;
//! println!("{} {}", response.status(), response.text());
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod http;
pub mod uri;

pub use http::{
    AttemptError, DefaultRetryStrategy, FailureStatus, RestCaller, RestCallerError,
    RestCallerResponse, RestRequest, RetryStrategy,
};
