use anyhow::{Context, Result};
use clap::Parser;
use restcaller::http::{DEFAULT_ACCEPT, DEFAULT_CONTENT_TYPE};
use restcaller::{RestCaller, RestCallerResponse, RestRequest, blocking};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// restcall - make a REST call with retries
///
/// Prints the response body. A non-success status code is still a response;
/// the command only fails when no response could be obtained.
///
/// Examples:
///   restcall GET https://api.nuget.org/v3/index.json
///   restcall POST https://example.com/items -d '{"name":"x"}' --compress
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// HTTP method (GET, POST, PUT, DELETE, ...)
    #[arg(value_name = "METHOD")]
    method: String,

    /// Target URL
    #[arg(value_name = "URL")]
    url: Url,

    /// Query parameter; a bare KEY is ignored (may be repeated)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_parameter)]
    params: Vec<(String, Option<String>)>,

    /// Extra request header (may be repeated)
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body
    #[arg(short = 'd', long = "data", value_name = "BODY")]
    body: Option<String>,

    /// Content-Type header
    #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
    content_type: String,

    /// Accept header
    #[arg(long, default_value = DEFAULT_ACCEPT)]
    accept: String,

    /// Per-attempt timeout in seconds
    #[arg(long, env = "RESTCALL_TIMEOUT", value_name = "SECS", default_value_t = 60)]
    timeout: u64,

    /// Total number of attempts for transient failures
    #[arg(long, env = "RESTCALL_MAX_ATTEMPTS", value_name = "N", default_value_t = 1)]
    max_attempts: u32,

    /// Gzip the request body
    #[arg(long)]
    compress: bool,

    /// Print the status line and response headers before the body
    #[arg(short = 'i', long)]
    include: bool,

    /// Print the whole response, attempt failures included, as JSON
    #[arg(long, conflicts_with = "include")]
    json: bool,

    /// Use the blocking client instead of the async one
    #[arg(long)]
    blocking: bool,
}

fn parse_parameter(s: &str) -> Result<(String, Option<String>), String> {
    match s.split_once('=') {
        Some((key, _)) if key.is_empty() => Err("parameter name must not be empty".to_string()),
        Some((key, value)) => Ok((key.to_string(), Some(value.to_string()))),
        None if s.is_empty() => Err("parameter name must not be empty".to_string()),
        None => Ok((s.to_string(), None)),
    }
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got '{}'", s)),
    }
}

impl Cli {
    fn to_request(&self) -> RestRequest {
        let mut request = RestRequest::new(self.method.to_uppercase(), self.url.clone())
            .content_type(&self.content_type)
            .accept(&self.accept)
            .timeout(Duration::from_secs(self.timeout))
            .compress_body(self.compress)
            .max_attempts(self.max_attempts);

        if !self.params.is_empty() {
            let parameters: BTreeMap<_, _> = self.params.iter().cloned().collect();
            request = request.parameters(parameters);
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &self.body {
            request = request.body(body);
        }
        request
    }
}

fn render(response: &RestCallerResponse, include: bool, json: bool) -> Result<String> {
    if json {
        let attempts: Vec<_> = response
            .attempt_errors()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "status": e.status().to_string(),
                    "message": e.message(),
                    "status_code": e.status_code().map(|code| code.as_u16()),
                })
            })
            .collect();
        let value = serde_json::json!({
            "status": response.status().as_u16(),
            "content_type": response.content_type(),
            "headers": response.headers(),
            "text": response.text(),
            "attempt_errors": attempts,
        });
        return serde_json::to_string_pretty(&value).context("Failed to render response as JSON");
    }

    let mut out = String::new();
    if include {
        out.push_str(&format!("{}\n", response.status()));
        let mut headers: Vec<_> = response.headers().iter().collect();
        headers.sort();
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\n", name, value));
        }
        out.push('\n');
    }
    out.push_str(response.text());
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let request = cli.to_request();

    let response = if cli.blocking {
        tokio::task::spawn_blocking(move || blocking::RestCaller::new().make_request(&request))
            .await
            .context("Blocking request task failed")?
    } else {
        RestCaller::new().make_request(&request).await
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            for (i, attempt) in e.attempt_errors().iter().enumerate() {
                log::warn!("Attempt {} failed: {}", i + 1, attempt);
            }
            if e.is_invalid_argument() {
                return Err(e.into());
            }
            return Err(e).context(format!("{} {} failed", cli.method, cli.url));
        }
    };

    println!("{}", render(&response, cli.include, cli.json)?);
    Ok(())
}
