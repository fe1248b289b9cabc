use std::time::Instant;

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod catalog;
pub mod cli;
pub mod error;
pub mod expr;
pub mod tree;

// =====================
// Public API
// =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-print the whole response envelope.
    Json,
    /// Pretty-print only the `data` payload.
    Human,
}

/// A fully resolved request ready for the HTTP layer: the output of tree
/// resolution plus argument normalization.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub base_url: String,
    pub path: String,
    /// Canonical argument name -> user-supplied value, in user order.
    pub query: Vec<(String, String)>,
}

/// Configuration for request execution including timeouts, output format,
/// and authentication.
#[derive(Debug, Clone)]
pub struct ExecutionConfig<'a> {
    pub output: OutputFormat,
    pub conn_timeout_secs: Option<f64>,
    pub request_timeout_secs: Option<f64>,
    pub user_agent: &'a str,
    pub api_key: Option<&'a str>,
    pub verbose: bool,
}

impl<'a> ExecutionConfig<'a> {
    #[must_use]
    pub fn new(user_agent: &'a str, api_key: Option<&'a str>) -> Self {
        Self {
            output: OutputFormat::Human,
            conn_timeout_secs: None,
            request_timeout_secs: None,
            user_agent,
            api_key,
            verbose: false,
        }
    }
}

/// The `{status, data}` envelope every API response arrives in. Error
/// responses may omit `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub data: Value,
}

const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Issue the GET and parse the response envelope.
///
/// # Errors
///
/// Fails on transport errors, non-2xx statuses (the error carries the
/// pretty-printed body when the body is JSON), and envelopes that do not
/// parse.
pub fn fetch_envelope(req: &EndpointRequest, config: &ExecutionConfig<'_>) -> Result<ApiEnvelope> {
    let body = fetch_text(req, config)?;
    serde_json::from_str(&body).context("Failed to parse API response envelope")
}

/// Issue the GET and return the raw response body, bypassing the envelope.
///
/// # Errors
///
/// Same transport and status failures as `fetch_envelope`.
pub fn fetch_raw(req: &EndpointRequest, config: &ExecutionConfig<'_>) -> Result<String> {
    fetch_text(req, config)
}

/// Execute a resolved request and print the response according to the
/// configured output format. Returns the process exit code.
///
/// # Errors
///
/// Propagates `fetch_envelope` failures.
pub fn execute_request(req: &EndpointRequest, config: &ExecutionConfig<'_>) -> Result<i32> {
    let envelope = fetch_envelope(req, config)?;
    match config.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope)?),
        OutputFormat::Human => println!("{}", serde_json::to_string_pretty(&envelope.data)?),
    }
    Ok(0)
}

/// Pretty-print a body when it is JSON; pass it through unchanged otherwise.
#[must_use]
pub fn pretty_json(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.to_string()),
        Err(_) => text.to_string(),
    }
}

// =====================
// Internal helpers
// =====================

fn build_client(config: &ExecutionConfig<'_>) -> Result<Client> {
    let mut builder: ClientBuilder = Client::builder().user_agent(config.user_agent);
    if let Some(secs) = config.conn_timeout_secs {
        builder = builder.connect_timeout(std::time::Duration::from_secs_f64(secs));
    }
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs_f64(secs));
    }
    builder.build().context("Failed to build HTTP client")
}

fn build_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn fetch_text(req: &EndpointRequest, config: &ExecutionConfig<'_>) -> Result<String> {
    let client = build_client(config)?;

    let url = build_url(&req.base_url, &req.path);
    let mut builder = client.get(url).header("Accept", "application/json");
    if let Some(key) = config.api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    if !req.query.is_empty() {
        builder = builder.query(&req.query);
    }

    let request = builder.build().context("Failed to build request")?;
    if config.verbose {
        eprintln!("-> GET {}", request.url());
    }

    let started = Instant::now();
    let resp = client.execute(request).context("HTTP request failed")?;
    let elapsed_ms = started.elapsed().as_millis();
    let status = resp.status();
    if config.verbose {
        eprintln!("<- {} ({} ms)", status.as_u16(), elapsed_ms);
    }

    let body = resp.text().context("Failed to read response body")?;
    if !status.is_success() {
        bail!("request failed with status {}:\n{}", status, pretty_json(&body));
    }
    Ok(body)
}
