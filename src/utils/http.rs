// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Response;

use crate::error::{AppError, Result};
use crate::models::{GoogleConfig, RedditConfig};

/// User-Agent for requests that are not made on behalf of a Reddit app.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn build_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Create the client used for Reddit API calls.
pub fn create_client(config: &RedditConfig) -> Result<reqwest::Client> {
    build_client(&config.user_agent, config.timeout_secs)
}

/// Create the client used for Google OAuth, Drive and Sheets calls.
pub fn create_google_client(config: &GoogleConfig) -> Result<reqwest::Client> {
    build_client(USER_AGENT, config.timeout_secs)
}

/// Send an OAuth2 token request through one of our configured clients.
///
/// Token endpoints then see the same User-Agent and timeout as every other
/// request of that API.
pub async fn oauth_request(
    client: &reqwest::Client,
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse> {
    let method =
        reqwest::Method::from_bytes(request.method.as_str().as_bytes()).map_err(AppError::auth)?;
    let mut builder = client
        .request(method, request.url.as_str())
        .body(request.body);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    let response = builder.send().await?;

    let status_code = oauth2::http::StatusCode::from_u16(response.status().as_u16())
        .map_err(AppError::auth)?;
    let mut headers = oauth2::http::HeaderMap::new();
    for (name, value) in response.headers() {
        let name = oauth2::http::HeaderName::from_bytes(name.as_str().as_bytes());
        let value = oauth2::http::HeaderValue::from_bytes(value.as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            headers.append(name, value);
        }
    }
    let body = response.bytes().await?.to_vec();

    Ok(oauth2::HttpResponse {
        status_code,
        headers,
        body,
    })
}

/// Turn a non-2xx response into an error carrying the status and body.
pub async fn error_for_status(
    response: Response,
    context: &str,
    wrap: fn(String, String) -> AppError,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", truncate(body, 300))
    };
    Err(wrap(context.to_string(), message))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
