//! HTTP fetching shared by the static renderer and the download queue
//!
//! This module handles:
//! - Building the HTTP client with the configured user agent
//! - GET requests that treat any non-success status as a failure

use reqwest::{Client, Response};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value for the User-Agent header
/// * `timeout` - Upper bound for connecting to a server
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use course_archiver::crawler::build_http_client;
///
/// let client = build_http_client("course-archiver/0.1", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    // No overall request timeout: large files may legitimately stream for minutes
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a GET request and rejects non-success statuses
///
/// # Returns
///
/// * `Ok(Response)` - 2xx response, body not yet read
/// * `Err(String)` - Network failure or a non-success status, described
pub async fn get_success(client: &Client, url: &str) -> Result<Response, String> {
    let response = client.get(url).send().await.map_err(describe_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    Ok(response)
}

/// Turns a reqwest error into a short human-readable cause
pub fn describe_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
