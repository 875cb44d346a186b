use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

/// Blocking client with the toolkit user agent. `None` disables the
/// request timeout entirely.
pub fn build_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    let agent = format!("mg-toolkit/{}", env!("CARGO_PKG_VERSION"));
    if let Ok(value) = HeaderValue::from_str(&agent) {
        headers.insert(USER_AGENT, value);
    }
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Splits a failed response into its status code and body text.
pub fn failure_parts(response: Response, fallback: &str) -> (u16, String) {
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_else(|_| fallback.to_string());
    (status, message)
}
