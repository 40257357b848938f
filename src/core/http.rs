use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "OfflineInstaller/0.1.0";

/// Shared client for probes, listings and downloads.
///
/// Compression is disabled so `Content-Length` matches the bytes we write,
/// which keeps download percentages honest. `timeout` bounds connecting and
/// each read, so a stalled body fails instead of hanging the batch.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let mut builder = Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers);
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout).read_timeout(timeout);
    }
    builder.build()
}
