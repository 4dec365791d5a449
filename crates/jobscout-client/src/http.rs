//! The GET every reqwest-based executor performs.

use std::time::Duration;

use jobscout_core::error::AppError;
use jobscout_core::fetch::RawResponse;
use reqwest::Client;

use crate::fingerprint::Fingerprint;

/// Fetch `url` with the fingerprint's headers.
///
/// Any status is returned as-is: deciding whether a 403 is a block is the
/// classifier's job, not the executor's.
pub(crate) async fn get_page(
    client: &Client,
    url: &str,
    fingerprint: &Fingerprint,
    timeout: Duration,
) -> Result<RawResponse, AppError> {
    let response = client
        .get(url)
        .headers(fingerprint.header_map())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| request_error(e, timeout))?;

    let status = response.status().as_u16();
    let html = response
        .text()
        .await
        .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

    Ok(RawResponse::new(html, status))
}

pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout.as_secs())
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else if e.is_request() {
        AppError::NetworkError(e.to_string())
    } else {
        AppError::HttpError(e.to_string())
    }
}

/// Client settings shared by the direct, proxied and Tor executors.
pub(crate) fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(reqwest::redirect::Policy::limited(10))
}
