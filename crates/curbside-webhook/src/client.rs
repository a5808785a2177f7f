// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for the webhook adapters.

use std::time::Duration;

use curbside_core::CurbsideError;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Builds a JSON client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, CurbsideError> {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("application/json"));
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| CurbsideError::Config(format!("failed to build HTTP client: {e}")))
}

/// Parses and checks a configured endpoint URL.
pub(crate) fn parse_url(field: &str, value: &str) -> Result<reqwest::Url, CurbsideError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| CurbsideError::Config(format!("webhook.{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CurbsideError::Config(format!(
            "webhook.{field} must use http or https, got `{other}`"
        ))),
    }
}

/// Statuses worth retrying later.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || matches!(status.as_u16(), 408 | 425 | 429)
}

/// Maps a transport failure. Timeouts and connection errors may succeed on retry.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> CurbsideError {
    if err.is_timeout() {
        return CurbsideError::Timeout { duration: timeout };
    }
    CurbsideError::Dispatch {
        message: format!("HTTP request failed: {err}"),
        retryable: true,
        source: Some(Box::new(err)),
    }
}

/// Maps a non-success response.
pub(crate) async fn status_error(response: reqwest::Response) -> CurbsideError {
    let status = response.status();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    CurbsideError::Dispatch {
        message: format!("endpoint returned {status}: {body}"),
        retryable: is_transient_status(status),
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(is_transient_status(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [400, 401, 403, 404, 410, 422] {
            assert!(!is_transient_status(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_url("notify_url", "https://example.com/hooks").is_ok());
        assert!(parse_url("notify_url", "ftp://example.com").is_err());
        assert!(parse_url("notify_url", "not a url").is_err());
    }
}
