//! Shared plumbing for the Google API HTTP clients.

use crate::errors::{Error, Result, UpstreamError};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Build an HTTP client with the given per-request timeout. TLS certificates are verified.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().map_err(Error::HttpClient)
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends in '/', so joining
/// `/v1beta` and `properties/1` would give `/properties/1`. Call this before `join`.
pub fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Turn a non-success response into [`UpstreamError::Status`], pulling the message out of a
/// Google API error envelope when there is one.
pub async fn status_error(response: Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{} ({code})", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body,
    };
    UpstreamError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_base_path() {
        let base = Url::parse("https://analyticsdata.googleapis.com/v1beta").unwrap();
        let url = ensure_slash(&base).join("properties/123:runReport").unwrap();
        assert_eq!(url.as_str(), "https://analyticsdata.googleapis.com/v1beta/properties/123:runReport");
    }

    #[test]
    fn test_join_keeps_percent_encoding() {
        let base = Url::parse("https://www.googleapis.com/webmasters/v3/").unwrap();
        let url = ensure_slash(&base).join("sites/sc-domain%3Aexample.com/searchAnalytics/query").unwrap();
        assert_eq!(url.path(), "/webmasters/v3/sites/sc-domain%3Aexample.com/searchAnalytics/query");
    }
}
