//! Error types.
//!
//! Two families live here. [`Error`] covers failures that propagate to the caller as a Rust
//! `Err`: bad configuration, HTTP clients that can't be constructed, unreadable input files.
//! [`ReportError`] is a *value*: the `{status, message}` pair that report and Search Console
//! results carry when an upstream call fails. Expected upstream failures never become an `Err`;
//! callers inspect the `error` field instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Configuration was loaded but fails validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Configuration could not be loaded or extracted
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    /// The HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Figment(Box::new(err))
    }
}

/// Type alias for fallible operations in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single upstream HTTP exchange failed.
///
/// This never reaches callers directly: the report fetcher folds it into a [`ReportError`] and the
/// Search Console resolver logs it and moves on to the next candidate.
#[derive(ThisError, Debug)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("error decoding response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl UpstreamError {
    /// Short label for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Decode(_) => "decode",
            UpstreamError::NotAnObject => "not_an_object",
            UpstreamError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// Classification of a failure carried inside a result value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportErrorKind {
    /// No usable access token was available
    MissingAccessToken,
    /// The reporting call failed at the network, HTTP or decoding level
    TransportFailure,
    /// The site has no stored URL to resolve
    NoStats,
    /// No Search Console property variant answered for this host
    NoStatsForHost(String),
}

impl ReportErrorKind {
    /// The status string exposed to consumers
    pub fn status(&self) -> String {
        match self {
            ReportErrorKind::MissingAccessToken => "Missing Access Token".to_string(),
            ReportErrorKind::TransportFailure => "Transport Failure".to_string(),
            ReportErrorKind::NoStats => "No Stats Available".to_string(),
            ReportErrorKind::NoStatsForHost(host) => format!("No Stats Available for {host}"),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportErrorKind::MissingAccessToken => "missing_access_token",
            ReportErrorKind::TransportFailure => "transport_failure",
            ReportErrorKind::NoStats => "no_stats",
            ReportErrorKind::NoStatsForHost(_) => "no_stats_for_host",
        }
    }
}

/// The `{status, message}` pair embedded in failed results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    pub status: String,
    pub message: String,
}

impl ReportError {
    pub fn new(kind: ReportErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ReportError {}
