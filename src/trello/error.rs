//! Trello API error types.
//!
//! Errors are categorized as transient or permanent so callers can decide
//! whether a retry is worthwhile. The relay itself never retries — startup
//! failures are fatal and deregistration is best-effort — but downstream
//! handlers use the categorization.

use std::fmt;
use thiserror::Error;

/// The kind of Trello API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrelloErrorKind {
    /// Transient error - safe to retry with backoff (HTTP 5xx, 429,
    /// network timeouts).
    Transient,

    /// Permanent error - requires configuration or human intervention
    /// (most 4xx, authentication failures).
    Permanent,
}

impl TrelloErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, TrelloErrorKind::Transient)
    }
}

/// A Trello API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct TrelloApiError {
    /// The kind of error (transient or permanent).
    pub kind: TrelloErrorKind,

    /// The HTTP status code, if the request got far enough to receive one.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for TrelloApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "Trello API error (HTTP {}): {}", code, self.message),
            None => write!(f, "Trello API error: {}", self.message),
        }
    }
}

impl TrelloApiError {
    /// Categorizes a reqwest transport error.
    ///
    /// Timeouts and connection failures are transient; everything else
    /// without a status code is treated as permanent.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let kind = if err.is_timeout() || err.is_connect() {
            TrelloErrorKind::Transient
        } else {
            match status_code {
                Some(code) => Self::kind_for_status(code),
                None => TrelloErrorKind::Permanent,
            }
        };

        TrelloApiError {
            kind,
            status_code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Builds an error from a non-success HTTP response.
    pub fn from_status(status: u16, body: String) -> Self {
        TrelloApiError {
            kind: Self::kind_for_status(status),
            status_code: Some(status),
            message: if body.is_empty() {
                format!("request failed with status {status}")
            } else {
                body
            },
            source: None,
        }
    }

    /// Creates a permanent error without a transport source.
    pub fn permanent(message: impl Into<String>) -> Self {
        TrelloApiError {
            kind: TrelloErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    fn kind_for_status(status: u16) -> TrelloErrorKind {
        match status {
            429 => TrelloErrorKind::Transient,
            code if (500..600).contains(&code) => TrelloErrorKind::Transient,
            _ => TrelloErrorKind::Permanent,
        }
    }
}
