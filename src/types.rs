//! Newtype wrappers for Trello identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! CardId where a BoardId is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier Trello assigns to a registered webhook.
///
/// This is an external resource: once a registration call returns an id, the
/// webhook exists on Trello's side and must eventually be deregistered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookId(pub String);

impl WebhookId {
    pub fn new(s: impl Into<String>) -> Self {
        WebhookId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WebhookId {
    fn from(s: String) -> Self {
        WebhookId(s)
    }
}

impl From<&str> for WebhookId {
    fn from(s: &str) -> Self {
        WebhookId(s.to_string())
    }
}

/// A Trello board identifier (the watched resource).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub String);

impl BoardId {
    pub fn new(s: impl Into<String>) -> Self {
        BoardId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BoardId {
    fn from(s: &str) -> Self {
        BoardId(s.to_string())
    }
}

/// A Trello card identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn new(s: impl Into<String>) -> Self {
        CardId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        CardId(s.to_string())
    }
}

/// A Trello list identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub String);

impl ListId {
    pub fn new(s: impl Into<String>) -> Self {
        ListId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ListId {
    fn from(s: &str) -> Self {
        ListId(s.to_string())
    }
}
