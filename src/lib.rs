//! Trello webhook relay.
//!
//! Runs an HTTP listener that Trello pushes board activity to, verifies each
//! delivery with double-HMAC-SHA1 signature verification, and dispatches
//! verified events to subscribers. The server registers its own webhook with
//! Trello on startup and deregisters it on shutdown.

pub mod app;
pub mod config;
pub mod hostname;
pub mod server;
pub mod trello;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;
