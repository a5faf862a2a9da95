//! Webhook handling for Trello events.
//!
//! This module provides:
//! - Signature verification for webhook deliveries (double-HMAC-SHA1)
//! - Typed views over Trello action payloads
//! - The subscriber registry and dispatch logic

pub mod events;
pub mod registry;
pub mod signature;

pub use events::{CardMove, card_move};
pub use registry::{EventHandler, EventKind, HandlerRegistry, dispatch, handler};
pub use signature::{compute_signature, verify_signature};
