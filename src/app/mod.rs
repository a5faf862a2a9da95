//! Downstream automation driven by verified webhook events.

pub mod card_move;

pub use card_move::{CardMoveHandler, IN_FLIGHT_LIST, pending_bpa_lines};
