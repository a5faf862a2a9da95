//! Typed views over Trello action payloads.
//!
//! The server dispatches verified events as opaque JSON; subscribers that
//! care about structure use the helpers here. A Trello delivery carries an
//! `action` object with a `type` field and a `data` object whose shape
//! depends on the action type.

use serde_json::Value;

use crate::types::CardId;

/// A card moved between two lists on the watched board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardMove {
    /// The card that moved.
    pub card: CardId,

    /// Name of the list the card left, when the payload names it.
    pub list_before: Option<String>,

    /// Name of the list the card landed in.
    pub list_after: String,
}

/// Extracts a card move from a Trello event, if that is what it is.
///
/// A move is an `updateCard` action whose data carries both `listBefore`
/// and `listAfter`. Only the destination list needs a name; the source
/// list's name is passed along when present. Returns `None` for every other
/// event shape, including `updateCard` actions that only changed card
/// fields.
pub fn card_move(event: &Value) -> Option<CardMove> {
    let action = event.get("action")?;
    if action.get("type")?.as_str()? != "updateCard" {
        return None;
    }

    let data = action.get("data")?;
    let card = data.get("card")?.get("id")?.as_str()?;
    let list_before = data.get("listBefore")?;
    let list_after = data.get("listAfter")?.get("name")?.as_str()?;

    Some(CardMove {
        card: CardId::new(card),
        list_before: list_before
            .get("name")
            .and_then(|n| n.as_str())
            .map(String::from),
        list_after: list_after.to_string(),
    })
}
