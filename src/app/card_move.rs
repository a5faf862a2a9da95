//! Follow-on card creation for cards moved into "In Flight".
//!
//! A card description may carry `BPA:` lines naming orders that need their
//! own tracking card on a companion list. When a card moves into the
//! "In Flight" list, each `BPA:` line that does not already link to a Trello
//! card gets one created, and the line is rewritten to point at it.
//!
//! All failures here are logged and contained: a handler error never
//! propagates back to the webhook listener, and one failed card does not
//! stop the remaining lines.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::trello::{TrelloApi, TrelloApiError};
use crate::types::{CardId, ListId};
use crate::webhooks::{self, EventHandler, card_move};

/// The list name that triggers follow-on card creation.
pub const IN_FLIGHT_LIST: &str = "In Flight";

const BPA_PREFIX: &str = "BPA:";

/// Subscriber that reacts to card moves on the watched board.
pub struct CardMoveHandler<T> {
    trello: T,
    companion_list: ListId,
}

impl<T: TrelloApi + Send + Sync + 'static> CardMoveHandler<T> {
    pub fn new(trello: T, companion_list: ListId) -> Self {
        CardMoveHandler {
            trello,
            companion_list,
        }
    }

    /// Handles one verified event. Non-move events and moves into other
    /// lists are ignored.
    pub async fn handle(&self, event: Value) {
        let Some(mv) = card_move(&event) else {
            return;
        };
        if mv.list_after != IN_FLIGHT_LIST {
            return;
        }
        debug!(card = %mv.card, "card was moved to In Flight");

        if let Err(err) = self.add_follow_on_cards(&mv.card).await {
            error!(
                card = %mv.card,
                error = %err,
                retriable = err.is_retriable(),
                "error creating follow-on cards"
            );
        }
    }

    /// Wraps the handler for registration with the webhook server.
    pub fn into_handler(self) -> EventHandler {
        let this = Arc::new(self);
        webhooks::handler(move |event| {
            let this = Arc::clone(&this);
            async move { this.handle(event).await }
        })
    }

    async fn add_follow_on_cards(&self, card_id: &CardId) -> Result<(), TrelloApiError> {
        let mut card = self.trello.get_card(card_id).await?;
        let pending = pending_bpa_lines(&card.desc);
        if pending.is_empty() {
            return Ok(());
        }

        let source = card
            .short_url
            .clone()
            .or_else(|| card.url.clone())
            .unwrap_or_default();

        let mut desc = card.desc.clone();
        for line in &pending {
            let order = line[BPA_PREFIX.len()..].trim();
            let details = format!("Project: {}\nSource: {}", card.name, source);
            match self
                .trello
                .create_card(&self.companion_list, order, &details)
                .await
            {
                Ok(created) => {
                    let link = created.url.or(created.short_url).unwrap_or_default();
                    // Only the first occurrence: identical lines each get
                    // their own card, one per iteration.
                    desc = desc.replacen(line, &format!("BPA: {link}"), 1);
                }
                Err(err) => {
                    // One failed card does not stop the rest.
                    error!(error = %err, retriable = err.is_retriable(), "error creating BPA card");
                }
            }
        }

        if desc != card.desc {
            card.desc = desc;
            self.trello.update_card(&card).await?;
        }
        Ok(())
    }
}

/// Finds `BPA:` segments (from the marker to end of line, case-insensitive)
/// that do not already carry a trello.com link.
pub fn pending_bpa_lines(desc: &str) -> Vec<String> {
    desc.lines()
        .filter_map(|line| {
            let start = line.to_ascii_lowercase().find("bpa:")?;
            Some(line[start..].to_string())
        })
        .filter(|segment| !segment.contains("https://trello.com"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTrello;
    use crate::trello::Card;
    use serde_json::json;

    fn move_event(card_id: &str, list_after: &str) -> Value {
        json!({
            "action": {
                "type": "updateCard",
                "data": {
                    "card": { "id": card_id },
                    "listBefore": { "name": "Backlog" },
                    "listAfter": { "name": list_after }
                }
            }
        })
    }

    fn seeded_card(desc: &str) -> Card {
        Card {
            id: CardId::new("card-1"),
            name: "Widget procurement".to_string(),
            desc: desc.to_string(),
            url: None,
            short_url: Some("https://trello.com/c/short".to_string()),
        }
    }

    fn handler_with(trello: &MockTrello) -> CardMoveHandler<MockTrello> {
        CardMoveHandler::new(trello.clone(), ListId::new("bpa-list"))
    }

    #[test]
    fn pending_lines_skips_linked_ones() {
        let desc = "Intro\nBPA: order one\nBPA: https://trello.com/c/done\nbpa: order two";
        let pending = pending_bpa_lines(desc);
        assert_eq!(pending, vec!["BPA: order one", "bpa: order two"]);
    }

    #[test]
    fn pending_lines_matches_mid_line_markers() {
        let pending = pending_bpa_lines("see BPA: embedded order");
        assert_eq!(pending, vec!["BPA: embedded order"]);
    }

    #[test]
    fn pending_lines_empty_without_markers() {
        assert!(pending_bpa_lines("just a description").is_empty());
    }

    #[tokio::test]
    async fn creates_cards_and_rewrites_description() {
        let trello = MockTrello::default();
        trello.put_card(seeded_card("Header\nBPA: order one\nBPA: order two"));

        handler_with(&trello)
            .handle(move_event("card-1", IN_FLIGHT_LIST))
            .await;

        let created = trello.created_cards.lock().unwrap().clone();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].1, "order one");
        assert_eq!(created[1].1, "order two");
        assert!(created[0].2.contains("Widget procurement"));
        assert!(created[0].2.contains("https://trello.com/c/short"));

        let updated = trello.updated_cards.lock().unwrap().clone();
        assert_eq!(updated.len(), 1);
        assert_eq!(
            updated[0].desc,
            "Header\nBPA: https://trello.com/c/created-1\nBPA: https://trello.com/c/created-2"
        );
    }

    #[tokio::test]
    async fn duplicate_lines_each_get_their_own_card() {
        let trello = MockTrello::default();
        trello.put_card(seeded_card("BPA: order one\nBPA: order one"));

        handler_with(&trello)
            .handle(move_event("card-1", IN_FLIGHT_LIST))
            .await;

        // Two identical lines mean two cards, and each line must link to a
        // different one.
        let created = trello.created_cards.lock().unwrap().clone();
        assert_eq!(created.len(), 2);

        let updated = trello.updated_cards.lock().unwrap().clone();
        assert_eq!(updated.len(), 1);
        assert_eq!(
            updated[0].desc,
            "BPA: https://trello.com/c/created-1\nBPA: https://trello.com/c/created-2"
        );
    }

    #[tokio::test]
    async fn ignores_moves_into_other_lists() {
        let trello = MockTrello::default();
        trello.put_card(seeded_card("BPA: order"));

        handler_with(&trello)
            .handle(move_event("card-1", "Done"))
            .await;

        assert!(trello.created_cards.lock().unwrap().is_empty());
        assert!(trello.updated_cards.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ignores_non_move_events() {
        let trello = MockTrello::default();

        handler_with(&trello)
            .handle(json!({"action": {"type": "commentCard", "data": {}}}))
            .await;

        assert!(trello.created_cards.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn already_linked_card_is_left_alone() {
        let trello = MockTrello::default();
        trello.put_card(seeded_card("BPA: https://trello.com/c/existing"));

        handler_with(&trello)
            .handle(move_event("card-1", IN_FLIGHT_LIST))
            .await;

        assert!(trello.created_cards.lock().unwrap().is_empty());
        assert!(trello.updated_cards.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn card_creation_failure_is_contained() {
        let trello = MockTrello {
            fail_create_card: true,
            ..MockTrello::default()
        };
        trello.put_card(seeded_card("BPA: order one"));

        // Must not panic or propagate; description stays untouched.
        handler_with(&trello)
            .handle(move_event("card-1", IN_FLIGHT_LIST))
            .await;

        assert!(trello.updated_cards.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_card_is_logged_not_fatal() {
        let trello = MockTrello::default();

        handler_with(&trello)
            .handle(move_event("ghost-card", IN_FLIGHT_LIST))
            .await;

        assert!(trello.created_cards.lock().unwrap().is_empty());
    }
}
