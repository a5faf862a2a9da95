//! Shared test doubles for the Trello API and hostname provider seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::hostname::{HostnameError, HostnameProvider};
use crate::trello::{Card, TrelloApi, TrelloApiError};
use crate::types::{BoardId, CardId, ListId, WebhookId};

/// In-memory Trello double that records every call.
///
/// `create_webhook` always returns the id `"webhook-id"`. Cards served by
/// `get_card` are seeded through [`MockTrello::put_card`]; created cards get
/// sequential ids and a trello.com URL.
#[derive(Clone, Default)]
pub struct MockTrello {
    pub fail_create_webhook: bool,
    pub fail_delete_webhook: bool,
    pub fail_create_card: bool,

    /// (description, callback_url, board) per registration call.
    pub created_webhooks: Arc<Mutex<Vec<(String, String, BoardId)>>>,
    pub deleted_webhooks: Arc<Mutex<Vec<WebhookId>>>,

    pub cards: Arc<Mutex<HashMap<CardId, Card>>>,
    /// (list, name, desc) per creation call.
    pub created_cards: Arc<Mutex<Vec<(ListId, String, String)>>>,
    pub updated_cards: Arc<Mutex<Vec<Card>>>,
}

impl MockTrello {
    pub fn put_card(&self, card: Card) {
        self.cards.lock().unwrap().insert(card.id.clone(), card);
    }
}

impl TrelloApi for MockTrello {
    async fn create_webhook(
        &self,
        description: &str,
        callback_url: &str,
        board: &BoardId,
    ) -> Result<WebhookId, TrelloApiError> {
        self.created_webhooks.lock().unwrap().push((
            description.to_string(),
            callback_url.to_string(),
            board.clone(),
        ));
        if self.fail_create_webhook {
            return Err(TrelloApiError::permanent("registration refused"));
        }
        Ok(WebhookId::new("webhook-id"))
    }

    async fn delete_webhook(&self, webhook: &WebhookId) -> Result<(), TrelloApiError> {
        self.deleted_webhooks.lock().unwrap().push(webhook.clone());
        if self.fail_delete_webhook {
            return Err(TrelloApiError::permanent("deregistration refused"));
        }
        Ok(())
    }

    async fn get_card(&self, card: &CardId) -> Result<Card, TrelloApiError> {
        self.cards
            .lock()
            .unwrap()
            .get(card)
            .cloned()
            .ok_or_else(|| TrelloApiError::permanent(format!("no such card: {card}")))
    }

    async fn update_card(&self, card: &Card) -> Result<(), TrelloApiError> {
        self.updated_cards.lock().unwrap().push(card.clone());
        Ok(())
    }

    async fn create_card(
        &self,
        list: &ListId,
        name: &str,
        desc: &str,
    ) -> Result<Card, TrelloApiError> {
        if self.fail_create_card {
            return Err(TrelloApiError::permanent("card creation refused"));
        }
        let mut created = self.created_cards.lock().unwrap();
        let id = format!("created-{}", created.len() + 1);
        created.push((list.clone(), name.to_string(), desc.to_string()));
        Ok(Card {
            id: CardId::new(id.clone()),
            name: name.to_string(),
            desc: desc.to_string(),
            url: Some(format!("https://trello.com/c/{id}")),
            short_url: None,
        })
    }
}

/// Hostname provider that always fails.
pub struct FailingHostname;

impl HostnameProvider for FailingHostname {
    async fn resolve(&self, _port: u16) -> Result<String, HostnameError> {
        Err(HostnameError::Provider("no tunnel available".to_string()))
    }
}
