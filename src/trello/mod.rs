//! Trello REST API boundary.
//!
//! The [`TrelloApi`] trait is the narrow interface the relay needs from
//! Trello: webhook registration and deregistration for the server lifecycle,
//! and card operations for downstream handlers. [`TrelloClient`] is the
//! production implementation; tests substitute mocks.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::types::{BoardId, CardId, ListId, WebhookId};

mod client;
mod error;

pub use client::TrelloClient;
pub use error::{TrelloApiError, TrelloErrorKind};

/// A Trello card, limited to the fields the relay reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    pub name: String,

    /// The card description (markdown).
    #[serde(default)]
    pub desc: String,

    /// Full URL of the card, present on fetched and created cards.
    #[serde(default)]
    pub url: Option<String>,

    /// Short URL of the card.
    #[serde(default, rename = "shortUrl")]
    pub short_url: Option<String>,
}

/// The remote calls the relay makes against Trello.
pub trait TrelloApi {
    /// Registers a webhook watching `board`, delivered to `callback_url`.
    /// Returns the id of the created webhook.
    fn create_webhook(
        &self,
        description: &str,
        callback_url: &str,
        board: &BoardId,
    ) -> impl Future<Output = Result<WebhookId, TrelloApiError>> + Send;

    /// Deletes a previously registered webhook.
    fn delete_webhook(
        &self,
        webhook: &WebhookId,
    ) -> impl Future<Output = Result<(), TrelloApiError>> + Send;

    /// Fetches a card by id.
    fn get_card(&self, card: &CardId)
    -> impl Future<Output = Result<Card, TrelloApiError>> + Send;

    /// Updates a card's name and description.
    fn update_card(&self, card: &Card)
    -> impl Future<Output = Result<(), TrelloApiError>> + Send;

    /// Creates a card at the bottom of `list`.
    fn create_card(
        &self,
        list: &ListId,
        name: &str,
        desc: &str,
    ) -> impl Future<Output = Result<Card, TrelloApiError>> + Send;
}
