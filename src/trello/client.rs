//! Reqwest-based Trello client.
//!
//! Authentication is per-request: the API key and token travel as `key` and
//! `token` query parameters on every call. The client carries a request
//! timeout so a hung remote call cannot block startup or shutdown forever.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{Card, TrelloApi, TrelloApiError};
use crate::config::Credentials;
use crate::types::{BoardId, CardId, ListId, WebhookId};

const TRELLO_API_BASE: &str = "https://api.trello.com/1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A Trello API client bound to one key/token pair.
#[derive(Clone)]
pub struct TrelloClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_token: String,
}

#[derive(Deserialize)]
struct CreatedWebhook {
    id: WebhookId,
}

impl TrelloClient {
    /// Creates a client against the production Trello API.
    pub fn new(credentials: &Credentials) -> Result<Self, TrelloApiError> {
        Self::with_base_url(credentials, TRELLO_API_BASE)
    }

    /// Creates a client against an alternate base URL (tests point this at
    /// a local mock server).
    pub fn with_base_url(
        credentials: &Credentials,
        base_url: impl Into<String>,
    ) -> Result<Self, TrelloApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TrelloApiError::from_reqwest)?;

        Ok(TrelloClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            api_token: credentials.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [("key", self.api_key.as_str()), ("token", self.api_token.as_str())]
    }

    /// Maps a non-success response to a categorized error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TrelloApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrelloApiError::from_status(status.as_u16(), body))
    }
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TrelloApi for TrelloClient {
    async fn create_webhook(
        &self,
        description: &str,
        callback_url: &str,
        board: &BoardId,
    ) -> Result<WebhookId, TrelloApiError> {
        let response = self
            .http
            .post(self.url("/webhooks"))
            .query(&self.auth())
            .json(&json!({
                "description": description,
                "callbackURL": callback_url,
                "idModel": board,
            }))
            .send()
            .await
            .map_err(TrelloApiError::from_reqwest)?;

        let created: CreatedWebhook = Self::check(response)
            .await?
            .json()
            .await
            .map_err(TrelloApiError::from_reqwest)?;
        Ok(created.id)
    }

    async fn delete_webhook(&self, webhook: &WebhookId) -> Result<(), TrelloApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/webhooks/{webhook}")))
            .query(&self.auth())
            .send()
            .await
            .map_err(TrelloApiError::from_reqwest)?;

        Self::check(response).await?;
        Ok(())
    }

    async fn get_card(&self, card: &CardId) -> Result<Card, TrelloApiError> {
        let response = self
            .http
            .get(self.url(&format!("/cards/{card}")))
            .query(&self.auth())
            .send()
            .await
            .map_err(TrelloApiError::from_reqwest)?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(TrelloApiError::from_reqwest)
    }

    async fn update_card(&self, card: &Card) -> Result<(), TrelloApiError> {
        let response = self
            .http
            .put(self.url(&format!("/cards/{}", card.id)))
            .query(&self.auth())
            .json(&json!({
                "name": card.name,
                "desc": card.desc,
            }))
            .send()
            .await
            .map_err(TrelloApiError::from_reqwest)?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_card(
        &self,
        list: &ListId,
        name: &str,
        desc: &str,
    ) -> Result<Card, TrelloApiError> {
        let response = self
            .http
            .post(self.url("/cards"))
            .query(&self.auth())
            .query(&[("idList", list.as_str())])
            .json(&json!({
                "name": name,
                "desc": desc,
            }))
            .send()
            .await
            .map_err(TrelloApiError::from_reqwest)?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(TrelloApiError::from_reqwest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trello::TrelloErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            api_key: "test-key".to_string(),
            api_token: "test-token".to_string(),
            client_secret: "test-secret".to_string(),
        }
    }

    async fn client_for(server: &MockServer) -> TrelloClient {
        TrelloClient::with_base_url(&credentials(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn create_webhook_posts_registration_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhooks"))
            .and(query_param("key", "test-key"))
            .and(query_param("token", "test-token"))
            .and(body_partial_json(json!({
                "description": "Trello relay webhook",
                "callbackURL": "https://callback.test",
                "idModel": "board-1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wh-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let id = client
            .create_webhook(
                "Trello relay webhook",
                "https://callback.test",
                &BoardId::new("board-1"),
            )
            .await
            .unwrap();

        assert_eq!(id, WebhookId::new("wh-1"));
    }

    #[tokio::test]
    async fn delete_webhook_targets_the_stored_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/webhooks/wh-1"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_webhook(&WebhookId::new("wh-1")).await.unwrap();
    }

    #[tokio::test]
    async fn get_card_deserializes_the_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/card-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "card-1",
                "name": "Build the thing",
                "desc": "BPA: order 1",
                "shortUrl": "https://trello.com/c/abc",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let card = client.get_card(&CardId::new("card-1")).await.unwrap();

        assert_eq!(card.id, CardId::new("card-1"));
        assert_eq!(card.name, "Build the thing");
        assert_eq!(card.desc, "BPA: order 1");
        assert_eq!(card.short_url.as_deref(), Some("https://trello.com/c/abc"));
    }

    #[tokio::test]
    async fn create_card_posts_to_the_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cards"))
            .and(query_param("idList", "list-9"))
            .and(body_partial_json(json!({"name": "order 1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "card-9",
                "name": "order 1",
                "url": "https://trello.com/c/xyz",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let card = client
            .create_card(&ListId::new("list-9"), "order 1", "details")
            .await
            .unwrap();

        assert_eq!(card.url.as_deref(), Some("https://trello.com/c/xyz"));
    }

    #[tokio::test]
    async fn server_error_maps_to_transient() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/webhooks/wh-1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .delete_webhook(&WebhookId::new("wh-1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, TrelloErrorKind::Transient);
        assert_eq!(err.status_code, Some(503));
    }

    #[tokio::test]
    async fn client_error_maps_to_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("card not found"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.get_card(&CardId::new("missing")).await.unwrap_err();

        assert_eq!(err.kind, TrelloErrorKind::Permanent);
        assert!(err.to_string().contains("card not found"));
    }
}
