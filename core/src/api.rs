/// REST client for the chat backend
///
/// Covers the three request/response collaborators the core consumes:
/// paginated history, message send, and the conversation roster.
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::types::{ChatMessage, Conversation, HistoryPage, HistoryResponse, RosterResponse};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    content: String,
    listing_id: i64,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ChatConfig) -> Self {
        // Conservative timeouts so a dead backend degrades to an inline error
        // instead of a hung view
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let base_url = config.api_base_url.trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        }
    }

    /// Fetch one page of history for `(listing_id, other_user_id)`,
    /// normalized to chronological order. Pages are 1-based; page 1 holds
    /// the most recent `page_size` messages.
    pub async fn history(
        &self,
        listing_id: i64,
        other_user_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<HistoryPage> {
        debug!(listing_id, other_user_id, page, "fetching chat history");

        let response = self
            .request(self.client.get(format!("{}/chat/history", self.base_url)))
            .query(&[
                ("listing_id", listing_id.to_string()),
                ("other_user_id", other_user_id.to_string()),
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ChatError::HistoryFetch(format!("request failed: {}", e)))?;

        let response = check_status(response, ChatError::HistoryFetch).await?;
        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| ChatError::HistoryFetch(format!("invalid response body: {}", e)))?;

        Ok(body.into_chronological())
    }

    /// Persist a message; the returned `ChatMessage` carries the
    /// server-assigned id and timestamp.
    pub async fn send_message(&self, listing_id: i64, content: &str) -> Result<ChatMessage> {
        let request = SendMessageRequest {
            content: content.to_string(),
            listing_id,
        };

        let response = self
            .request(
                self.client
                    .post(format!("{}/chat/message/{}", self.base_url, listing_id)),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Send(format!("request failed: {}", e)))?;

        let response = check_status(response, ChatError::Send).await?;
        response
            .json()
            .await
            .map_err(|e| ChatError::Send(format!("invalid response body: {}", e)))
    }

    /// Fetch the full conversation roster
    pub async fn roster(&self) -> Result<Vec<Conversation>> {
        let response = self
            .request(self.client.get(format!("{}/chat/listings", self.base_url)))
            .send()
            .await
            .map_err(|e| ChatError::HistoryFetch(format!("roster request failed: {}", e)))?;

        let response = check_status(response, ChatError::HistoryFetch).await?;
        let body: RosterResponse = response
            .json()
            .await
            .map_err(|e| ChatError::HistoryFetch(format!("invalid roster body: {}", e)))?;

        Ok(body.listings)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Convert a non-success status to the caller's error variant, pulling the
/// backend's `detail` field out of the body when present.
async fn check_status(
    response: Response,
    to_error: fn(String) -> ChatError,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| format!("HTTP {}", status));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ChatError::Authentication(detail));
    }

    Err(to_error(detail))
}
