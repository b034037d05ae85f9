//! HTTP implementations of the dispatcher and delivery channel.
//!
//! # Responsibilities
//! - POST conversation history to the response generator
//! - POST typing/text/image actions to the delivery endpoint
//! - Translate transport failures and status codes into `DispatchError`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::Serialize;

use crate::config::{DeliveryConfig, DispatcherConfig};
use crate::conversation::{ConversationId, Message};
use crate::dispatch::{DeliveryChannel, DispatchError, DispatchResult, Reply, ResponseDispatcher};

/// Map a reqwest failure to the relay's taxonomy.
pub(crate) fn classify_transport(err: &reqwest::Error) -> DispatchError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        DispatchError::ConnectionReset(err.to_string())
    } else if err.is_decode() || err.is_body() {
        DispatchError::Other(format!("malformed response: {err}"))
    } else {
        DispatchError::Other(err.to_string())
    }
}

/// Map a non-success status to the relay's taxonomy.
pub(crate) fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> DispatchError {
    match status {
        StatusCode::CONFLICT => DispatchError::Conflict(body.to_string()),
        StatusCode::TOO_MANY_REQUESTS => DispatchError::RateLimited { retry_after },
        s if s.is_server_error() => DispatchError::TransportFatal(format!("{s}: {body}")),
        s => DispatchError::Other(format!("{s}: {body}")),
    }
}

/// Turn a response into `Ok(response)` or a classified error.
async fn check_status(response: Response) -> DispatchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, retry_after, &body))
}

fn build_client(timeout_secs: u64) -> DispatchResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DispatchError::Other(format!("failed to build HTTP client: {e}")))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    conversation_id: &'a ConversationId,
    messages: &'a [Message],
}

/// Response generator reached over HTTP.
///
/// Replies with `204 No Content` when there is nothing to send.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(config: &DispatcherConfig) -> DispatchResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ResponseDispatcher for HttpDispatcher {
    async fn generate_response(
        &self,
        conversation: &ConversationId,
        history: &[Message],
    ) -> DispatchResult<Option<Reply>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                conversation_id: conversation,
                messages: history,
            })
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        let response = check_status(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let reply: Reply = response.json().await.map_err(|e| classify_transport(&e))?;
        if reply.text.trim().is_empty() && reply.image_url.is_none() {
            return Ok(None);
        }
        Ok(Some(reply))
    }
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum DeliveryAction<'a> {
    Typing { conversation_id: &'a ConversationId },
    Image { conversation_id: &'a ConversationId, url: &'a str },
    Text { conversation_id: &'a ConversationId, text: &'a str },
}

/// Delivery channel reached over HTTP.
#[derive(Clone)]
pub struct HttpDelivery {
    client: Client,
    endpoint: String,
}

impl HttpDelivery {
    pub fn new(config: &DeliveryConfig) -> DispatchResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            endpoint: config.endpoint.clone(),
        })
    }

    async fn post(&self, action: DeliveryAction<'_>) -> DispatchResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&action)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel for HttpDelivery {
    async fn send_typing(&self, conversation: &ConversationId) -> DispatchResult<()> {
        self.post(DeliveryAction::Typing {
            conversation_id: conversation,
        })
        .await
    }

    async fn send_image(&self, conversation: &ConversationId, url: &str) -> DispatchResult<()> {
        self.post(DeliveryAction::Image {
            conversation_id: conversation,
            url,
        })
        .await
    }

    async fn send_text(&self, conversation: &ConversationId, text: &str) -> DispatchResult<()> {
        self.post(DeliveryAction::Text {
            conversation_id: conversation,
            text,
        })
        .await
    }
}
