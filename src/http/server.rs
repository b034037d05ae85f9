//! Inbound HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router for message ingest and liveness
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve until the shutdown signal fires

use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::IngestConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::relay::{InboundMessage, Relay};

#[derive(Debug, Serialize)]
struct Accepted {
    conversation_id: String,
    parts: usize,
}

/// HTTP server accepting inbound chat messages.
pub struct IngestServer {
    router: Router,
}

impl IngestServer {
    pub fn new(config: &IngestConfig, relay: Relay) -> Self {
        Self {
            router: Self::build_router(config, relay),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &IngestConfig, relay: Relay) -> Router {
        Router::new()
            .route("/messages", post(ingest_handler))
            .route("/health", get(health_handler))
            .with_state(relay)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "ingest",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request),
                        )
                    }))
                    .layer(propagate_request_id_layer())
                    // Outside the timeout: `Timeout` needs a `Default` response body.
                    .layer(RequestBodyLimitLayer::new(config.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Ingest server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Ingest server stopped");
        Ok(())
    }
}

async fn ingest_handler(State(relay): State<Relay>, Json(inbound): Json<InboundMessage>) -> Response {
    let conversation_id = inbound.conversation_id.to_string();
    match relay.ingest(inbound).await {
        Ok(message) => (
            StatusCode::ACCEPTED,
            Json(Accepted {
                conversation_id,
                parts: message.parts.len(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(conversation_id = %conversation_id, error = %e, "Rejected inbound message");
            e.into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::conversation::{ConversationId, ConversationQueue, HistoryStore, InMemoryHistory};
    use crate::dispatch::HttpEnricher;

    async fn spawn_server() -> (String, Relay, broadcast::Sender<()>) {
        spawn_server_with(IngestConfig::default()).await
    }

    async fn spawn_server_with(config: IngestConfig) -> (String, Relay, broadcast::Sender<()>) {
        let history = Arc::new(InMemoryHistory::new(10, None));
        let enricher = HttpEnricher::new(&Default::default()).unwrap();
        let relay = Relay::new(ConversationQueue::new(history), Arc::new(enricher), "[image]");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = broadcast::channel(1);
        let server = IngestServer::new(&config, relay.clone());
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });
        (format!("http://{addr}"), relay, tx)
    }

    #[tokio::test]
    async fn test_post_message_is_queued() {
        let (base, relay, shutdown) = spawn_server().await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{base}/messages"))
            .json(&serde_json::json!({
                "conversation_id": "chat-9",
                "user_id": "u1",
                "display_name": "Ada",
                "text": "hello there",
                "image_urls": ["http://img/1.png"],
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert!(res.headers().contains_key("x-request-id"));
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["parts"], 2);

        let id = ConversationId::from("chat-9");
        assert!(relay.queue().history().is_due(&id));
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (base, relay, shutdown) = spawn_server().await;
        let res = reqwest::Client::new()
            .post(format!("{base}/messages"))
            .json(&serde_json::json!({
                "conversation_id": "chat-9",
                "user_id": "u1",
                "display_name": "Ada",
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(relay.queue().is_empty());
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (base, relay, shutdown) = spawn_server_with(IngestConfig {
            max_body_size: 64,
            ..IngestConfig::default()
        })
        .await;

        let res = reqwest::Client::new()
            .post(format!("{base}/messages"))
            .json(&serde_json::json!({
                "conversation_id": "chat-9",
                "user_id": "u1",
                "display_name": "Ada",
                "text": "x".repeat(512),
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(res.headers().contains_key("x-request-id"));
        assert!(relay.queue().is_empty());
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _relay, shutdown) = spawn_server().await;
        let res = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "ok");
        let _ = shutdown.send(());
    }
}
