//! WebSocket transport for the fetch boundary.
//!
//! Each text frame `{ id, event, payload }` gets exactly one reply
//! `{ id, payload }`, where `payload` is the fetch response or an error envelope.
//! Requests on one socket run concurrently; replies may arrive out of order and
//! are matched by `id`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::Extension;
use futures::{SinkExt, StreamExt};
use query_core::{ErrorBody, ErrorEnvelope, QueryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::fetch::FetchHandler;

pub const FETCH_EVENT: &str = "entities:fetch";

const OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
struct InboundFrame {
    #[serde(default)]
    id: Value,
    event: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Serialize)]
struct OutboundFrame {
    id: Value,
    payload: Value,
}

fn error_payload(body: ErrorBody) -> Value {
    serde_json::to_value(ErrorEnvelope::from(body)).unwrap_or(Value::Null)
}

/// Answer one text frame.
pub async fn handle_frame(handler: &FetchHandler, text: &str) -> String {
    let reply = match serde_json::from_str::<InboundFrame>(text) {
        Err(e) => OutboundFrame {
            id: Value::Null,
            payload: error_payload(QueryError::InvalidRequest(e.to_string()).into_body()),
        },
        Ok(frame) => {
            let payload = match frame.event.as_deref() {
                Some(FETCH_EVENT) => match handler.handle(frame.payload).await {
                    Ok(res) => serde_json::to_value(res).unwrap_or(Value::Null),
                    Err(body) => error_payload(body),
                },
                other => error_payload(
                    QueryError::InvalidRequest(format!(
                        "unsupported event: {}",
                        other.unwrap_or("<none>")
                    ))
                    .into_body(),
                ),
            };
            OutboundFrame {
                id: frame.id,
                payload,
            }
        }
    };
    serde_json::to_string(&reply).unwrap_or_else(|_| "{\"id\":null,\"payload\":null}".to_string())
}

/// `GET /ws`
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Extension(handler): Extension<Arc<FetchHandler>>,
) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, handler))
}

async fn serve_socket(socket: WebSocket, handler: Arc<FetchHandler>) {
    info!("websocket client connected");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sink.send(msg).await {
                debug!(error = %e, "websocket send failed");
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let handler = handler.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let reply = handle_frame(&handler, text.as_str()).await;
                    if tx.send(Message::Text(reply.into())).await.is_err() {
                        debug!("websocket closed before reply was sent");
                    }
                });
            }
            Ok(Message::Binary(_)) => {
                warn!("ignoring binary websocket frame");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "websocket receive failed");
                break;
            }
        }
    }

    drop(tx);
    join_writer(writer).await;
    info!("websocket client disconnected");
}

/// Wait for the outbound writer to drain; a panicked or cancelled writer is logged.
async fn join_writer(writer: JoinHandle<()>) {
    if let Err(e) = writer.await {
        debug!(error = %e, "websocket writer task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::registry::EntityRegistry;
    use crate::config::BlogConfig;
    use tracing_test::traced_test;

    fn handler() -> FetchHandler {
        FetchHandler::new(EntityRegistry::new(), BlogConfig::default())
    }

    #[tokio::test]
    async fn malformed_frames_still_get_a_reply() {
        let reply: Value = serde_json::from_str(&handle_frame(&handler(), "not json").await).unwrap();
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["payload"]["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn unknown_event_echoes_id() {
        let frame = r#"{"id":"7","event":"posts:create","payload":{}}"#;
        let reply: Value = serde_json::from_str(&handle_frame(&handler(), frame).await).unwrap();
        assert_eq!(reply["id"], "7");
        assert_eq!(reply["payload"]["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn fetch_errors_use_the_envelope() {
        let frame = r#"{"id":1,"event":"entities:fetch","payload":{"entityType":"comments"}}"#;
        let reply: Value = serde_json::from_str(&handle_frame(&handler(), frame).await).unwrap();
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["payload"]["error"]["code"], "INVALID_ENTITY_TYPE");
    }

    #[tokio::test]
    #[traced_test]
    async fn panicked_writer_is_logged() {
        join_writer(tokio::spawn(async { panic!("sink exploded") })).await;
        assert!(logs_contain("websocket writer task failed"));

        join_writer(tokio::spawn(async {})).await;
    }
}
