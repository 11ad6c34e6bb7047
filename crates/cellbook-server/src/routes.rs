//! HTTP and WebSocket routes for the cellbook server.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Json},
    routing::get,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;
use tower_http::cors::CorsLayer;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::SessionHandle;

type SharedSink = Arc<TokioMutex<SplitSink<WebSocket, Message>>>;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Active notebook session.
    pub session: SessionHandle,
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let sender: SharedSink = Arc::new(TokioMutex::new(sender));

    // Subscribe before reading so no result of our own requests is missed
    let mut rx = state.session.subscribe();
    let forward_sender = sender.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if !send_message(&forward_sender, &msg).await {
                break;
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Err(e) = state.session.handle(msg) {
                        tracing::error!("Session rejected message: {}", e);
                        send_message(&sender, &ServerMessage::Error { message: e.to_string() }).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse client message: {} (input: {})", e, text.as_str());
                    send_message(
                        &sender,
                        &ServerMessage::Error {
                            message: format!("Invalid message format: {}", e),
                        },
                    )
                    .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!("WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    forward_task.abort();
}

/// Send a server message through the WebSocket. Returns false once the
/// socket is gone.
async fn send_message(sender: &SharedSink, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let mut sender = sender.lock().await;
            sender.send(Message::Text(json.into())).await.is_ok()
        }
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use cellbook_core::ThreadSpawner;
    use tower::ServiceExt;

    use crate::session::SessionConfig;

    #[tokio::test]
    async fn test_health() {
        let session =
            SessionHandle::start(SessionConfig::default(), Arc::new(ThreadSpawner::builtin())).unwrap();
        let app = create_router(AppState { session });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
