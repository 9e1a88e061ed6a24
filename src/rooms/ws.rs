use std::sync::Arc;

use axum::{debug_handler, extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::{protocol::ClientEvent, Config, Hub};

#[debug_handler(state = crate::AppState)]
pub async fn relay_ws(
    State(hub): State<Hub>,
    State(config): State<Arc<Config>>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(config.max_frame_bytes)
        .on_upgrade(async move |stream| pump(hub, stream).await)
}

/// One connection's life: attach, shuttle frames both ways, detach when either side stops.
async fn pump(hub: Hub, stream: WebSocket) {
    let (conn, mut rx) = hub.attach().await;
    let (mut sender, mut receiver) = stream.split();
    debug!(%conn, "attached");

    let mut outbound_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%conn, "can't encode outbound event: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let inbound_hub = hub.clone();
    let mut inbound_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let event: ClientEvent = match serde_json::from_str(text.as_str()) {
                Ok(event) => event,
                Err(err) => {
                    warn!(%conn, "dropping undecodable frame: {err}");
                    continue;
                }
            };

            let name = event.name();
            if let Err(err) = inbound_hub.handle(conn, event).await {
                debug!(%conn, event = name, "no-op: {err}");
            }
        }
    });

    tokio::select! {
        _ = &mut outbound_task => inbound_task.abort(),
        _ = &mut inbound_task => outbound_task.abort(),
    };

    hub.detach(conn).await;
    debug!(%conn, "detached");
}
