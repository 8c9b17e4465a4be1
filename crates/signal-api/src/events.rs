//! `GET /events` — WebSocket feed of live sample events.
//!
//! Each connection gets its own [`Subscription`]; a slow or dead socket only
//! affects its own task, never the publisher.

use std::sync::Arc;

use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use signal_core::{
  live::{LiveChannel, LiveEvent},
  store::SampleStore,
};
use tracing::{debug, info};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>, ws: WebSocketUpgrade) -> Response
where
  S: SampleStore + Clone + 'static,
{
  let live = state.live.clone();
  ws.on_upgrade(move |socket| stream(socket, live))
}

async fn stream(mut socket: WebSocket, live: Arc<LiveChannel>) {
  let mut subscription = live.subscribe();
  let id = subscription.id();
  info!(subscriber = id, subscribers = live.subscriber_count(), "live client connected");

  if send(&mut socket, &LiveEvent::Connected).await.is_ok() {
    loop {
      tokio::select! {
        event = subscription.recv() => match event {
          Some(event) => {
            if let Err(e) = send(&mut socket, &event).await {
              debug!(subscriber = id, error = %e, "send failed");
              break;
            }
          }
          None => break,
        },
        incoming = socket.recv() => match incoming {
          Some(Ok(Message::Close(_)) | Err(_)) | None => break,
          // Client messages carry no meaning; pings are answered by axum.
          Some(Ok(_)) => {}
        },
      }
    }
  }

  live.unsubscribe(subscription);
  info!(subscriber = id, subscribers = live.subscriber_count(), "live client disconnected");
}

async fn send(socket: &mut WebSocket, event: &LiveEvent) -> Result<(), axum::Error> {
  let text = serde_json::to_string(event).map_err(axum::Error::new)?;
  socket.send(Message::Text(text.into())).await
}
