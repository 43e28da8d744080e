//! HTTP tool surface for chatsync.
//!
//! Exposes an axum [`Router`] over a [`Pipeline`] whose notifier is the
//! per-session [`SessionHub`]. Callers identify themselves with the
//! `x-session-id` header; notifications for the chats a session follows are
//! streamed as server-sent events from `/notifications`.

pub mod config;
pub mod error;
pub mod hub;
pub mod session;

mod contacts;
mod events;
mod login;
mod messages;
mod notifications;
mod subscriptions;

use axum::{
  Json, Router,
  routing::{get, post},
};
use chatsync_core::{event::ChatEvent, store::MessageStore};
use chatsync_engine::{ChatProvider, Pipeline};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use hub::SessionHub;

/// The engine as wired for HTTP: pushes go to the session hub.
pub type Engine<S, P> = Pipeline<S, P, SessionHub>;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, P> {
  pub engine: Engine<S, P>,
  /// Producer side of the single ingestion queue.
  pub events: mpsc::Sender<ChatEvent>,
}

impl<S, P> Clone for AppState<S, P> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), events: self.events.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the fully materialised router for `state`.
pub fn router<S, P>(state: AppState<S, P>) -> Router
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  Router::new()
    // Connection
    .route("/status", get(login::status::<S, P>))
    .route("/connect", post(login::connect::<S, P>))
    .route("/qr", get(login::qr::<S, P>))
    // Messages
    .route("/messages/send", post(messages::send::<S, P>))
    .route("/messages/history", get(messages::history::<S, P>))
    .route("/messages/unread", get(messages::unread::<S, P>))
    .route("/messages/read", post(messages::mark_read::<S, P>))
    .route("/messages/stats", get(messages::stats::<S, P>))
    // Contacts
    .route("/contacts/check", post(contacts::check::<S, P>))
    // Subscriptions
    .route("/subscriptions", get(subscriptions::list::<S, P>))
    .route(
      "/subscriptions/{chat}",
      post(subscriptions::subscribe::<S, P>).delete(subscriptions::unsubscribe::<S, P>),
    )
    .route("/notifications", get(notifications::stream::<S, P>))
    // Provider webhook
    .route("/events", post(events::ingest::<S, P>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Render `body` as `{"success": true, ...body}`.
pub(crate) fn success(body: impl Serialize) -> Json<Value> {
  let mut value = serde_json::json!(body);
  match value.as_object_mut() {
    Some(map) => {
      map.insert("success".into(), Value::Bool(true));
      Json(value)
    }
    None => Json(serde_json::json!({ "success": true, "data": value })),
  }
}
