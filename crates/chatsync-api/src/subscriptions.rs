//! Handlers for `/subscriptions` endpoints. All of them act on the calling
//! session, so the `x-session-id` header is required.

use axum::{
  Json,
  extract::{Path, State},
};
use chatsync_core::store::MessageStore;
use chatsync_engine::ChatProvider;
use serde_json::{Value, json};

use crate::{AppState, error::ApiResult, session::SessionId, success};

/// `GET /subscriptions`
pub async fn list<S, P>(
  State(state): State<AppState<S, P>>,
  session: SessionId,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let session = session.required()?;
  let chats = state.engine.subscriptions(session);
  Ok(success(json!({ "session": session, "chats": chats })))
}

/// `POST /subscriptions/{chat}`
pub async fn subscribe<S, P>(
  State(state): State<AppState<S, P>>,
  session: SessionId,
  Path(chat): Path<String>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let added = state.engine.subscribe(session.required()?, &chat)?;
  Ok(success(json!({ "chat": chat, "subscribed": true, "added": added })))
}

/// `DELETE /subscriptions/{chat}`
pub async fn unsubscribe<S, P>(
  State(state): State<AppState<S, P>>,
  session: SessionId,
  Path(chat): Path<String>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let removed = state.engine.unsubscribe(session.required()?, &chat)?;
  Ok(success(json!({ "chat": chat, "subscribed": false, "removed": removed })))
}
