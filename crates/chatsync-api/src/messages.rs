//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/messages/send`    | Body: [`SendRequest`]; subscribes the caller to the recipient |
//! | `GET`  | `/messages/history` | `?chat` required; optional `count`, `before_message_id` |
//! | `GET`  | `/messages/unread`  | optional `chat`, `count` |
//! | `POST` | `/messages/read`    | Body: `{"chat": "..."}` |
//! | `GET`  | `/messages/stats`   | optional `chat` |

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use chatsync_core::store::MessageStore;
use chatsync_engine::{ChatProvider, SendRequest};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiResult, session::SessionId, success};

// ─── Send ────────────────────────────────────────────────────────────────────

/// `POST /messages/send`
pub async fn send<S, P>(
  State(state): State<AppState<S, P>>,
  session: SessionId,
  body: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Json(request) = body?;
  let outcome = state.engine.send(session.as_deref(), request).await?;
  Ok(success(outcome))
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default)]
  pub chat:              String,
  /// Page size; defaults to 50, capped at 100.
  pub count:             Option<i64>,
  /// Return the page strictly older than this message.
  pub before_message_id: Option<String>,
}

/// `GET /messages/history?chat=<jid>[&count=..][&before_message_id=..]`
pub async fn history<S, P>(
  State(state): State<AppState<S, P>>,
  params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Query(params) = params?;
  let page = state
    .engine
    .history(&params.chat, params.count, params.before_message_id.as_deref())
    .await?;
  Ok(success(page))
}

// ─── Unread ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UnreadParams {
  pub chat:  Option<String>,
  pub count: Option<i64>,
}

/// `GET /messages/unread[?chat=<jid>][&count=..]`
pub async fn unread<S, P>(
  State(state): State<AppState<S, P>>,
  params: Result<Query<UnreadParams>, QueryRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Query(params) = params?;
  let messages = state.engine.unread(params.chat.as_deref(), params.count).await?;
  Ok(success(json!({ "count": messages.len(), "messages": messages })))
}

// ─── Mark as read ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
  #[serde(default)]
  pub chat: String,
}

/// `POST /messages/read`
pub async fn mark_read<S, P>(
  State(state): State<AppState<S, P>>,
  body: Result<Json<MarkReadBody>, JsonRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Json(body) = body?;
  let marked = state.engine.mark_read(&body.chat).await?;
  Ok(success(json!({ "chat": body.chat, "marked": marked })))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  pub chat: Option<String>,
}

/// `GET /messages/stats[?chat=<jid>]`
pub async fn stats<S, P>(
  State(state): State<AppState<S, P>>,
  params: Result<Query<StatsParams>, QueryRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Query(params) = params?;
  Ok(success(state.engine.stats(params.chat.as_deref()).await?))
}
