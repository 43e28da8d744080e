//! Handlers for connection status and pairing.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/status`  | state, login flag, identity |
//! | `POST` | `/connect` | idempotent; returns the state after the request |
//! | `GET`  | `/qr`      | pairing code, connecting first if needed |

use axum::{Json, extract::State};
use chatsync_core::store::MessageStore;
use chatsync_engine::ChatProvider;
use serde_json::{Value, json};

use crate::{AppState, error::ApiResult, success};

pub async fn status<S, P>(State(state): State<AppState<S, P>>) -> Json<Value>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  success(state.engine.status())
}

pub async fn connect<S, P>(State(state): State<AppState<S, P>>) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let now = state.engine.connect().await?;
  Ok(success(json!({ "state": now })))
}

pub async fn qr<S, P>(State(state): State<AppState<S, P>>) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  Ok(success(state.engine.qr_code().await?))
}
