//! `POST /events`: provider webhook. The typed event is queued for the
//! ingestion loop and acknowledged with `202 Accepted`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
};
use chatsync_core::{event::ChatEvent, store::MessageStore};
use chatsync_engine::ChatProvider;
use serde_json::{Value, json};
use tracing::debug;

use crate::{
  AppState,
  error::{ApiError, ApiResult},
  success,
};

pub async fn ingest<S, P>(
  State(state): State<AppState<S, P>>,
  body: Result<Json<ChatEvent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Json(event) = body?;
  let kind = event.kind();
  state
    .events
    .send(event)
    .await
    .map_err(|_| ApiError::QueueClosed)?;
  debug!(kind, "provider event queued");
  Ok((StatusCode::ACCEPTED, success(json!({ "queued": kind }))))
}
