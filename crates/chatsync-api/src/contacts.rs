//! `POST /contacts/check` with body `{"phones": ["+1 555 ...", ...]}`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use chatsync_core::store::MessageStore;
use chatsync_engine::ChatProvider;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiResult, success};

#[derive(Debug, Deserialize)]
pub struct CheckBody {
  #[serde(default)]
  pub phones: Vec<String>,
}

pub async fn check<S, P>(
  State(state): State<AppState<S, P>>,
  body: Result<Json<CheckBody>, JsonRejection>,
) -> ApiResult<Json<Value>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let Json(body) = body?;
  let results = state.engine.check_registered(&body.phones).await?;
  Ok(success(json!({ "results": results })))
}
