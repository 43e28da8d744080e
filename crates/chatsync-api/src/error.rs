//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as
//! `{"success": false, "error": {"code": ..., "message": ..., "details"?: ...}}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chatsync_core::{Error, ErrorCode};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] Error),

  /// The request body or query string could not be decoded.
  #[error("malformed request: {0}")]
  Malformed(String),

  /// The ingestion loop has stopped and cannot take events.
  #[error("event queue is closed")]
  QueueClosed,
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::Malformed(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::Malformed(r.body_text()) }
}

impl ApiError {
  pub fn code(&self) -> &'static str {
    match self {
      Self::Engine(e) => e.code().as_str(),
      Self::Malformed(_) => ErrorCode::InvalidParameters.as_str(),
      Self::QueueClosed => "INGESTION_UNAVAILABLE",
    }
  }

  pub fn status(&self) -> StatusCode {
    let code = match self {
      Self::Engine(e) => e.code(),
      Self::Malformed(_) => return StatusCode::BAD_REQUEST,
      Self::QueueClosed => return StatusCode::SERVICE_UNAVAILABLE,
    };
    match code {
      ErrorCode::NotLoggedIn => StatusCode::UNAUTHORIZED,
      ErrorCode::MissingParameters | ErrorCode::InvalidParameters => StatusCode::BAD_REQUEST,
      ErrorCode::InvalidRecipient => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorCode::SendFailed | ErrorCode::CheckFailed | ErrorCode::ConnectFailed => {
        StatusCode::BAD_GATEWAY
      }
      ErrorCode::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
  }

  fn details(&self) -> Option<Value> {
    match self {
      Self::Engine(Error::MissingParameter(name)) => Some(json!({ "parameter": name })),
      Self::Engine(Error::InvalidRecipient(to)) => Some(json!({ "recipient": to })),
      _ => None,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let mut error = json!({ "code": self.code(), "message": self.to_string() });
    if let Some(details) = self.details() {
      error["details"] = details;
    }
    (self.status(), Json(json!({ "success": false, "error": error }))).into_response()
  }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_codes() {
    assert_eq!(ApiError::from(Error::NotAuthenticated).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      ApiError::from(Error::MissingParameter("chat")).status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ApiError::from(Error::InvalidRecipient("x".into())).status(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      ApiError::from(Error::SendFailed("boom".into())).status(),
      StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      ApiError::from(Error::StorageTimeout(std::time::Duration::from_secs(1))).status(),
      StatusCode::SERVICE_UNAVAILABLE
    );
  }

  #[test]
  fn missing_parameter_names_the_field() {
    let err = ApiError::from(Error::MissingParameter("chat"));
    assert_eq!(err.code(), "MISSING_PARAMETERS");
    assert_eq!(err.details(), Some(json!({ "parameter": "chat" })));
  }
}
