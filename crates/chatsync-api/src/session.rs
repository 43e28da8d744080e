//! Caller session identification.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use chatsync_core::Error;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// The `x-session-id` of the request, if it sent a non-blank one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionId(pub Option<String>);

impl SessionId {
  pub fn as_deref(&self) -> Option<&str> { self.0.as_deref() }

  /// The session id, or a missing-parameter error for routes that only make
  /// sense per session.
  pub fn required(&self) -> Result<&str, Error> {
    self.as_deref().ok_or(Error::MissingParameter(SESSION_HEADER))
  }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(SESSION_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(str::to_owned);
    Ok(Self(id))
  }
}
