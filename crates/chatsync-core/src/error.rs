//! Error taxonomy shared by every chatsync layer.
//!
//! Each variant maps to a stable [`ErrorCode`] so callers can branch on the
//! kind of failure without matching on free-text messages.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The operation needs a logged-in session and there is none.
  #[error("client is not authenticated")]
  NotAuthenticated,

  /// A required field was absent or empty.
  #[error("missing parameter: {0}")]
  MissingParameter(&'static str),

  /// A field was present but unusable.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid recipient: {0}")]
  InvalidRecipient(String),

  /// The provider refused or failed to deliver an outbound message.
  #[error("send failed: {0}")]
  SendFailed(String),

  /// The provider could not answer a registration check.
  #[error("registration check failed: {0}")]
  CheckFailed(String),

  #[error("could not connect to provider: {0}")]
  ConnectFailed(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("storage operation timed out after {0:?}")]
  StorageTimeout(Duration),
}

impl Error {
  /// Box any backend error as [`Error::StorageUnavailable`].
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StorageUnavailable(Box::new(e))
  }

  pub fn code(&self) -> ErrorCode {
    match self {
      Self::NotAuthenticated => ErrorCode::NotLoggedIn,
      Self::MissingParameter(_) => ErrorCode::MissingParameters,
      Self::InvalidInput(_) => ErrorCode::InvalidParameters,
      Self::InvalidRecipient(_) => ErrorCode::InvalidRecipient,
      Self::SendFailed(_) => ErrorCode::SendFailed,
      Self::CheckFailed(_) => ErrorCode::CheckFailed,
      Self::ConnectFailed(_) => ErrorCode::ConnectFailed,
      Self::StorageUnavailable(_) | Self::StorageTimeout(_) => {
        ErrorCode::StorageUnavailable
      }
    }
  }
}

/// Machine-readable failure kind, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  NotLoggedIn,
  MissingParameters,
  InvalidParameters,
  InvalidRecipient,
  SendFailed,
  CheckFailed,
  ConnectFailed,
  StorageUnavailable,
}

impl ErrorCode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::NotLoggedIn => "NOT_LOGGED_IN",
      Self::MissingParameters => "MISSING_PARAMETERS",
      Self::InvalidParameters => "INVALID_PARAMETERS",
      Self::InvalidRecipient => "INVALID_RECIPIENT",
      Self::SendFailed => "SEND_FAILED",
      Self::CheckFailed => "CHECK_FAILED",
      Self::ConnectFailed => "CONNECT_FAILED",
      Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
    }
  }
}

impl std::fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
