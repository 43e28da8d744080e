//! Error type for `chatsync-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("invalid query: {0}")]
  InvalidQuery(String),
}

impl From<Error> for chatsync_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::InvalidQuery(msg) => chatsync_core::Error::InvalidInput(msg),
      other => chatsync_core::Error::storage(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
