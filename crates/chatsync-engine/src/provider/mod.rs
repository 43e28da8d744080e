//! The chat network seen from the engine: dial, send, ask for history,
//! check registrations. Inbound traffic does not go through this trait; it
//! arrives as [`ChatEvent`](chatsync_core::event::ChatEvent)s on the
//! pipeline's queue.

mod bridge;
mod mock;

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bridge::{BridgeConfig, BridgeProvider};
pub use mock::{MockProvider, SentMessage};

#[derive(Debug, Error)]
pub enum ProviderError {
  /// The network does not know the addressee.
  #[error("invalid recipient: {0}")]
  InvalidRecipient(String),

  /// The provider answered but refused the request.
  #[error("rejected: {0}")]
  Rejected(String),

  #[error("transport error: {0}")]
  Http(#[from] reqwest::Error),
}

/// What the network assigned to an accepted outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
  pub message_id: String,
  /// Seconds since the epoch, provider clock.
  pub timestamp:  i64,
}

/// Registration status of one phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
  /// The number this entry answers for.
  pub phone:         String,
  pub is_registered: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub jid:           Option<String>,
}

pub trait ChatProvider: Send + Sync {
  /// Open the connection. Progress (QR codes, login) is reported through
  /// events, not through the return value.
  fn connect(&self) -> impl Future<Output = Result<(), ProviderError>> + Send + '_;

  fn send_text<'a>(
    &'a self,
    to: &'a str,
    text: &'a str,
    quoted_message_id: Option<&'a str>,
  ) -> impl Future<Output = Result<SendReceipt, ProviderError>> + Send + 'a;

  /// Ask the network to replay recent history. The replay itself arrives
  /// later as a history-sync event.
  fn request_history_sync(
    &self,
  ) -> impl Future<Output = Result<(), ProviderError>> + Send + '_;

  fn check_registered<'a>(
    &'a self,
    phones: &'a [String],
  ) -> impl Future<Output = Result<Vec<Registration>, ProviderError>> + Send + 'a;
}
