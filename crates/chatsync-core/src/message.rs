//! The message record, the unit stored by a [`MessageStore`].
//!
//! A record is keyed by `(owner identity, message id)`. Direction is derived
//! from the sender: anything authored by [`SELF_SENDER`] is outbound and is
//! always considered read.
//!
//! [`MessageStore`]: crate::store::MessageStore

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Sender value marking a message authored by the owner identity.
pub const SELF_SENDER: &str = "self";

/// Page size used when a caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller may request; larger requests are clamped.
pub const MAX_PAGE_SIZE: usize = 100;

// ─── Input ───────────────────────────────────────────────────────────────────

/// A normalised message ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
  pub id:                String,
  pub chat:              String,
  pub from:              String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub to:                Option<String>,
  pub text:              String,
  /// Seconds since the epoch, provider clock.
  pub timestamp:         i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quoted_message_id: Option<String>,
}

impl NewMessage {
  pub fn is_from_me(&self) -> bool { self.from == SELF_SENDER }

  /// Outbound messages are read from the moment they exist.
  pub fn initial_read_state(&self) -> bool { self.is_from_me() }
}

// ─── Stored record ───────────────────────────────────────────────────────────

/// A message as returned by store queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:                String,
  pub chat:              String,
  pub from:              String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub to:                Option<String>,
  pub text:              String,
  pub timestamp:         i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quoted_message_id: Option<String>,
  pub is_from_me:        bool,
  pub is_read:           bool,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`MessageStore::get_chat_messages`].
///
/// [`MessageStore::get_chat_messages`]: crate::store::MessageStore::get_chat_messages
#[derive(Debug, Clone)]
pub struct HistoryQuery {
  pub chat:              String,
  pub limit:             usize,
  /// Only return messages strictly older than this one.
  pub before_message_id: Option<String>,
}

impl HistoryQuery {
  pub fn latest(chat: impl Into<String>, limit: usize) -> Self {
    Self { chat: chat.into(), limit, before_message_id: None }
  }

  pub fn before(mut self, message_id: impl Into<String>) -> Self {
    self.before_message_id = Some(message_id.into());
    self
  }
}

/// Resolve a caller-supplied page size: absent or non-positive values fall
/// back to [`DEFAULT_PAGE_SIZE`], oversized ones are capped at
/// [`MAX_PAGE_SIZE`].
pub fn clamp_limit(requested: Option<i64>) -> usize {
  match requested {
    Some(n) if n > 0 => (n as usize).min(MAX_PAGE_SIZE),
    _ => DEFAULT_PAGE_SIZE,
  }
}

/// Validate a chat or recipient address of the form `user@server`.
pub fn validate_address(address: &str) -> Result<()> {
  match address.split_once('@') {
    Some((user, server))
      if !user.is_empty() && !server.is_empty() && !server.contains('@') =>
    {
      Ok(())
    }
    _ => Err(Error::InvalidRecipient(address.to_owned())),
  }
}

/// Strip the punctuation people type into phone numbers.
pub fn normalize_phone(phone: &str) -> String {
  phone
    .chars()
    .filter(|c| !matches!(c, '+' | ' ' | '-'))
    .collect()
}
