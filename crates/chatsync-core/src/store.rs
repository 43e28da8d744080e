//! The `MessageStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `chatsync-store-sqlite`).
//! The ingestion engine and the tool surface depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::message::{HistoryQuery, Message, NewMessage};

/// Abstraction over a durable message store.
///
/// Every operation is scoped to one owner identity; rows of different owners
/// never mix. Writes are idempotent upserts keyed by `(owner, message id)`,
/// so the same event may be saved any number of times from concurrent tasks.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait MessageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or update a message.
  ///
  /// `is_from_me` is derived from the sender; `is_read` is forced to `true`
  /// for outbound messages and otherwise never moves from `true` back to
  /// `false`.
  fn save_message<'a>(
    &'a self,
    owner: &'a str,
    message: &'a NewMessage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Flip every unread message of `chat` to read. Returns the number of rows
  /// that changed.
  fn mark_messages_as_read<'a>(
    &'a self,
    owner: &'a str,
    chat: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Purge messages first stored more than `retention_days` ago. Returns the
  /// number of rows deleted.
  fn delete_old_messages<'a>(
    &'a self,
    owner: &'a str,
    retention_days: u32,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Up to `query.limit` messages of one chat, oldest first.
  ///
  /// Without a cursor this is the most recent page; with
  /// `before_message_id` it is the page strictly older (by timestamp) than
  /// that message.
  fn get_chat_messages<'a>(
    &'a self,
    owner: &'a str,
    query: &'a HistoryQuery,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// The most recent `limit` unread inbound messages, optionally restricted
  /// to one chat, oldest first.
  fn get_unread_messages<'a>(
    &'a self,
    owner: &'a str,
    chat: Option<&'a str>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Every message of the owner, newest first. Unbounded; meant for
  /// diagnostics only.
  fn get_all_messages<'a>(
    &'a self,
    owner: &'a str,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Exact number of messages stored for one chat.
  fn count_chat_messages<'a>(
    &'a self,
    owner: &'a str,
    chat: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
