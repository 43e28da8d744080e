//! [`SqliteStore`], the SQLite implementation of [`MessageStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use chatsync_core::{
  message::{HistoryQuery, Message, NewMessage},
  store::MessageStore,
};
use tracing::debug;

use crate::{
  encode::{MESSAGE_COLUMNS, RawMessage, encode_dt, oldest_first},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A message store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// statement runs on the connection's own thread, so each call is atomic with
/// respect to every other call, whichever task issued it.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a message-returning query on the connection thread.
  async fn query_messages(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<RawMessage>> {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

fn check_limit(limit: usize) -> Result<i64> {
  if limit == 0 {
    return Err(Error::InvalidQuery("limit must be positive".into()));
  }
  Ok(limit as i64)
}

// ─── MessageStore impl ───────────────────────────────────────────────────────

impl MessageStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn save_message(&self, owner: &str, message: &NewMessage) -> Result<()> {
    let owner      = owner.to_owned();
    let message    = message.clone();
    let is_from_me = message.is_from_me();
    let is_read    = message.initial_read_state();
    let now        = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             owner_identity, message_id, chat_id, sender_id, recipient_id,
             text, timestamp, message_type, quoted_message_id,
             is_from_me, is_read, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'text', ?8, ?9, ?10, ?11, ?11)
           ON CONFLICT (owner_identity, message_id) DO UPDATE SET
             sender_id    = excluded.sender_id,
             recipient_id = excluded.recipient_id,
             text         = excluded.text,
             is_from_me   = excluded.is_from_me,
             is_read      = MAX(messages.is_read, excluded.is_read),
             updated_at   = excluded.updated_at",
          rusqlite::params![
            owner,
            message.id,
            message.chat,
            message.from,
            message.to,
            message.text,
            message.timestamp,
            message.quoted_message_id,
            is_from_me,
            is_read,
            now,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn mark_messages_as_read(&self, owner: &str, chat: &str) -> Result<u64> {
    let owner = owner.to_owned();
    let chat  = chat.to_owned();
    let now   = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE messages SET is_read = 1, updated_at = ?3
           WHERE owner_identity = ?1 AND chat_id = ?2 AND is_read = 0",
          rusqlite::params![owner, chat, now],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }

  async fn delete_old_messages(&self, owner: &str, retention_days: u32) -> Result<u64> {
    let owner  = owner.to_owned();
    let cutoff = encode_dt(Utc::now() - Duration::days(i64::from(retention_days)));

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM messages WHERE owner_identity = ?1 AND created_at < ?2",
          rusqlite::params![owner, cutoff],
        )?)
      })
      .await?;

    debug!(deleted, retention_days, "purged old messages");
    Ok(deleted as u64)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_chat_messages(
    &self,
    owner: &str,
    query: &HistoryQuery,
  ) -> Result<Vec<Message>> {
    use rusqlite::types::Value;

    let limit = check_limit(query.limit)?;

    let (sql, params) = match &query.before_message_id {
      Some(before) => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE owner_identity = ?1 AND chat_id = ?2 AND timestamp < (
             SELECT timestamp FROM messages
             WHERE owner_identity = ?1 AND message_id = ?3
           )
           ORDER BY timestamp DESC, message_id DESC
           LIMIT ?4"
        ),
        vec![
          Value::Text(owner.to_owned()),
          Value::Text(query.chat.clone()),
          Value::Text(before.clone()),
          Value::Integer(limit),
        ],
      ),
      None => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE owner_identity = ?1 AND chat_id = ?2
           ORDER BY timestamp DESC, message_id DESC
           LIMIT ?3"
        ),
        vec![
          Value::Text(owner.to_owned()),
          Value::Text(query.chat.clone()),
          Value::Integer(limit),
        ],
      ),
    };

    Ok(oldest_first(self.query_messages(sql, params).await?))
  }

  async fn get_unread_messages(
    &self,
    owner: &str,
    chat: Option<&str>,
    limit: usize,
  ) -> Result<Vec<Message>> {
    use rusqlite::types::Value;

    let limit = check_limit(limit)?;

    let (sql, params) = match chat {
      Some(chat) => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE owner_identity = ?1 AND chat_id = ?2
             AND is_read = 0 AND is_from_me = 0
           ORDER BY timestamp DESC, message_id DESC
           LIMIT ?3"
        ),
        vec![
          Value::Text(owner.to_owned()),
          Value::Text(chat.to_owned()),
          Value::Integer(limit),
        ],
      ),
      None => (
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE owner_identity = ?1 AND is_read = 0 AND is_from_me = 0
           ORDER BY timestamp DESC, message_id DESC
           LIMIT ?2"
        ),
        vec![Value::Text(owner.to_owned()), Value::Integer(limit)],
      ),
    };

    Ok(oldest_first(self.query_messages(sql, params).await?))
  }

  async fn get_all_messages(&self, owner: &str) -> Result<Vec<Message>> {
    let sql = format!(
      "SELECT {MESSAGE_COLUMNS} FROM messages
       WHERE owner_identity = ?1
       ORDER BY timestamp DESC, message_id DESC"
    );
    let raws = self
      .query_messages(sql, vec![rusqlite::types::Value::Text(owner.to_owned())])
      .await?;
    Ok(raws.into_iter().map(RawMessage::into_message).collect())
  }

  async fn count_chat_messages(&self, owner: &str, chat: &str) -> Result<u64> {
    let owner = owner.to_owned();
    let chat  = chat.to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM messages WHERE owner_identity = ?1 AND chat_id = ?2",
          rusqlite::params![owner, chat],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }
}
