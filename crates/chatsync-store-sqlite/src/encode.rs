//! Encoding helpers between domain types and SQLite columns.
//!
//! Timestamps of our own bookkeeping (`created_at`, `updated_at`) are stored
//! as RFC 3339 strings with a fixed microsecond precision, so string
//! comparison in SQL matches chronological order. Booleans are integers.

use chrono::{DateTime, SecondsFormat, Utc};
use chatsync_core::message::Message;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by every message query, in order.
pub const MESSAGE_COLUMNS: &str = "message_id, chat_id, sender_id, recipient_id, text, \
                                   timestamp, quoted_message_id, is_from_me, is_read";

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:        String,
  pub chat_id:           String,
  pub sender_id:         String,
  pub recipient_id:      Option<String>,
  pub text:              String,
  pub timestamp:         i64,
  pub quoted_message_id: Option<String>,
  pub is_from_me:        bool,
  pub is_read:           bool,
}

impl RawMessage {
  /// Map a row selected with [`MESSAGE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:        row.get(0)?,
      chat_id:           row.get(1)?,
      sender_id:         row.get(2)?,
      recipient_id:      row.get(3)?,
      text:              row.get(4)?,
      timestamp:         row.get(5)?,
      quoted_message_id: row.get(6)?,
      is_from_me:        row.get(7)?,
      is_read:           row.get(8)?,
    })
  }

  pub fn into_message(self) -> Message {
    Message {
      id:                self.message_id,
      chat:              self.chat_id,
      from:              self.sender_id,
      to:                self.recipient_id,
      text:              self.text,
      timestamp:         self.timestamp,
      quoted_message_id: self.quoted_message_id,
      is_from_me:        self.is_from_me,
      is_read:           self.is_read,
    }
  }
}

/// Convert a newest-first result set into the oldest-first order callers
/// expect.
pub fn oldest_first(mut raws: Vec<RawMessage>) -> Vec<Message> {
  raws.reverse();
  raws.into_iter().map(RawMessage::into_message).collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let c = a + chrono::Duration::days(400);
    let (ea, eb, ec) = (encode_dt(a), encode_dt(b), encode_dt(c));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb && eb < ec);
    assert!(ea.ends_with('Z'));
  }
}
