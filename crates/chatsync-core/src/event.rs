//! Typed events delivered by the chat provider.
//!
//! The shapes follow what a multi-device chat client emits: a live message
//! carries routing info plus a content body; a history sync carries whole
//! conversations of raw web-message entries, any of which may be incomplete.
//! Every type is serde-friendly so events can cross a process boundary as
//! JSON (`{"type": "message", ...}`).

use serde::{Deserialize, Serialize};

// ─── Content ─────────────────────────────────────────────────────────────────

/// Reference from a reply to the message it quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
  /// Id of the quoted message.
  #[serde(default)]
  pub stanza_id: Option<String>,
}

/// Text sent with formatting or a quoted-reply context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedText {
  #[serde(default)]
  pub text:         Option<String>,
  #[serde(default)]
  pub context_info: Option<ContextInfo>,
}

/// The body of a message. Only the text-bearing parts are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
  /// Plain text body.
  #[serde(default)]
  pub conversation:  Option<String>,
  #[serde(default)]
  pub extended_text: Option<ExtendedText>,
}

// ─── Live messages ───────────────────────────────────────────────────────────

/// Routing metadata of a live message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
  pub id:        String,
  pub chat:      String,
  pub sender:    String,
  #[serde(default)]
  pub from_me:   bool,
  /// Seconds since the epoch, provider clock.
  pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
  pub info:    MessageInfo,
  #[serde(default)]
  pub message: Option<MessageContent>,
}

// ─── History sync ────────────────────────────────────────────────────────────

/// Addressing key of a historical message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
  #[serde(default)]
  pub id:          Option<String>,
  #[serde(default)]
  pub remote_jid:  Option<String>,
  #[serde(default)]
  pub from_me:     bool,
  /// Group member who authored the message, when the chat is a group.
  #[serde(default)]
  pub participant: Option<String>,
}

/// One replayed message. Every field is optional because replays are
/// routinely partial; incomplete entries are skipped during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
  #[serde(default)]
  pub key:       Option<MessageKey>,
  #[serde(default)]
  pub timestamp: Option<u64>,
  #[serde(default)]
  pub message:   Option<MessageContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
  pub id:       String,
  #[serde(default)]
  pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySync {
  #[serde(default)]
  pub conversations: Vec<Conversation>,
}

impl HistorySync {
  pub fn message_count(&self) -> usize {
    self.conversations.iter().map(|c| c.messages.len()).sum()
  }
}

// ─── Receipts ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
  Delivered,
  Read,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// Everything the provider can tell us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
  Message(IncomingMessage),
  /// Pairing codes, freshest first.
  Qr { codes: Vec<String> },
  /// Transport is up. `identity` is set when a previously paired device
  /// session was restored.
  Connected {
    #[serde(default)]
    identity: Option<String>,
  },
  Disconnected,
  LoggedOut,
  PairSuccess { identity: String },
  HistorySync(HistorySync),
  /// The other side received or read messages we sent.
  Receipt {
    chat:        String,
    message_ids: Vec<String>,
    status:      DeliveryStatus,
  },
}

impl ChatEvent {
  /// Short name for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Message(_) => "message",
      Self::Qr { .. } => "qr",
      Self::Connected { .. } => "connected",
      Self::Disconnected => "disconnected",
      Self::LoggedOut => "logged_out",
      Self::PairSuccess { .. } => "pair_success",
      Self::HistorySync(_) => "history_sync",
      Self::Receipt { .. } => "receipt",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_event_from_json() {
    let raw = r#"{
      "type": "message",
      "info": {
        "id": "ABC",
        "chat": "1555@s.whatsapp.net",
        "sender": "1555@s.whatsapp.net",
        "timestamp": 1700000000
      },
      "message": { "conversation": "hello" }
    }"#;
    let event: ChatEvent = serde_json::from_str(raw).unwrap();
    let ChatEvent::Message(msg) = event else {
      panic!("expected a message event");
    };
    assert_eq!(msg.info.id, "ABC");
    assert!(!msg.info.from_me);
    assert_eq!(
      msg.message.unwrap().conversation.as_deref(),
      Some("hello")
    );
  }

  #[test]
  fn unit_and_struct_events_from_json() {
    let e: ChatEvent = serde_json::from_str(r#"{"type":"disconnected"}"#).unwrap();
    assert_eq!(e, ChatEvent::Disconnected);

    let e: ChatEvent = serde_json::from_str(r#"{"type":"connected"}"#).unwrap();
    assert_eq!(e, ChatEvent::Connected { identity: None });

    let e: ChatEvent =
      serde_json::from_str(r#"{"type":"pair_success","identity":"me@s.whatsapp.net"}"#)
        .unwrap();
    assert_eq!(e.kind(), "pair_success");
  }

  #[test]
  fn receipt_from_json() {
    let raw = r#"{"type":"receipt","chat":"1555@s.whatsapp.net","message_ids":["A","B"],"status":"read"}"#;
    let ChatEvent::Receipt { message_ids, status, .. } = serde_json::from_str::<ChatEvent>(raw).unwrap()
    else {
      panic!("expected a receipt");
    };
    assert_eq!(message_ids, vec!["A", "B"]);
    assert_eq!(status, DeliveryStatus::Read);
  }

  #[test]
  fn partial_history_entries_parse() {
    let raw = r#"{
      "type": "history_sync",
      "conversations": [
        { "id": "1555@s.whatsapp.net", "messages": [ {}, { "key": { "id": "X" } } ] }
      ]
    }"#;
    let ChatEvent::HistorySync(sync) = serde_json::from_str::<ChatEvent>(raw).unwrap() else {
      panic!("expected a history sync");
    };
    assert_eq!(sync.message_count(), 2);
    assert!(sync.conversations[0].messages[0].key.is_none());
  }
}
