//! Provider event payloads → [`NewMessage`] records.

use chatsync_core::{
  event::{Conversation, HistoryMessage, IncomingMessage, MessageContent},
  message::{NewMessage, SELF_SENDER},
};

/// Plain text of a message body plus the id of the message it quotes.
///
/// A plain conversation body wins over an extended-text body; only the
/// extended form can carry a quote.
pub fn extract_text(content: Option<&MessageContent>) -> (String, Option<String>) {
  let Some(content) = content else {
    return (String::new(), None);
  };
  if let Some(text) = content.conversation.as_deref().filter(|t| !t.is_empty()) {
    return (text.to_owned(), None);
  }
  match &content.extended_text {
    Some(ext) => {
      let quoted = ext
        .context_info
        .as_ref()
        .and_then(|c| c.stanza_id.clone())
        .filter(|id| !id.is_empty());
      (ext.text.clone().unwrap_or_default(), quoted)
    }
    None => (String::new(), None),
  }
}

/// Normalise a live message. `None` when routing info is missing.
pub fn live_message(incoming: &IncomingMessage) -> Option<NewMessage> {
  let info = &incoming.info;
  if info.id.is_empty() || info.chat.is_empty() {
    return None;
  }
  let (text, quoted_message_id) = extract_text(incoming.message.as_ref());
  let from = if info.from_me { SELF_SENDER.to_owned() } else { info.sender.clone() };
  let to = info.from_me.then(|| info.chat.clone());
  Some(NewMessage {
    id: info.id.clone(),
    chat: info.chat.clone(),
    from,
    to,
    text,
    timestamp: info.timestamp,
    quoted_message_id,
  })
}

/// Normalise one replayed entry of `conversation`. `None` for entries without
/// a body, a key or a message id.
pub fn history_message(conversation: &Conversation, entry: &HistoryMessage) -> Option<NewMessage> {
  let content = entry.message.as_ref()?;
  let key = entry.key.as_ref()?;
  let id = key.id.as_deref().filter(|id| !id.is_empty())?;
  if conversation.id.is_empty() {
    return None;
  }
  let timestamp = i64::try_from(entry.timestamp.unwrap_or_default()).ok()?;

  let (from, to) = if key.from_me {
    (
      SELF_SENDER.to_owned(),
      Some(key.remote_jid.clone().unwrap_or_else(|| conversation.id.clone())),
    )
  } else {
    let from = key
      .participant
      .clone()
      .filter(|p| !p.is_empty())
      .or_else(|| key.remote_jid.clone())
      .unwrap_or_else(|| conversation.id.clone());
    (from, None)
  };

  let (text, quoted_message_id) = extract_text(Some(content));
  Some(NewMessage {
    id: id.to_owned(),
    chat: conversation.id.clone(),
    from,
    to,
    text,
    timestamp,
    quoted_message_id,
  })
}

/// Every usable entry of `conversation`, plus how many were skipped.
pub fn conversation_messages(conversation: &Conversation) -> (Vec<NewMessage>, usize) {
  let mut skipped = 0;
  let messages = conversation
    .messages
    .iter()
    .filter_map(|entry| {
      let m = history_message(conversation, entry);
      if m.is_none() {
        skipped += 1;
      }
      m
    })
    .collect();
  (messages, skipped)
}
