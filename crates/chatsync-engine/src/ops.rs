//! What a session can ask of the engine: send, read, subscribe, and inspect
//! the connection.
//!
//! Reads only need an owner identity to be known, so stored history stays
//! browsable during a transient disconnect. Sends and registration checks
//! need a live login.

use chatsync_core::{
  Error, Result,
  connection::ConnectionState,
  message::{
    HistoryQuery, Message, NewMessage, SELF_SENDER, clamp_limit, normalize_phone,
    validate_address,
  },
  store::MessageStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  dispatch::Notifier,
  ingest::{Pipeline, bounded},
  provider::{ChatProvider, ProviderError, Registration},
};

// ─── Request / response types ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
  #[serde(default)]
  pub to:                String,
  #[serde(default)]
  pub text:              String,
  #[serde(default)]
  pub quoted_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
  pub message_id:        String,
  pub timestamp:         i64,
  pub to:                String,
  pub text:              String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quoted_message_id: Option<String>,
  /// Whether the local copy was written. The send itself succeeded either
  /// way.
  pub stored:            bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
  pub chat:     String,
  pub messages: Vec<Message>,
  pub count:    usize,
  /// `true` when the page came back full. A chat with exactly one page
  /// left reports `true` once more than it should.
  pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
  pub total:      usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub chat:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub chat_total: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
  pub state:       ConnectionState,
  pub logged_in:   bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub identity:    Option<String>,
  pub has_qr_code: bool,
}

/// Answer to a pairing-code request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Pairing {
  LoggedIn { identity: String },
  Pending { qr_code: String },
  /// Connecting, but the network has not issued a code yet.
  Waiting,
}

fn required<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::MissingParameter(name));
  }
  Ok(value)
}

fn send_error(e: ProviderError) -> Error {
  match e {
    ProviderError::InvalidRecipient(to) => Error::InvalidRecipient(to),
    other => Error::SendFailed(other.to_string()),
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

impl<S, P, N> Pipeline<S, P, N>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
  N: Notifier + 'static,
{
  pub fn status(&self) -> Status {
    let connection = self.connection.lock();
    Status {
      state:       connection.state(),
      logged_in:   connection.is_logged_in(),
      identity:    connection.identity().map(str::to_owned),
      has_qr_code: connection.qr_code().is_some(),
    }
  }

  /// Dial the provider unless a connection is already up or in progress.
  pub async fn connect(&self) -> Result<ConnectionState> {
    let dial = self.connection.lock().request_connect();
    if dial {
      info!("connecting to provider");
      if let Err(e) = self.provider.connect().await {
        self.connection.lock().connect_failed();
        warn!(error = %e, "provider connect failed");
        return Err(Error::ConnectFailed(e.to_string()));
      }
    }
    let state = self.connection.lock().state();
    Ok(state)
  }

  fn pairing(&self) -> Option<Pairing> {
    let connection = self.connection.lock();
    if let (true, Some(identity)) = (connection.is_logged_in(), connection.identity()) {
      return Some(Pairing::LoggedIn { identity: identity.to_owned() });
    }
    connection
      .qr_code()
      .map(|code| Pairing::Pending { qr_code: code.to_owned() })
  }

  /// The current pairing code, connecting first if needed.
  pub async fn qr_code(&self) -> Result<Pairing> {
    if let Some(pairing) = self.pairing() {
      return Ok(pairing);
    }
    self.connect().await?;
    Ok(self.pairing().unwrap_or(Pairing::Waiting))
  }

  /// Send a text message and keep a local copy.
  ///
  /// The calling session, if any, is subscribed to the recipient's chat. A
  /// failed local write is logged and reported through
  /// [`SendOutcome::stored`]; it does not undo the send.
  pub async fn send(&self, session: Option<&str>, request: SendRequest) -> Result<SendOutcome> {
    let owner = self.connection.lock().owner()?.to_owned();

    let to = required(&request.to, "to")?.to_owned();
    if request.text.is_empty() {
      return Err(Error::MissingParameter("text"));
    }
    validate_address(&to)?;
    let quoted = request.quoted_message_id.filter(|id| !id.is_empty());

    let receipt = self
      .provider
      .send_text(&to, &request.text, quoted.as_deref())
      .await
      .map_err(send_error)?;
    info!(message_id = %receipt.message_id, to = %to, "message sent");

    let message = NewMessage {
      id:                receipt.message_id.clone(),
      chat:              to.clone(),
      from:              SELF_SENDER.to_owned(),
      to:                Some(to.clone()),
      text:              request.text,
      timestamp:         receipt.timestamp,
      quoted_message_id: quoted,
    };
    let stored =
      match bounded(self.config.write_timeout(), self.store.save_message(&owner, &message)).await {
        Ok(()) => true,
        Err(e) => {
          warn!(message_id = %message.id, error = %e, "sent message was not stored");
          false
        }
      };

    if let Some(session) = session {
      if self.registry().subscribe(session, &to) {
        debug!(session, chat = %to, "session subscribed by send");
      }
    }

    Ok(SendOutcome {
      message_id: message.id,
      timestamp: message.timestamp,
      to,
      text: message.text,
      quoted_message_id: message.quoted_message_id,
      stored,
    })
  }

  /// A page of one chat's history, oldest first.
  pub async fn history(
    &self,
    chat: &str,
    count: Option<i64>,
    before_message_id: Option<&str>,
  ) -> Result<HistoryPage> {
    let owner = self.connection.lock().known_owner()?.to_owned();
    let chat = required(chat, "chat")?;
    let limit = clamp_limit(count);

    let mut query = HistoryQuery::latest(chat, limit);
    if let Some(before) = before_message_id.filter(|id| !id.is_empty()) {
      query = query.before(before);
    }
    let messages =
      bounded(self.config.read_timeout(), self.store.get_chat_messages(&owner, &query))
        .await
        .inspect_err(|e| warn!(chat, error = %e, "failed to read chat history"))?;

    Ok(HistoryPage {
      chat:     chat.to_owned(),
      count:    messages.len(),
      has_more: messages.len() == limit,
      messages,
    })
  }

  /// Unread inbound messages with some text, optionally for one chat.
  pub async fn unread(&self, chat: Option<&str>, count: Option<i64>) -> Result<Vec<Message>> {
    let owner = self.connection.lock().known_owner()?.to_owned();
    let chat = chat.map(str::trim).filter(|c| !c.is_empty());
    let limit = clamp_limit(count);

    let messages = bounded(
      self.config.read_timeout(),
      self.store.get_unread_messages(&owner, chat, limit),
    )
    .await
    .inspect_err(|e| warn!(?chat, error = %e, "failed to read unread messages"))?;
    Ok(messages.into_iter().filter(|m| !m.text.trim().is_empty()).collect())
  }

  /// Mark every unread message of `chat` as read. Returns how many changed.
  pub async fn mark_read(&self, chat: &str) -> Result<u64> {
    let owner = self.connection.lock().known_owner()?.to_owned();
    let chat = required(chat, "chat")?;
    let changed =
      bounded(self.config.read_timeout(), self.store.mark_messages_as_read(&owner, chat))
        .await
        .inspect_err(|e| warn!(chat, error = %e, "failed to mark messages as read"))?;
    debug!(chat, changed, "messages marked as read");
    Ok(changed)
  }

  pub async fn stats(&self, chat: Option<&str>) -> Result<Stats> {
    let owner = self.connection.lock().known_owner()?.to_owned();
    let chat = chat.map(str::trim).filter(|c| !c.is_empty());

    let total = bounded(self.config.read_timeout(), self.store.get_all_messages(&owner))
      .await
      .inspect_err(|e| warn!(error = %e, "failed to count messages"))?
      .len();
    let chat_total = match chat {
      Some(chat) => Some(
        bounded(self.config.read_timeout(), self.store.count_chat_messages(&owner, chat))
          .await
          .inspect_err(|e| warn!(chat, error = %e, "failed to count chat messages"))?,
      ),
      None => None,
    };
    Ok(Stats { total, chat: chat.map(str::to_owned), chat_total })
  }

  /// Which of `phones` have an account on the network.
  ///
  /// Answers one entry per input, in order, echoing the phone as given.
  /// Entries with no digits left after normalisation are reported as not
  /// registered without asking the provider.
  pub async fn check_registered(&self, phones: &[String]) -> Result<Vec<Registration>> {
    self.connection.lock().owner()?;
    let normalized: Vec<String> = phones.iter().map(|p| normalize_phone(p)).collect();
    let lookup: Vec<String> = normalized.iter().filter(|p| !p.is_empty()).cloned().collect();
    if lookup.is_empty() {
      return Err(Error::MissingParameter("phones"));
    }
    let mut found = self
      .provider
      .check_registered(&lookup)
      .await
      .map_err(|e| Error::CheckFailed(e.to_string()))?
      .into_iter();

    let mut results = Vec::with_capacity(phones.len());
    for (phone, clean) in phones.iter().zip(&normalized) {
      let answer = if clean.is_empty() { None } else { found.next() };
      results.push(match answer {
        Some(r) => Registration { phone: phone.clone(), ..r },
        None => Registration { phone: phone.clone(), is_registered: false, jid: None },
      });
    }
    Ok(results)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Follow `chat` from `session`. Returns `false` if it already did.
  pub fn subscribe(&self, session: &str, chat: &str) -> Result<bool> {
    let session = required(session, "session")?;
    let chat = required(chat, "chat")?;
    Ok(self.registry().subscribe(session, chat))
  }

  pub fn unsubscribe(&self, session: &str, chat: &str) -> Result<bool> {
    let session = required(session, "session")?;
    let chat = required(chat, "chat")?;
    Ok(self.registry().unsubscribe(session, chat))
  }

  pub fn subscriptions(&self, session: &str) -> Vec<String> {
    self.registry().session_subscriptions(session).into_iter().collect()
  }

  /// Forget everything about a session that went away.
  pub fn end_session(&self, session: &str) {
    let dropped = self.registry().cleanup_session(session);
    debug!(session, dropped, "session ended");
  }
}
