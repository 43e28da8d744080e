//! Connection and authentication state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──connected──▶ Connected ──pair──▶ LoggedIn
//!                                    └──connected + restored identity──▶ LoggedIn
//! LoggedIn ──disconnected──▶ Disconnected   (identity kept)
//! any      ──logged out───▶ Disconnected   (identity forgotten)
//! ```
//!
//! The value is owned by the ingestion pipeline; transitions are plain
//! methods so the whole machine is testable without a provider.

use serde::Serialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
  #[default]
  Disconnected,
  Connecting,
  /// Transport is up but no account is paired yet.
  Connected,
  LoggedIn,
}

impl ConnectionState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Disconnected => "disconnected",
      Self::Connecting => "connecting",
      Self::Connected => "connected",
      Self::LoggedIn => "logged_in",
    }
  }
}

/// Result of applying a provider event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub state:                ConnectionState,
  /// The caller should ask the provider for a history replay.
  pub request_history_sync: bool,
}

impl Transition {
  fn to(state: ConnectionState) -> Self {
    Self { state, request_history_sync: false }
  }

  fn with_history_sync(state: ConnectionState) -> Self {
    Self { state, request_history_sync: true }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Connection {
  state:    ConnectionState,
  identity: Option<String>,
  qr_code:  Option<String>,
}

impl Connection {
  pub fn new() -> Self { Self::default() }

  /// A machine that remembers a previously paired identity but has not
  /// reconnected yet.
  pub fn with_identity(identity: impl Into<String>) -> Self {
    Self { identity: Some(identity.into()), ..Self::default() }
  }

  pub fn state(&self) -> ConnectionState { self.state }

  pub fn identity(&self) -> Option<&str> { self.identity.as_deref() }

  pub fn qr_code(&self) -> Option<&str> { self.qr_code.as_deref() }

  pub fn is_logged_in(&self) -> bool {
    self.state == ConnectionState::LoggedIn && self.identity.is_some()
  }

  /// The owner identity, but only while logged in. Used to gate ingestion
  /// and outbound sends.
  pub fn owner(&self) -> Result<&str> {
    match (&self.state, &self.identity) {
      (ConnectionState::LoggedIn, Some(id)) => Ok(id.as_str()),
      _ => Err(Error::NotAuthenticated),
    }
  }

  /// The owner identity whenever one is known, including while temporarily
  /// disconnected. Used to gate reads of already stored messages.
  pub fn known_owner(&self) -> Result<&str> {
    self.identity.as_deref().ok_or(Error::NotAuthenticated)
  }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Explicit connect request. Returns `true` when the caller should
  /// actually dial the provider; a no-op in any state but `Disconnected`.
  pub fn request_connect(&mut self) -> bool {
    if self.state != ConnectionState::Disconnected {
      return false;
    }
    self.state = ConnectionState::Connecting;
    true
  }

  /// Dialing failed before a `connected` event arrived.
  pub fn connect_failed(&mut self) {
    if self.state == ConnectionState::Connecting {
      self.state = ConnectionState::Disconnected;
    }
  }

  pub fn on_connected(&mut self, restored: Option<String>) -> Transition {
    if self.state == ConnectionState::LoggedIn {
      return Transition::to(self.state);
    }
    match restored {
      Some(identity) => {
        self.identity = Some(identity);
        self.qr_code = None;
        self.state = ConnectionState::LoggedIn;
        Transition::with_history_sync(self.state)
      }
      None => {
        self.state = ConnectionState::Connected;
        Transition::to(self.state)
      }
    }
  }

  pub fn on_pair_success(&mut self, identity: String) -> Transition {
    self.identity = Some(identity);
    self.qr_code = None;
    self.state = ConnectionState::LoggedIn;
    Transition::with_history_sync(self.state)
  }

  /// Remember the freshest pairing code. Ignored once logged in.
  pub fn on_qr(&mut self, codes: &[String]) {
    if self.state == ConnectionState::LoggedIn {
      return;
    }
    if let Some(code) = codes.first() {
      self.qr_code = Some(code.clone());
    }
  }

  /// Transport dropped. The identity survives for silent reconnection.
  pub fn on_disconnected(&mut self) -> Transition {
    self.state = ConnectionState::Disconnected;
    Transition::to(self.state)
  }

  /// The account was unlinked. Ingestion stays inert until a new pairing.
  pub fn on_logged_out(&mut self) -> Transition {
    self.identity = None;
    self.qr_code = None;
    self.state = ConnectionState::Disconnected;
    Transition::to(self.state)
  }
}
