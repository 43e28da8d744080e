//! Per-session push channels.
//!
//! Each open notification stream owns the receiving half of a bounded
//! channel. The hub is the engine's [`Notifier`]: a push is a non-blocking
//! send into that channel, so a stalled client fills its own buffer and
//! nothing else.

use std::{collections::HashMap, future::Future};

use chatsync_engine::{DeliveryError, Notification, Notifier};
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Notifications buffered per session before pushes start failing.
pub const SESSION_BUFFER: usize = 64;

#[derive(Default)]
pub struct SessionHub {
  sessions: RwLock<HashMap<String, mpsc::Sender<Notification>>>,
}

impl SessionHub {
  pub fn new() -> Self { Self::default() }

  /// Open the push channel of `session`, replacing any previous one.
  pub fn open(&self, session: &str) -> (mpsc::Sender<Notification>, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    let replaced = self.sessions.write().insert(session.to_owned(), tx.clone());
    debug!(session, replaced = replaced.is_some(), "notification channel opened");
    (tx, rx)
  }

  /// Close `session` if `channel` is still its current channel. Returns
  /// `false` when the session has since been reopened by a newer stream.
  pub fn close(&self, session: &str, channel: &mpsc::Sender<Notification>) -> bool {
    let mut sessions = self.sessions.write();
    match sessions.get(session) {
      Some(current) if current.same_channel(channel) => {
        sessions.remove(session);
        true
      }
      _ => false,
    }
  }

  pub fn is_open(&self, session: &str) -> bool { self.sessions.read().contains_key(session) }

  pub fn len(&self) -> usize { self.sessions.read().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Notifier for SessionHub {
  fn deliver<'a>(
    &'a self,
    session: &'a str,
    notification: &'a Notification,
  ) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a {
    async move {
      let Some(tx) = self.sessions.read().get(session).cloned() else {
        return Err(DeliveryError::Closed(session.to_owned()));
      };
      tx.try_send(notification.clone()).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::Full(session.to_owned()),
        TrySendError::Closed(_) => DeliveryError::Closed(session.to_owned()),
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn note(id: &str) -> Notification {
    Notification::NewMessage {
      chat:       "1555@s.whatsapp.net".into(),
      message_id: id.into(),
      from:       "1555@s.whatsapp.net".into(),
      text:       "hi".into(),
      timestamp:  1,
    }
  }

  #[tokio::test]
  async fn delivers_to_open_sessions_only() {
    let hub = SessionHub::new();
    let (_tx, mut rx) = hub.open("s1");

    hub.deliver("s1", &note("m1")).await.unwrap();
    assert_eq!(rx.recv().await, Some(note("m1")));
    assert!(matches!(
      hub.deliver("ghost", &note("m2")).await,
      Err(DeliveryError::Closed(_))
    ));
  }

  #[tokio::test]
  async fn full_buffer_fails_fast() {
    let hub = SessionHub::new();
    let (_tx, _rx) = hub.open("s1");
    for i in 0..SESSION_BUFFER {
      hub.deliver("s1", &note(&i.to_string())).await.unwrap();
    }
    assert!(matches!(hub.deliver("s1", &note("over")).await, Err(DeliveryError::Full(_))));
  }

  #[test]
  fn stale_stream_cannot_close_a_reopened_session() {
    let hub = SessionHub::new();
    let (old, _old_rx) = hub.open("s1");
    let (new, _new_rx) = hub.open("s1");

    assert!(!hub.close("s1", &old));
    assert!(hub.is_open("s1"));
    assert!(hub.close("s1", &new));
    assert!(hub.is_empty());
  }
}
