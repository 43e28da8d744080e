//! Fan-out of chat activity to subscribed sessions.
//!
//! Delivery is best effort. Every push runs concurrently under its own
//! timeout; one slow or dead session never delays or fails another, and a
//! failed push never fails the ingestion that triggered it.

use std::{future::Future, sync::Arc, time::Duration};

use chatsync_core::event::DeliveryStatus;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::registry::Registry;

/// Method name carried by every notification envelope.
pub const NOTIFICATION_METHOD: &str = "notifications/message";

/// Payload pushed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Notification {
  NewMessage {
    chat:       String,
    message_id: String,
    from:       String,
    text:       String,
    timestamp:  i64,
  },
  MessageStatus {
    chat:       String,
    message_id: String,
    status:     DeliveryStatus,
  },
}

impl Notification {
  pub fn chat(&self) -> &str {
    match self {
      Self::NewMessage { chat, .. } | Self::MessageStatus { chat, .. } => chat,
    }
  }

  /// `{"method": "notifications/message", "params": {...}}`
  pub fn envelope(&self) -> Value {
    json!({ "method": NOTIFICATION_METHOD, "params": self })
  }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
  /// The session has no live channel any more.
  #[error("session {0} is not connected")]
  Closed(String),

  /// The session's outbound buffer is full.
  #[error("session {0} is not keeping up")]
  Full(String),

  #[error("push timed out after {0:?}")]
  Timeout(Duration),

  #[error("{0}")]
  Other(String),
}

/// Transport that can push one notification to one session.
pub trait Notifier: Send + Sync {
  fn deliver<'a>(
    &'a self,
    session: &'a str,
    notification: &'a Notification,
  ) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a;
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
  pub delivered: usize,
  pub failed:    usize,
}

impl DispatchReport {
  pub fn attempted(&self) -> usize { self.delivered + self.failed }
}

pub struct Dispatcher<N> {
  registry:     Arc<Registry>,
  notifier:     N,
  push_timeout: Duration,
}

impl<N: Notifier> Dispatcher<N> {
  pub fn new(registry: Arc<Registry>, notifier: N, push_timeout: Duration) -> Self {
    Self { registry, notifier, push_timeout }
  }

  pub fn registry(&self) -> &Arc<Registry> { &self.registry }

  pub fn notifier(&self) -> &N { &self.notifier }

  pub async fn notify_new_message(
    &self,
    chat: &str,
    message_id: &str,
    from: &str,
    text: &str,
    timestamp: i64,
  ) -> DispatchReport {
    let notification = Notification::NewMessage {
      chat: chat.to_owned(),
      message_id: message_id.to_owned(),
      from: from.to_owned(),
      text: text.to_owned(),
      timestamp,
    };
    self.dispatch(&notification).await
  }

  pub async fn notify_message_status(
    &self,
    chat: &str,
    message_id: &str,
    status: DeliveryStatus,
  ) -> DispatchReport {
    let notification = Notification::MessageStatus {
      chat: chat.to_owned(),
      message_id: message_id.to_owned(),
      status,
    };
    self.dispatch(&notification).await
  }

  /// Push `notification` to every session subscribed to its chat.
  pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
    let sessions = self.registry.subscribed_sessions(notification.chat());
    if sessions.is_empty() {
      return DispatchReport::default();
    }

    let mut pushes = Vec::with_capacity(sessions.len());
    for session in &sessions {
      pushes.push(self.push(session, notification));
    }

    let mut report = DispatchReport::default();
    for ok in join_all(pushes).await {
      if ok {
        report.delivered += 1;
      } else {
        report.failed += 1;
      }
    }
    debug!(
      chat = notification.chat(),
      delivered = report.delivered,
      failed = report.failed,
      "notification fan-out finished"
    );
    report
  }

  async fn push(&self, session: &str, notification: &Notification) -> bool {
    let delivery = self.notifier.deliver(session, notification);
    let outcome = match tokio::time::timeout(self.push_timeout, delivery).await {
      Ok(result) => result,
      Err(_) => Err(DeliveryError::Timeout(self.push_timeout)),
    };
    match outcome {
      Ok(()) => true,
      Err(e) => {
        warn!(session, chat = notification.chat(), error = %e, "notification push failed");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;

  const CHAT: &str = "1555@s.whatsapp.net";

  /// Records every push; sessions named `dead*` fail, `slow*` hang.
  #[derive(Default)]
  struct Recorder {
    seen: Mutex<Vec<(String, Notification)>>,
  }

  impl Notifier for Recorder {
    fn deliver<'a>(
      &'a self,
      session: &'a str,
      notification: &'a Notification,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a {
      async move {
        if session.starts_with("dead") {
          return Err(DeliveryError::Closed(session.to_owned()));
        }
        if session.starts_with("slow") {
          std::future::pending::<()>().await;
        }
        self.seen.lock().push((session.to_owned(), notification.clone()));
        Ok(())
      }
    }
  }

  fn dispatcher() -> Dispatcher<Recorder> {
    Dispatcher::new(Arc::new(Registry::new()), Recorder::default(), Duration::from_millis(50))
  }

  #[tokio::test]
  async fn no_subscribers_is_a_no_op() {
    let d = dispatcher();
    let report = d.notify_new_message(CHAT, "m1", CHAT, "hi", 1).await;
    assert_eq!(report.attempted(), 0);
    assert!(d.notifier().seen.lock().is_empty());
  }

  #[tokio::test]
  async fn only_subscribers_of_the_chat_receive() {
    let d = dispatcher();
    d.registry().subscribe("s1", CHAT);
    d.registry().subscribe("s2", "other@s.whatsapp.net");

    let report = d.notify_new_message(CHAT, "m1", CHAT, "hi", 1).await;
    assert_eq!(report, DispatchReport { delivered: 1, failed: 0 });

    let seen = d.notifier().seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "s1");
  }

  #[tokio::test]
  async fn failures_do_not_block_healthy_sessions() {
    let d = dispatcher();
    for s in ["dead-1", "ok-1", "slow-1", "ok-2"] {
      d.registry().subscribe(s, CHAT);
    }

    let report = d.notify_message_status(CHAT, "m1", DeliveryStatus::Read).await;
    assert_eq!(report, DispatchReport { delivered: 2, failed: 2 });

    let mut sessions: Vec<_> =
      d.notifier().seen.lock().iter().map(|(s, _)| s.clone()).collect();
    sessions.sort();
    assert_eq!(sessions, vec!["ok-1", "ok-2"]);
  }

  #[test]
  fn envelope_shape() {
    let n = Notification::NewMessage {
      chat:       CHAT.into(),
      message_id: "m1".into(),
      from:       CHAT.into(),
      text:       "hello".into(),
      timestamp:  1_700_000_000,
    };
    let v = n.envelope();
    assert_eq!(v["method"], NOTIFICATION_METHOD);
    assert_eq!(v["params"]["message_id"], "m1");
    assert_eq!(v["params"]["timestamp"], 1_700_000_000);

    let s = Notification::MessageStatus {
      chat:       CHAT.into(),
      message_id: "m1".into(),
      status:     DeliveryStatus::Delivered,
    };
    assert_eq!(s.envelope()["params"]["status"], "delivered");
  }
}
