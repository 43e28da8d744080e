//! In-process provider for development and tests. Sends are recorded, never
//! transmitted.

use std::future::Future;

use chatsync_core::event::ChatEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::{ChatProvider, ProviderError, Registration, SendReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
  pub to:                String,
  pub text:              String,
  pub quoted_message_id: Option<String>,
  pub receipt:           SendReceipt,
}

#[derive(Default)]
struct State {
  sent:             Vec<SentMessage>,
  next_id:          u64,
  connects:         usize,
  history_requests: usize,
  fail_sends:       bool,
}

#[derive(Default)]
pub struct MockProvider {
  /// Identity reported as restored on connect. Without one, connecting
  /// yields a pairing code instead of a login.
  identity: Option<String>,
  events:   Option<mpsc::Sender<ChatEvent>>,
  state:    Mutex<State>,
}

impl MockProvider {
  pub fn new() -> Self { Self::default() }

  pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
    self.identity = Some(identity.into());
    self
  }

  /// Emit connection events into the pipeline queue on `connect`.
  pub fn with_events(mut self, events: mpsc::Sender<ChatEvent>) -> Self {
    self.events = Some(events);
    self
  }

  /// Make every subsequent send fail.
  pub fn set_fail_sends(&self, fail: bool) { self.state.lock().fail_sends = fail; }

  pub fn sent(&self) -> Vec<SentMessage> { self.state.lock().sent.clone() }

  pub fn connects(&self) -> usize { self.state.lock().connects }

  pub fn history_requests(&self) -> usize { self.state.lock().history_requests }

  async fn emit(&self, event: ChatEvent) -> Result<(), ProviderError> {
    let Some(tx) = &self.events else {
      return Ok(());
    };
    tx.send(event)
      .await
      .map_err(|_| ProviderError::Rejected("event queue closed".into()))
  }
}

/// Numbers longer than ten digits are registered unless they end in zero.
fn mock_registered(phone: &str) -> bool {
  phone.len() > 10 && !phone.ends_with('0')
}

impl ChatProvider for MockProvider {
  fn connect(&self) -> impl Future<Output = Result<(), ProviderError>> + Send + '_ {
    async move {
      let attempt = {
        let mut state = self.state.lock();
        state.connects += 1;
        state.connects
      };
      debug!(attempt, "mock provider connecting");
      match &self.identity {
        Some(identity) => {
          self
            .emit(ChatEvent::Connected { identity: Some(identity.clone()) })
            .await
        }
        None => {
          self.emit(ChatEvent::Connected { identity: None }).await?;
          self
            .emit(ChatEvent::Qr { codes: vec![format!("2@mock-pairing-{attempt}")] })
            .await
        }
      }
    }
  }

  fn send_text<'a>(
    &'a self,
    to: &'a str,
    text: &'a str,
    quoted_message_id: Option<&'a str>,
  ) -> impl Future<Output = Result<SendReceipt, ProviderError>> + Send + 'a {
    async move {
      if !to.contains('@') {
        return Err(ProviderError::InvalidRecipient(to.to_owned()));
      }
      let mut state = self.state.lock();
      if state.fail_sends {
        return Err(ProviderError::Rejected("mock send failure".into()));
      }
      state.next_id += 1;
      let receipt = SendReceipt {
        message_id: format!("MOCK{:012X}", state.next_id),
        timestamp:  chrono::Utc::now().timestamp(),
      };
      state.sent.push(SentMessage {
        to:                to.to_owned(),
        text:              text.to_owned(),
        quoted_message_id: quoted_message_id.map(str::to_owned),
        receipt:           receipt.clone(),
      });
      Ok(receipt)
    }
  }

  fn request_history_sync(
    &self,
  ) -> impl Future<Output = Result<(), ProviderError>> + Send + '_ {
    async move {
      self.state.lock().history_requests += 1;
      Ok(())
    }
  }

  fn check_registered<'a>(
    &'a self,
    phones: &'a [String],
  ) -> impl Future<Output = Result<Vec<Registration>, ProviderError>> + Send + 'a {
    async move {
      Ok(
        phones
          .iter()
          .map(|phone| {
            let is_registered = mock_registered(phone);
            Registration {
              phone: phone.clone(),
              is_registered,
              jid: is_registered.then(|| format!("{phone}@s.whatsapp.net")),
            }
          })
          .collect(),
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn sends_are_recorded_with_unique_ids() {
    let p = MockProvider::new();
    let a = p.send_text("1555@s.whatsapp.net", "one", None).await.unwrap();
    let b = p.send_text("1555@s.whatsapp.net", "two", Some(&a.message_id)).await.unwrap();
    assert_ne!(a.message_id, b.message_id);

    let sent = p.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].quoted_message_id.as_deref(), Some(a.message_id.as_str()));
  }

  #[tokio::test]
  async fn failures_are_configurable() {
    let p = MockProvider::new();
    p.set_fail_sends(true);
    assert!(matches!(
      p.send_text("1555@s.whatsapp.net", "x", None).await,
      Err(ProviderError::Rejected(_))
    ));
    assert!(matches!(
      p.send_text("1555", "x", None).await,
      Err(ProviderError::InvalidRecipient(_))
    ));
    assert!(p.sent().is_empty());
  }

  #[tokio::test]
  async fn connect_reports_restored_identity() {
    let (tx, mut rx) = mpsc::channel(8);
    let p = MockProvider::new().with_identity("me@s.whatsapp.net").with_events(tx);
    p.connect().await.unwrap();
    assert_eq!(
      rx.recv().await,
      Some(ChatEvent::Connected { identity: Some("me@s.whatsapp.net".into()) })
    );
    assert_eq!(p.connects(), 1);
  }

  #[tokio::test]
  async fn connect_without_identity_offers_pairing() {
    let (tx, mut rx) = mpsc::channel(8);
    let p = MockProvider::new().with_events(tx);
    p.connect().await.unwrap();
    assert_eq!(rx.recv().await, Some(ChatEvent::Connected { identity: None }));
    assert!(matches!(rx.recv().await, Some(ChatEvent::Qr { codes }) if codes.len() == 1));
  }

  #[tokio::test]
  async fn registration_rule() {
    let p = MockProvider::new();
    let phones = vec!["15550109999".to_owned(), "15550109990".to_owned(), "123".to_owned()];
    let r = p.check_registered(&phones).await.unwrap();
    assert!(r[0].is_registered);
    assert_eq!(r[0].jid.as_deref(), Some("15550109999@s.whatsapp.net"));
    assert!(!r[1].is_registered);
    assert!(!r[2].is_registered);
    assert!(r[2].jid.is_none());
  }
}
