//! Session ↔ chat subscription registry.
//!
//! Two indexes are kept behind one lock so they can never disagree: the chats
//! each session follows, and the sessions following each chat. Readers get
//! snapshots, so a fan-out can iterate without holding the lock while a
//! session subscribes or disconnects concurrently.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;

#[derive(Default)]
struct Inner {
  by_session: HashMap<String, HashSet<String>>,
  by_chat:    HashMap<String, HashSet<String>>,
}

impl Inner {
  fn unlink(&mut self, session: &str, chat: &str) -> bool {
    let mut removed = false;
    if let Some(chats) = self.by_session.get_mut(session) {
      removed = chats.remove(chat);
      if chats.is_empty() {
        self.by_session.remove(session);
      }
    }
    if let Some(sessions) = self.by_chat.get_mut(chat) {
      sessions.remove(session);
      if sessions.is_empty() {
        self.by_chat.remove(chat);
      }
    }
    removed
  }
}

/// Which sessions want notifications for which chats.
#[derive(Default)]
pub struct Registry {
  inner: RwLock<Inner>,
}

impl Registry {
  pub fn new() -> Self { Self::default() }

  /// Follow `chat` from `session`. Returns `false` if it already did.
  pub fn subscribe(&self, session: &str, chat: &str) -> bool {
    let mut inner = self.inner.write();
    let added = inner
      .by_session
      .entry(session.to_owned())
      .or_default()
      .insert(chat.to_owned());
    inner
      .by_chat
      .entry(chat.to_owned())
      .or_default()
      .insert(session.to_owned());
    added
  }

  /// Stop following `chat`. Returns `false` if the session was not
  /// subscribed.
  pub fn unsubscribe(&self, session: &str, chat: &str) -> bool {
    self.inner.write().unlink(session, chat)
  }

  pub fn is_subscribed(&self, session: &str, chat: &str) -> bool {
    self
      .inner
      .read()
      .by_session
      .get(session)
      .is_some_and(|chats| chats.contains(chat))
  }

  /// Snapshot of the sessions following `chat`.
  pub fn subscribed_sessions(&self, chat: &str) -> BTreeSet<String> {
    self
      .inner
      .read()
      .by_chat
      .get(chat)
      .map(|s| s.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// Snapshot of the chats `session` follows.
  pub fn session_subscriptions(&self, session: &str) -> BTreeSet<String> {
    self
      .inner
      .read()
      .by_session
      .get(session)
      .map(|c| c.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// Drop every subscription of a disconnected session. Returns how many
  /// chats it was following.
  pub fn cleanup_session(&self, session: &str) -> usize {
    let mut inner = self.inner.write();
    let Some(chats) = inner.by_session.remove(session) else {
      return 0;
    };
    for chat in &chats {
      if let Some(sessions) = inner.by_chat.get_mut(chat) {
        sessions.remove(session);
        if sessions.is_empty() {
          inner.by_chat.remove(chat);
        }
      }
    }
    chats.len()
  }

  /// Number of sessions with at least one subscription.
  pub fn session_count(&self) -> usize { self.inner.read().by_session.len() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;

  const ALICE: &str = "1555@s.whatsapp.net";
  const BOB: &str = "1666@s.whatsapp.net";

  #[test]
  fn subscribe_is_idempotent() {
    let r = Registry::new();
    assert!(r.subscribe("s1", ALICE));
    assert!(!r.subscribe("s1", ALICE));
    assert!(r.is_subscribed("s1", ALICE));
    assert_eq!(r.subscribed_sessions(ALICE).len(), 1);
  }

  #[test]
  fn indexes_stay_consistent() {
    let r = Registry::new();
    r.subscribe("s1", ALICE);
    r.subscribe("s1", BOB);
    r.subscribe("s2", ALICE);

    assert_eq!(
      r.subscribed_sessions(ALICE).into_iter().collect::<Vec<_>>(),
      vec!["s1", "s2"]
    );
    assert_eq!(r.session_subscriptions("s1").len(), 2);

    assert!(r.unsubscribe("s1", ALICE));
    assert!(!r.unsubscribe("s1", ALICE));
    assert!(!r.is_subscribed("s1", ALICE));
    assert_eq!(
      r.subscribed_sessions(ALICE).into_iter().collect::<Vec<_>>(),
      vec!["s2"]
    );
    assert!(r.is_subscribed("s1", BOB));
  }

  #[test]
  fn unknown_entries_are_empty() {
    let r = Registry::new();
    assert!(r.subscribed_sessions(ALICE).is_empty());
    assert!(r.session_subscriptions("ghost").is_empty());
    assert!(!r.unsubscribe("ghost", ALICE));
    assert_eq!(r.cleanup_session("ghost"), 0);
  }

  #[test]
  fn cleanup_removes_session_everywhere() {
    let r = Registry::new();
    r.subscribe("s1", ALICE);
    r.subscribe("s1", BOB);
    r.subscribe("s2", BOB);

    assert_eq!(r.cleanup_session("s1"), 2);
    assert!(r.subscribed_sessions(ALICE).is_empty());
    assert_eq!(
      r.subscribed_sessions(BOB).into_iter().collect::<Vec<_>>(),
      vec!["s2"]
    );
    assert!(r.session_subscriptions("s1").is_empty());
    assert_eq!(r.session_count(), 1);
  }

  #[test]
  fn snapshot_survives_concurrent_cleanup() {
    let r = Registry::new();
    r.subscribe("s1", ALICE);
    let snapshot = r.subscribed_sessions(ALICE);
    r.cleanup_session("s1");
    assert!(snapshot.contains("s1"));
    assert!(r.subscribed_sessions(ALICE).is_empty());
  }

  #[test]
  fn parallel_subscribers() {
    let r = Arc::new(Registry::new());
    let handles: Vec<_> = (0..8)
      .map(|i| {
        let r = Arc::clone(&r);
        std::thread::spawn(move || {
          let session = format!("s{i}");
          r.subscribe(&session, ALICE);
          r.subscribe(&session, BOB);
          if i % 2 == 0 {
            r.cleanup_session(&session);
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(r.subscribed_sessions(ALICE).len(), 4);
    assert_eq!(r.subscribed_sessions(BOB).len(), 4);
    assert_eq!(r.session_count(), 4);
  }
}
