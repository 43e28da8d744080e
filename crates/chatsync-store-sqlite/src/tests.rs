//! Integration tests for `SqliteStore` against an in-memory database.

use chatsync_core::{
  message::{HistoryQuery, NewMessage, SELF_SENDER},
  store::MessageStore,
};

use crate::SqliteStore;

const ME: &str = "15550001111@s.whatsapp.net";
const ALICE: &str = "15550002222@s.whatsapp.net";
const BOB: &str = "15550003333@s.whatsapp.net";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn inbound(id: &str, chat: &str, timestamp: i64) -> NewMessage {
  NewMessage {
    id: id.into(),
    chat: chat.into(),
    from: chat.into(),
    to: None,
    text: format!("text of {id}"),
    timestamp,
    quoted_message_id: None,
  }
}

fn outbound(id: &str, chat: &str, timestamp: i64) -> NewMessage {
  NewMessage {
    from: SELF_SENDER.into(),
    to: Some(chat.into()),
    ..inbound(id, chat, timestamp)
  }
}

async fn seed_five(s: &SqliteStore) {
  for ts in 1..=5 {
    s.save_message(ME, &inbound(&format!("m{ts}"), ALICE, ts))
      .await
      .unwrap();
  }
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_is_idempotent_and_last_text_wins() {
  let s = store().await;

  let mut msg = inbound("dup", ALICE, 10);
  s.save_message(ME, &msg).await.unwrap();
  msg.text = "edited".into();
  s.save_message(ME, &msg).await.unwrap();

  let all = s.get_all_messages(ME).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].text, "edited");
  assert_eq!(s.count_chat_messages(ME, ALICE).await.unwrap(), 1);
}

#[tokio::test]
async fn same_id_under_different_owners_is_two_rows() {
  let s = store().await;
  s.save_message(ME, &inbound("shared", ALICE, 1)).await.unwrap();
  s.save_message(BOB, &inbound("shared", ALICE, 1)).await.unwrap();

  assert_eq!(s.get_all_messages(ME).await.unwrap().len(), 1);
  assert_eq!(s.get_all_messages(BOB).await.unwrap().len(), 1);
}

#[tokio::test]
async fn optional_fields_roundtrip() {
  let s = store().await;
  let mut msg = outbound("reply", ALICE, 7);
  msg.quoted_message_id = Some("orig".into());
  s.save_message(ME, &msg).await.unwrap();

  let got = &s.get_all_messages(ME).await.unwrap()[0];
  assert_eq!(got.to.as_deref(), Some(ALICE));
  assert_eq!(got.quoted_message_id.as_deref(), Some("orig"));
  assert_eq!(got.chat, ALICE);
  assert_eq!(got.from, SELF_SENDER);
}

// ─── Direction / read state ──────────────────────────────────────────────────

#[tokio::test]
async fn outbound_is_always_read_inbound_starts_unread() {
  let s = store().await;
  s.save_message(ME, &outbound("out", ALICE, 1)).await.unwrap();
  s.save_message(ME, &inbound("in", ALICE, 2)).await.unwrap();

  let all = s.get_all_messages(ME).await.unwrap();
  for m in &all {
    if m.is_from_me {
      assert!(m.is_read, "outbound {} must be read", m.id);
    }
  }
  let inbound_row = all.iter().find(|m| m.id == "in").unwrap();
  assert!(!inbound_row.is_from_me);
  assert!(!inbound_row.is_read);
}

#[tokio::test]
async fn replay_does_not_resurrect_unread() {
  let s = store().await;
  let msg = inbound("once", ALICE, 1);
  s.save_message(ME, &msg).await.unwrap();
  s.mark_messages_as_read(ME, ALICE).await.unwrap();

  s.save_message(ME, &msg).await.unwrap();

  let unread = s.get_unread_messages(ME, None, 10).await.unwrap();
  assert!(unread.is_empty());
}

#[tokio::test]
async fn resave_as_outbound_becomes_read() {
  let s = store().await;
  s.save_message(ME, &inbound("flip", ALICE, 1)).await.unwrap();
  s.save_message(ME, &outbound("flip", ALICE, 1)).await.unwrap();

  let got = &s.get_all_messages(ME).await.unwrap()[0];
  assert!(got.is_from_me);
  assert!(got.is_read);
  assert_eq!(got.from, SELF_SENDER);
  assert_eq!(got.to.as_deref(), Some(ALICE));
}

#[tokio::test]
async fn resave_as_inbound_follows_sender() {
  let s = store().await;
  s.save_message(ME, &outbound("flop", ALICE, 1)).await.unwrap();
  s.save_message(ME, &inbound("flop", ALICE, 1)).await.unwrap();

  let got = &s.get_all_messages(ME).await.unwrap()[0];
  assert!(!got.is_from_me);
  assert_eq!(got.from, ALICE);
  assert_eq!(got.to, None);
  // Read state never goes back to unread.
  assert!(got.is_read);
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_page_is_most_recent_oldest_first() {
  let s = store().await;
  seed_five(&s).await;

  let page = s
    .get_chat_messages(ME, &HistoryQuery::latest(ALICE, 2))
    .await
    .unwrap();
  let stamps: Vec<_> = page.iter().map(|m| m.timestamp).collect();
  assert_eq!(stamps, [4, 5]);
}

#[tokio::test]
async fn before_cursor_is_strictly_older() {
  let s = store().await;
  seed_five(&s).await;

  let page = s
    .get_chat_messages(ME, &HistoryQuery::latest(ALICE, 2).before("m4"))
    .await
    .unwrap();
  let stamps: Vec<_> = page.iter().map(|m| m.timestamp).collect();
  assert_eq!(stamps, [2, 3]);

  let page = s
    .get_chat_messages(ME, &HistoryQuery::latest(ALICE, 10).before("m4"))
    .await
    .unwrap();
  let stamps: Vec<_> = page.iter().map(|m| m.timestamp).collect();
  assert_eq!(stamps, [1, 2, 3]);
}

#[tokio::test]
async fn unknown_cursor_yields_empty_page() {
  let s = store().await;
  seed_five(&s).await;

  let page = s
    .get_chat_messages(ME, &HistoryQuery::latest(ALICE, 10).before("nope"))
    .await
    .unwrap();
  assert!(page.is_empty());
}

#[tokio::test]
async fn history_is_scoped_to_chat() {
  let s = store().await;
  seed_five(&s).await;
  s.save_message(ME, &inbound("b1", BOB, 3)).await.unwrap();

  let page = s
    .get_chat_messages(ME, &HistoryQuery::latest(BOB, 10))
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].id, "b1");
}

#[tokio::test]
async fn zero_limit_is_rejected() {
  let s = store().await;
  let err = s
    .get_chat_messages(ME, &HistoryQuery::latest(ALICE, 0))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::InvalidQuery(_)));

  let err = s.get_unread_messages(ME, None, 0).await.unwrap_err();
  assert!(matches!(err, crate::Error::InvalidQuery(_)));
}

// ─── Unread ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unread_excludes_outbound_and_orders_oldest_first() {
  let s = store().await;
  s.save_message(ME, &inbound("a2", ALICE, 20)).await.unwrap();
  s.save_message(ME, &inbound("a1", ALICE, 10)).await.unwrap();
  s.save_message(ME, &outbound("o1", ALICE, 15)).await.unwrap();
  s.save_message(ME, &inbound("b1", BOB, 30)).await.unwrap();

  let all = s.get_unread_messages(ME, None, 10).await.unwrap();
  let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
  assert_eq!(ids, ["a1", "a2", "b1"]);

  let alice = s.get_unread_messages(ME, Some(ALICE), 10).await.unwrap();
  assert_eq!(alice.len(), 2);

  let newest = s.get_unread_messages(ME, None, 1).await.unwrap();
  assert_eq!(newest[0].id, "b1");
}

#[tokio::test]
async fn mark_read_touches_only_that_chat() {
  let s = store().await;
  s.save_message(ME, &inbound("a1", ALICE, 1)).await.unwrap();
  s.save_message(ME, &inbound("a2", ALICE, 2)).await.unwrap();
  s.save_message(ME, &inbound("b1", BOB, 3)).await.unwrap();

  let changed = s.mark_messages_as_read(ME, ALICE).await.unwrap();
  assert_eq!(changed, 2);

  assert!(s.get_unread_messages(ME, Some(ALICE), 10).await.unwrap().is_empty());
  let bob = s.get_unread_messages(ME, Some(BOB), 10).await.unwrap();
  assert_eq!(bob.len(), 1);

  // A second pass has nothing left to flip.
  assert_eq!(s.mark_messages_as_read(ME, ALICE).await.unwrap(), 0);
}

// ─── Dump / purge ────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_messages_newest_first() {
  let s = store().await;
  seed_five(&s).await;
  let stamps: Vec<_> = s
    .get_all_messages(ME)
    .await
    .unwrap()
    .iter()
    .map(|m| m.timestamp)
    .collect();
  assert_eq!(stamps, [5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn purge_keeps_recent_rows() {
  let s = store().await;
  seed_five(&s).await;

  // Everything was stored just now, so a 30-day window keeps it all.
  assert_eq!(s.delete_old_messages(ME, 30).await.unwrap(), 0);
  assert_eq!(s.get_all_messages(ME).await.unwrap().len(), 5);
}

#[tokio::test]
async fn concurrent_upserts_of_one_key_leave_one_row() {
  let s = store().await;

  let mut tasks = Vec::new();
  for i in 0..16 {
    let s = s.clone();
    tasks.push(tokio::spawn(async move {
      let mut msg = inbound("race", ALICE, 1);
      msg.text = format!("v{i}");
      s.save_message(ME, &msg).await.unwrap();
    }));
  }
  for t in tasks {
    t.await.unwrap();
  }

  let all = s.get_all_messages(ME).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].text.starts_with('v'));
}
