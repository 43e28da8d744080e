//! `GET /notifications`: the push channel of a session, as server-sent
//! events.
//!
//! The first event (`session`) carries the session id, which is generated
//! when the caller did not send one. Every later event (`notification`)
//! carries a `{"method": ..., "params": ...}` envelope. When the client goes
//! away the stream is dropped and the session's subscriptions go with it.

use std::{
  convert::Infallible,
  pin::Pin,
  task::{Context, Poll},
  time::Duration,
};

use axum::{
  extract::{Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use chatsync_core::store::MessageStore;
use chatsync_engine::{ChatProvider, Notification};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{AppState, session::SessionId};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
  /// For clients that cannot set headers, e.g. a browser `EventSource`.
  pub session_id: Option<String>,
}

/// Runs its cleanup once, when the stream holding it is dropped.
struct SessionGuard {
  cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SessionGuard {
  fn drop(&mut self) {
    if let Some(cleanup) = self.cleanup.take() {
      cleanup();
    }
  }
}

/// Notification stream that tears its session down when dropped.
struct SessionStream {
  inner:  ReceiverStream<Notification>,
  _guard: SessionGuard,
}

impl Stream for SessionStream {
  type Item = Notification;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    Pin::new(&mut self.get_mut().inner).poll_next(cx)
  }
}

pub async fn stream<S, P>(
  State(state): State<AppState<S, P>>,
  session: SessionId,
  Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
{
  let session = session
    .0
    .or(params.session_id.filter(|s| !s.trim().is_empty()))
    .unwrap_or_else(|| Uuid::new_v4().to_string());

  let (channel, rx) = state.engine.notifier().open(&session);
  info!(session = %session, "notification stream opened");

  let engine = state.engine.clone();
  let closing = session.clone();
  let guard = SessionGuard {
    cleanup: Some(Box::new(move || {
      if engine.notifier().close(&closing, &channel) {
        engine.end_session(&closing);
        info!(session = %closing, "notification stream closed");
      }
    })),
  };

  let hello = Event::default().event("session").data(session);
  let notifications = SessionStream { inner: ReceiverStream::new(rx), _guard: guard }
    .map(|n| Event::default().event("notification").data(n.envelope().to_string()));

  let events = stream::once(async move { hello })
    .chain(notifications)
    .map(Ok::<_, Infallible>);

  Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
