//! Event ingestion.
//!
//! Handling an event is split in two. [`plan`] applies the event to the
//! connection state machine and decides what has to happen, synchronously
//! and without I/O. [`Pipeline::apply`] then carries the plan out against
//! the store, the dispatcher and the provider.

use std::{future::Future, sync::Arc, time::Duration};

use chatsync_core::{
  Error, Result,
  connection::{Connection, Transition},
  event::{ChatEvent, DeliveryStatus},
  message::NewMessage,
  store::MessageStore,
};
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::AbortHandle};
use tracing::{debug, info, warn};

use crate::{
  config::EngineConfig,
  dispatch::{Dispatcher, Notifier},
  normalize,
  provider::ChatProvider,
  registry::Registry,
};

// ─── Planning ────────────────────────────────────────────────────────────────

/// One step of work derived from a provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  /// Persist a live message, then tell subscribers about it.
  Save { owner: String, message: NewMessage },
  /// Persist a history batch. Replays never notify.
  Replay { owner: String, messages: Vec<NewMessage>, skipped: usize },
  /// Tell subscribers that sent messages changed delivery status.
  Status { chat: String, message_ids: Vec<String>, status: DeliveryStatus },
  /// Ask the provider to replay recent history.
  RequestHistorySync,
  /// Forget a history request that has not gone out yet.
  CancelHistorySync,
  /// The event was discarded.
  Drop { reason: &'static str },
}

impl Effect {
  fn is_replay(&self) -> bool { matches!(self, Self::Replay { .. }) }
}

fn follow_up(transition: Transition) -> Vec<Effect> {
  if transition.request_history_sync {
    vec![Effect::RequestHistorySync]
  } else {
    Vec::new()
  }
}

/// Apply `event` to `connection` and return the work it calls for.
///
/// Message traffic is only attributable once an owner identity is logged
/// in; before that it is dropped rather than queued.
pub fn plan(connection: &mut Connection, event: ChatEvent) -> Vec<Effect> {
  match event {
    ChatEvent::Message(incoming) => {
      let Ok(owner) = connection.owner() else {
        return vec![Effect::Drop { reason: "message before login" }];
      };
      match normalize::live_message(&incoming) {
        Some(message) => {
          vec![Effect::Save { owner: owner.to_owned(), message }]
        }
        None => vec![Effect::Drop { reason: "message without id or chat" }],
      }
    }
    ChatEvent::HistorySync(sync) => {
      let Ok(owner) = connection.owner() else {
        return vec![Effect::Drop { reason: "history sync before login" }];
      };
      let mut messages = Vec::with_capacity(sync.message_count());
      let mut skipped = 0;
      for conversation in &sync.conversations {
        let (batch, bad) = normalize::conversation_messages(conversation);
        messages.extend(batch);
        skipped += bad;
      }
      vec![Effect::Replay { owner: owner.to_owned(), messages, skipped }]
    }
    ChatEvent::Receipt { chat, message_ids, status } => {
      if connection.owner().is_err() {
        return vec![Effect::Drop { reason: "receipt before login" }];
      }
      vec![Effect::Status { chat, message_ids, status }]
    }
    ChatEvent::Qr { codes } => {
      connection.on_qr(&codes);
      Vec::new()
    }
    ChatEvent::Connected { identity } => follow_up(connection.on_connected(identity)),
    ChatEvent::PairSuccess { identity } => follow_up(connection.on_pair_success(identity)),
    ChatEvent::Disconnected => {
      connection.on_disconnected();
      vec![Effect::CancelHistorySync]
    }
    ChatEvent::LoggedOut => {
      connection.on_logged_out();
      vec![Effect::CancelHistorySync]
    }
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Tally of what handling one event did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
  pub stored:   usize,
  pub skipped:  usize,
  pub dropped:  usize,
  /// Successful pushes across all sessions.
  pub notified: usize,
}

/// Run a store operation under `limit`, folding both failure modes into the
/// storage error.
pub(crate) async fn bounded<T, E>(
  limit: Duration,
  op: impl Future<Output = Result<T, E>>,
) -> Result<T>
where
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(limit, op).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Error::storage(e)),
    Err(_) => Err(Error::StorageTimeout(limit)),
  }
}

/// The engine: owns the connection state and wires provider events to the
/// store and the dispatcher. Cheap to clone; clones share everything.
pub struct Pipeline<S, P, N> {
  pub(crate) store:      Arc<S>,
  pub(crate) provider:   Arc<P>,
  pub(crate) dispatcher: Arc<Dispatcher<N>>,
  pub(crate) connection: Arc<Mutex<Connection>>,
  pub(crate) config:     Arc<EngineConfig>,
  /// The delayed history request, while it is still waiting.
  pending_sync:          Arc<Mutex<Option<AbortHandle>>>,
}

impl<S, P, N> Clone for Pipeline<S, P, N> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      provider:     Arc::clone(&self.provider),
      dispatcher:   Arc::clone(&self.dispatcher),
      connection:   Arc::clone(&self.connection),
      config:       Arc::clone(&self.config),
      pending_sync: Arc::clone(&self.pending_sync),
    }
  }
}

impl<S, P, N> Pipeline<S, P, N>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
  N: Notifier + 'static,
{
  pub fn new(store: S, provider: P, notifier: N, config: EngineConfig) -> Self {
    let registry = Arc::new(Registry::new());
    let dispatcher = Dispatcher::new(registry, notifier, config.push_timeout());
    Self {
      store:        Arc::new(store),
      provider:     Arc::new(provider),
      dispatcher:   Arc::new(dispatcher),
      connection:   Arc::new(Mutex::new(Connection::new())),
      config:       Arc::new(config),
      pending_sync: Arc::new(Mutex::new(None)),
    }
  }

  /// Start from a given connection state, e.g. one that remembers a paired
  /// identity.
  pub fn with_connection(self, connection: Connection) -> Self {
    *self.connection.lock() = connection;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn provider(&self) -> &P { &self.provider }

  pub fn notifier(&self) -> &N { self.dispatcher.notifier() }

  pub fn registry(&self) -> &Registry { self.dispatcher.registry() }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// Apply `event` to the connection state and return the resulting work.
  pub fn plan(&self, event: ChatEvent) -> Vec<Effect> {
    let mut connection = self.connection.lock();
    plan(&mut connection, event)
  }

  /// Plan and execute one event.
  pub async fn handle(&self, event: ChatEvent) -> IngestReport {
    let effects = self.plan(event);
    self.apply(effects).await
  }

  /// Consume the provider event queue until every sender is gone.
  ///
  /// Live events are handled in arrival order. History batches run on their
  /// own task so a large replay never holds up live traffic.
  pub async fn run(self, mut events: mpsc::Receiver<ChatEvent>) {
    info!("event pipeline started");
    while let Some(event) = events.recv().await {
      let kind = event.kind();
      let effects = self.plan(event);
      if effects.iter().any(Effect::is_replay) {
        let this = self.clone();
        tokio::spawn(async move {
          let report = this.apply(effects).await;
          info!(
            stored = report.stored,
            skipped = report.skipped,
            "history sync ingested"
          );
        });
      } else {
        let report = self.apply(effects).await;
        debug!(kind, ?report, "event handled");
      }
    }
    info!("event queue closed, pipeline stopped");
  }

  pub async fn apply(&self, effects: Vec<Effect>) -> IngestReport {
    let mut report = IngestReport::default();
    for effect in effects {
      match effect {
        Effect::Save { owner, message } => {
          self.save_live(&owner, &message, &mut report).await;
        }
        Effect::Replay { owner, messages, skipped } => {
          report.skipped += skipped;
          self.replay(&owner, &messages, &mut report).await;
        }
        Effect::Status { chat, message_ids, status } => {
          for message_id in &message_ids {
            let pushed = self.dispatcher.notify_message_status(&chat, message_id, status).await;
            report.notified += pushed.delivered;
          }
        }
        Effect::RequestHistorySync => self.schedule_history_sync(),
        Effect::CancelHistorySync => self.cancel_history_sync(),
        Effect::Drop { reason } => {
          warn!(reason, "provider event dropped");
          report.dropped += 1;
        }
      }
    }
    report
  }

  async fn save_live(
    &self,
    owner: &str,
    message: &NewMessage,
    report: &mut IngestReport,
  ) {
    let saved =
      bounded(self.config.write_timeout(), self.store.save_message(owner, message)).await;
    if let Err(e) = saved {
      warn!(message_id = %message.id, chat = %message.chat, error = %e, "failed to store message");
      report.skipped += 1;
      return;
    }
    report.stored += 1;
    debug!(message_id = %message.id, chat = %message.chat, "message stored");

    let pushed = self
      .dispatcher
      .notify_new_message(
        &message.chat,
        &message.id,
        &message.from,
        &message.text,
        message.timestamp,
      )
      .await;
    report.notified += pushed.delivered;
  }

  async fn replay(&self, owner: &str, messages: &[NewMessage], report: &mut IngestReport) {
    let limit = self.config.history_sync_timeout();
    let write_timeout = self.config.write_timeout();
    let mut stored = 0;
    let batch = async {
      for message in messages {
        match bounded(write_timeout, self.store.save_message(owner, message)).await {
          Ok(()) => stored += 1,
          Err(e) => {
            warn!(message_id = %message.id, error = %e, "failed to store history message");
          }
        }
      }
    };
    if tokio::time::timeout(limit, batch).await.is_err() {
      warn!(?limit, total = messages.len(), "history sync batch timed out");
    }
    report.stored += stored;
    report.skipped += messages.len() - stored;
  }

  /// Request a history replay once the fresh session has settled.
  ///
  /// The request only goes out if the session is still logged in when the
  /// delay is up.
  fn schedule_history_sync(&self) {
    let provider = Arc::clone(&self.provider);
    let connection = Arc::clone(&self.connection);
    let delay = self.config.history_sync_delay();
    let task = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      if !connection.lock().is_logged_in() {
        debug!("session ended before history sync, request skipped");
        return;
      }
      match provider.request_history_sync().await {
        Ok(()) => info!("history sync requested"),
        Err(e) => warn!(error = %e, "history sync request failed"),
      }
    });
    if let Some(previous) = self.pending_sync.lock().replace(task.abort_handle()) {
      previous.abort();
    }
  }

  fn cancel_history_sync(&self) {
    if let Some(pending) = self.pending_sync.lock().take() {
      pending.abort();
      debug!("pending history sync cancelled");
    }
  }
}
