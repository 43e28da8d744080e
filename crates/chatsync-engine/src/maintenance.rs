//! Periodic retention purge.

use std::time::Duration;

use chatsync_core::{Result, store::MessageStore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{dispatch::Notifier, ingest::Pipeline, ingest::bounded, provider::ChatProvider};

impl<S, P, N> Pipeline<S, P, N>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
  N: Notifier + 'static,
{
  /// Delete messages older than the configured retention. `Ok(None)` when
  /// retention is disabled or no owner identity is known yet.
  pub async fn purge_old_messages(&self) -> Result<Option<u64>> {
    let Some(days) = self.config.retention_days else {
      return Ok(None);
    };
    let owner = match self.connection.lock().known_owner() {
      Ok(owner) => owner.to_owned(),
      Err(_) => return Ok(None),
    };
    let deleted =
      bounded(self.config.write_timeout(), self.store.delete_old_messages(&owner, days)).await?;
    Ok(Some(deleted))
  }
}

/// Run [`Pipeline::purge_old_messages`] every retention interval. Returns
/// `None` when retention is disabled.
pub fn spawn_retention<S, P, N>(pipeline: Pipeline<S, P, N>) -> Option<JoinHandle<()>>
where
  S: MessageStore + 'static,
  P: ChatProvider + 'static,
  N: Notifier + 'static,
{
  let days = pipeline.config().retention_days?;
  let period = pipeline.config().retention_interval().max(Duration::from_secs(1));
  info!(days, ?period, "message retention enabled");

  Some(tokio::spawn(async move {
    let mut ticker = tokio::time::interval(period);
    loop {
      ticker.tick().await;
      match pipeline.purge_old_messages().await {
        Ok(Some(deleted)) if deleted > 0 => info!(deleted, "old messages purged"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "retention purge failed"),
      }
    }
  }))
}
