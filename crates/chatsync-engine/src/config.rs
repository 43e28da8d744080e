//! Tunables for the engine. Every field has a default, so an empty config
//! section is valid.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Bound on a single upsert.
  pub write_timeout_secs:        u64,
  /// Bound on history, unread and mark-as-read queries.
  pub read_timeout_secs:         u64,
  /// Bound on a whole history-sync batch.
  pub history_sync_timeout_secs: u64,
  /// Bound on one push to one session.
  pub push_timeout_secs:         u64,
  /// Settle time after login before asking the provider for history.
  pub history_sync_delay_secs:   u64,
  /// Purge messages stored longer ago than this. `None` disables the purge.
  pub retention_days:            Option<u32>,
  pub retention_interval_secs:   u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      write_timeout_secs:        5,
      read_timeout_secs:         10,
      history_sync_timeout_secs: 30,
      push_timeout_secs:         5,
      history_sync_delay_secs:   3,
      retention_days:            None,
      retention_interval_secs:   3600,
    }
  }
}

impl EngineConfig {
  pub fn write_timeout(&self) -> Duration { Duration::from_secs(self.write_timeout_secs) }

  pub fn read_timeout(&self) -> Duration { Duration::from_secs(self.read_timeout_secs) }

  pub fn history_sync_timeout(&self) -> Duration {
    Duration::from_secs(self.history_sync_timeout_secs)
  }

  pub fn push_timeout(&self) -> Duration { Duration::from_secs(self.push_timeout_secs) }

  pub fn history_sync_delay(&self) -> Duration {
    Duration::from_secs(self.history_sync_delay_secs)
  }

  pub fn retention_interval(&self) -> Duration {
    Duration::from_secs(self.retention_interval_secs)
  }
}
