//! Runtime server configuration, deserialised from `config.toml` layered
//! under `CHATSYNC__*` environment variables.

use std::path::PathBuf;

use chatsync_engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub provider:   ProviderConfig,
  #[serde(default)]
  pub engine:     EngineConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
  /// In-process fake; sends are recorded, never transmitted.
  #[default]
  Mock,
  /// External bridge daemon reached over HTTP.
  Bridge,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
  #[serde(default)]
  pub kind:                ProviderKind,
  /// Base URL of the bridge daemon. Required for `kind = "bridge"`.
  pub bridge_url:          Option<String>,
  #[serde(default)]
  pub bridge_timeout_secs: Option<u64>,
  /// Previously paired identity. Reads work against it before the provider
  /// reconnects, and the mock provider restores it on connect.
  pub identity:            Option<String>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/chatsync/messages.db") }
