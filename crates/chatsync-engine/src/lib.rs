//! Ingestion, subscription and notification engine for chatsync.
//!
//! Provider events enter through [`Pipeline`], are normalised into
//! [`NewMessage`](chatsync_core::message::NewMessage) records, written through
//! a [`MessageStore`](chatsync_core::store::MessageStore) and fanned out to
//! interested sessions by the [`Dispatcher`].

pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod maintenance;
pub mod normalize;
pub mod ops;
pub mod provider;
pub mod registry;

pub use config::EngineConfig;
pub use dispatch::{DeliveryError, DispatchReport, Dispatcher, Notification, Notifier};
pub use ingest::{Effect, IngestReport, Pipeline};
pub use maintenance::spawn_retention;
pub use ops::{HistoryPage, Pairing, SendOutcome, SendRequest, Stats, Status};
pub use provider::{ChatProvider, ProviderError};
pub use registry::Registry;
