//! Core types and trait definitions for chatsync.
//!
//! This crate is deliberately free of HTTP, runtime and database
//! dependencies. The store backend, the ingestion engine and the tool surface
//! all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod connection;
pub mod error;
pub mod event;
pub mod message;
pub mod store;

pub use error::{Error, ErrorCode, Result};
