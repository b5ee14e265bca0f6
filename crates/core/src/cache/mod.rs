//! SQLite-backed named cache stores.
//!
//! This module provides persistent storage for the offline cache using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named stores that are created, populated and destroyed as a unit
//! - A persisted readiness flag per store
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use stores::{StoreInfo, StoredEntry};
