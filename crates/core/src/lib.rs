//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - The offline cache manager (activation and cache-first request handling)
//! - Named cache stores with a SQLite backend
//! - The resource manifest and the network seam
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod network;

pub use cache::{CacheDb, StoreInfo, StoredEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manager::{ActivationReport, ManagerStats, OfflineCacheManager, StoreState};
pub use manifest::ResourceManifest;
pub use network::{Fetcher, Request, Response};
