//! Client code for offcache.
//!
//! This crate provides the HTTP side of the offline cache: a reqwest-backed
//! `Fetcher` used for populate and network fallback, and the mapping between
//! intercepted URLs and manifest resource identifiers.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher, UrlError, canonicalize_origin, request_path, resolve, resource_key};
