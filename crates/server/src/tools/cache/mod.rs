//! Cache inspection and maintenance tools.
//!
//! This module provides tools for looking at and destroying the managed store.

pub mod keys;
pub mod purge;
pub mod status;

pub use keys::keys_impl;
pub use purge::purge_impl;
pub use status::status_impl;
