//! GraphDB query registry
//!
//! Tracks long-lived, stateful query executions so they stay reachable by a
//! stable (tenant, query id) key across client round-trips, are never used by
//! two callers at once, and are reclaimed when the client abandons them.

pub mod api;
pub mod config;
pub mod core;
pub mod query;
pub mod utils;
