//! HTTP surface of the patent resolution engine.
//!
//! Thin axum layer over [`patstat_resolver`]: one resolution endpoint
//! guarded by the tiered request quota, a health probe, cache
//! observability views, and an administrative purge.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;

pub use bootstrap::build_state;
pub use server::{PatstatServer, ServerBuilder, build_app};
pub use state::AppState;
