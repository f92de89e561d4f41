//! Source adapters for external patent data providers.
//!
//! Each provider implements the [`SourceAdapter`] contract: fetch and
//! normalize one record for one canonical identifier. Adapters own their
//! credential state (the EPO adapter caches an OAuth2 bearer token), apply
//! a shared bounded-timeout/retry policy, and are selected per jurisdiction
//! through the [`AdapterRegistry`] so providers can be added, removed, or
//! disabled via configuration rather than code change.

pub mod adapter;
pub mod epo;
pub mod error;
pub mod lens;
pub mod registry;
pub mod retry;
pub mod uspto;

pub use adapter::SourceAdapter;
pub use epo::{EpoAdapter, EpoConfig};
pub use error::SourceError;
pub use lens::{LensAdapter, LensConfig};
pub use registry::AdapterRegistry;
pub use retry::RetryPolicy;
pub use uspto::{UsptoAdapter, UsptoConfig};
