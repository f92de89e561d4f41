//! Cache store abstraction for normalized patent records.
//!
//! The resolution engine is cache-aside: it consults a [`CacheStore`] first
//! and only reaches the external sources on a miss. This crate defines the
//! store contract, the stored entry shape, and the in-memory reference
//! backend used by single-process deployments.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::StoreError;
pub use memory::MemoryCacheStore;
pub use traits::CacheStore;
pub use types::{CacheEntry, PurgeTarget};
