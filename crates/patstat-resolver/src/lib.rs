//! Cache-aside resolution of patent legal status.
//!
//! The [`PatentResolver`] ties the store and the source adapters together:
//! normalize the identifier, consult the cache, and on a miss walk the
//! jurisdiction's adapter chain, writing the first successful record back
//! through the cache. Failures stay tagged ([`ResolveError`]) so callers
//! can tell "no such patent" from "the provider is down".

pub mod error;
pub mod resolver;

pub use error::ResolveError;
pub use resolver::{PatentResolver, Resolution};
