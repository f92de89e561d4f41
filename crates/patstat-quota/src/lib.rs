//! Tiered, windowed request-quota tracking.
//!
//! Callers are identified by a privacy-preserving hash of their credential
//! (or IP when no credential is present) and mapped to a [`Tier`] with a
//! fixed monthly request budget. The window rolls lazily on access, not on
//! a background timer, and the check-and-increment step is atomic per key.

pub mod key;
pub mod tier;
pub mod tracker;

pub use key::CallerKey;
pub use tier::{Tier, TierLimits};
pub use tracker::{QuotaDecision, QuotaTracker};
