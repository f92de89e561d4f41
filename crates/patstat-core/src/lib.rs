//! Identifier and record model shared across the resolution engine.

pub mod id;
pub mod record;

pub use id::{IdError, Jurisdiction, PatentId};
pub use record::{ExpiryDate, PatentRecord, PatentStatus, utility_term_expiry};
