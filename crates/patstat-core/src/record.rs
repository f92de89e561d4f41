//! The normalized patent record shared by every source adapter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Date, OffsetDateTime};

use crate::id::PatentId;

/// Legal status of a patent, as far as the engine normalizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatentStatus {
    /// A grant event was observed.
    Granted,
    /// Application on file, not yet granted.
    Pending,
    /// Provider reports the patent as in force.
    Active,
    /// Lapsed or past its term.
    Expired,
    /// The provider payload did not allow a determination.
    Unknown,
}

impl PatentStatus {
    /// Maps a free-form provider status string onto the normalized enum.
    ///
    /// `expired`/`abandoned`/`lapsed` anywhere in the string count as
    /// expired; unrecognized strings collapse to `Unknown`.
    #[must_use]
    pub fn from_provider_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("expired") || lower.contains("abandoned") || lower.contains("lapsed") {
            Self::Expired
        } else if lower.contains("granted") {
            Self::Granted
        } else if lower.contains("pending") {
            Self::Pending
        } else if lower.contains("active") || lower.contains("in force") {
            Self::Active
        } else {
            Self::Unknown
        }
    }
}

/// An expiry date together with its provenance.
///
/// `computed = true` marks the best-effort filing-date + 20-years estimate;
/// `false` means the provider asserted the date itself. The two must stay
/// distinguishable downstream, so this never collapses to a bare date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryDate {
    /// The calendar date the patent (is estimated to) expire(s).
    pub date: Date,
    /// Whether the engine derived the date rather than the provider.
    pub computed: bool,
}

impl ExpiryDate {
    /// An expiry date asserted by the provider.
    #[must_use]
    pub fn asserted(date: Date) -> Self {
        Self {
            date,
            computed: false,
        }
    }

    /// An expiry date the engine estimated from the filing date.
    #[must_use]
    pub fn estimated(date: Date) -> Self {
        Self {
            date,
            computed: true,
        }
    }
}

/// The normalized unit every source adapter produces and the cache stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Canonical identifier.
    pub id: PatentId,
    /// Normalized legal status.
    pub status: PatentStatus,
    /// Expiry date, if known or estimable.
    pub expiry: Option<ExpiryDate>,
    /// Role to jurisdiction-code mapping, e.g. `{"primary": "EP"}`.
    pub jurisdictions: BTreeMap<String, String>,
    /// Provider-reported lapse reason, if any.
    pub lapse_reason: Option<String>,
    /// Name of the source that produced the record.
    pub source: String,
    /// Opaque provider payload, kept for audit and debugging only.
    pub raw: Value,
    /// When the record was fetched from the provider.
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

impl PatentRecord {
    /// Creates a record with the primary jurisdiction derived from the id.
    #[must_use]
    pub fn new(id: PatentId, status: PatentStatus, source: impl Into<String>, raw: Value) -> Self {
        let mut jurisdictions = BTreeMap::new();
        jurisdictions.insert("primary".to_string(), id.jurisdiction().prefix().to_string());

        Self {
            id,
            status,
            expiry: None,
            jurisdictions,
            lapse_reason: None,
            source: source.into(),
            raw,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the expiry date.
    #[must_use]
    pub fn with_expiry(mut self, expiry: ExpiryDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the lapse reason.
    #[must_use]
    pub fn with_lapse_reason(mut self, reason: impl Into<String>) -> Self {
        self.lapse_reason = Some(reason.into());
        self
    }
}

/// Theoretical utility-patent expiry: filing date plus twenty years.
///
/// Returns `None` only for a filing date whose year + 20 overflows the
/// calendar. A February 29 filing clamps to February 28 in the target year.
#[must_use]
pub fn utility_term_expiry(filing: Date) -> Option<Date> {
    let year = filing.year() + 20;
    Date::from_calendar_date(year, filing.month(), filing.day())
        .or_else(|_| Date::from_calendar_date(year, filing.month(), 28))
        .ok()
}
