//! Canonical patent identifiers.
//!
//! A [`PatentId`] is the primary key of the whole engine: cache entries,
//! adapter lookups and quota-free observability views are all keyed by it.
//! Construction goes through [`PatentId::normalize`], so a `PatentId` held
//! anywhere in the system is guaranteed to be uppercase, free of internal
//! whitespace, and prefixed with a recognized two-letter jurisdiction code.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical identifier pattern: jurisdiction prefix plus at least seven digits.
static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(EP|US)(\d{7,})$").expect("canonical id pattern is valid"));

/// Errors produced while normalizing a raw patent identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    /// The input does not reduce to `<EP|US><7+ digits>` after normalization.
    #[error("Invalid patent identifier '{input}': expected format like EP1234567 or US7654321")]
    InvalidFormat {
        /// The normalized form of the rejected input.
        input: String,
    },
}

/// A jurisdiction the engine has source adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    /// European Patent Office.
    Ep,
    /// United States Patent and Trademark Office.
    Us,
}

impl Jurisdiction {
    /// Returns the two-letter identifier prefix for this jurisdiction.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ep => "EP",
            Self::Us => "US",
        }
    }

    /// Resolves a two-letter prefix to a jurisdiction, if recognized.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "EP" => Some(Self::Ep),
            "US" => Some(Self::Us),
            _ => None,
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A normalized, validated patent identifier.
///
/// Serializes as a plain string so stored records keep the canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatentId(String);

impl PatentId {
    /// Normalizes raw input into a canonical identifier.
    ///
    /// Strips surrounding and internal whitespace, uppercases, then validates
    /// against `^(EP|US)\d{7,}$`. Normalization is idempotent: feeding the
    /// canonical form back in yields the same identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidFormat`] when the cleaned input does not
    /// match the canonical pattern.
    pub fn normalize(raw: &str) -> Result<Self, IdError> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        if CANONICAL.is_match(&cleaned) {
            Ok(Self(cleaned))
        } else {
            Err(IdError::InvalidFormat { input: cleaned })
        }
    }

    /// Returns the canonical identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the jurisdiction this identifier belongs to.
    #[must_use]
    pub fn jurisdiction(&self) -> Jurisdiction {
        // The constructor only admits recognized prefixes.
        Jurisdiction::from_prefix(&self.0[..2]).expect("canonical id carries a recognized prefix")
    }

    /// Returns the digit portion of the identifier.
    ///
    /// Providers that key by their own serial (USPTO) query with this.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for PatentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value)
    }
}

impl From<PatentId> for String {
    fn from(id: PatentId) -> Self {
        id.0
    }
}
