//! Caller tiers and their request budgets.

use serde::{Deserialize, Serialize};

/// A caller classification determining the monthly request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
}

impl Tier {
    /// Parses a tier label; unknown labels fall back to `Free`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "pro" => Self::Pro,
            _ => Self::Free,
        }
    }

    /// Returns the lowercase label for this tier.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }
}

/// Per-tier monthly request limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierLimits {
    /// Limit for the free tier.
    pub free: u64,
    /// Limit for the basic tier.
    pub basic: u64,
    /// Limit for the pro tier.
    pub pro: u64,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            free: 20,
            basic: 1_000,
            pro: 10_000,
        }
    }
}

impl TierLimits {
    /// Returns the configured limit for a tier.
    #[must_use]
    pub fn for_tier(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
        }
    }
}
