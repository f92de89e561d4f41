//! The windowed quota tracker.

use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;

use crate::key::CallerKey;
use crate::tier::{Tier, TierLimits};

/// Outcome of a quota check, exposed for response-header annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Whether the request was admitted.
    pub allowed: bool,
    /// Requests remaining in the current window after this decision.
    pub remaining: u64,
    /// The tier's configured limit.
    pub limit: u64,
    /// When the current window ends and the counter resets.
    pub reset_at: OffsetDateTime,
}

/// Per-key counter state. Created lazily on first sight of a key and reset
/// in place when its window has passed.
#[derive(Debug)]
struct QuotaCounter {
    tier: Tier,
    count: u64,
    reset_at: OffsetDateTime,
}

/// Tiered, windowed request counter keyed by caller identity.
///
/// The check (`count < limit`) and the increment run as one atomic step per
/// key: the counter is mutated while the map's entry guard is held, so two
/// concurrent requests for the same key can never both observe
/// `count == limit - 1` and both be admitted. Unrelated keys lock
/// independently and are not serialized against each other.
///
/// State is instance-owned and in-process; running more than one resolver
/// instance requires a shared backing store instead, since these counters
/// are not visible across processes.
pub struct QuotaTracker {
    counters: DashMap<String, QuotaCounter>,
    limits: TierLimits,
    window: Duration,
}

impl QuotaTracker {
    /// Default quota window: a 30-day month.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Creates a tracker with the given per-tier limits and window length.
    #[must_use]
    pub fn new(limits: TierLimits, window: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            limits,
            window,
        }
    }

    /// Creates a tracker with default limits and a 30-day window.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(TierLimits::default(), Self::DEFAULT_WINDOW)
    }

    /// Checks the caller's quota and, if within limits, consumes one request.
    ///
    /// The window rolls lazily: the first call after `reset_at` has passed
    /// resets the count to zero and starts a new window before applying its
    /// own increment, so it is admitted even if the prior window was
    /// exhausted.
    pub fn check_and_consume(&self, key: &CallerKey, tier: Tier) -> QuotaDecision {
        self.check_and_consume_at(key, tier, OffsetDateTime::now_utc())
    }

    /// Clock-injected variant of [`QuotaTracker::check_and_consume`].
    pub fn check_and_consume_at(
        &self,
        key: &CallerKey,
        tier: Tier,
        now: OffsetDateTime,
    ) -> QuotaDecision {
        let limit = self.limits.for_tier(tier);

        // The entry guard holds the shard lock for this key across the whole
        // read-modify-write, which is what makes the step atomic per key.
        let mut counter = self
            .counters
            .entry(key.as_str().to_string())
            .or_insert_with(|| QuotaCounter {
                tier,
                count: 0,
                reset_at: now + self.window,
            });

        counter.tier = tier;
        if now >= counter.reset_at {
            counter.count = 0;
            counter.reset_at = now + self.window;
        }

        if counter.count >= limit {
            tracing::debug!(key = %key, tier = tier.label(), limit, "quota exhausted");
            return QuotaDecision {
                allowed: false,
                remaining: 0,
                limit,
                reset_at: counter.reset_at,
            };
        }

        counter.count += 1;
        QuotaDecision {
            allowed: true,
            remaining: limit - counter.count,
            limit,
            reset_at: counter.reset_at,
        }
    }

    /// Removes a caller's counter, if present. Administrative use only.
    pub fn evict(&self, key: &CallerKey) -> bool {
        self.counters.remove(key.as_str()).is_some()
    }

    /// Returns the number of tracked caller keys.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.counters.len()
    }
}
