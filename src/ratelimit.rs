//! Per-provider rate limiting.
//!
//! A small capability trait so the classifier can be tested with a no-op
//! limiter, backed in production by a governor keyed limiter with a
//! rolling one-minute window shared across all models of a provider.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};

/// Keyed limiter type alias.
type KeyedLimiter = GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Capability for acquiring a rate-limit slot.
///
/// `try_acquire` is non-blocking: a denied slot is reported to the caller,
/// which treats it as a model failure rather than waiting.
pub trait RateLimit: Send + Sync {
    /// Try to take one slot for the given key. Returns false when the
    /// window is exhausted.
    fn try_acquire(&self, key: &str) -> bool;
}

/// Production limiter: N requests per rolling minute per provider key.
///
/// Safe under concurrent classification calls; governor's keyed state does
/// the atomic increment-and-check.
pub struct ProviderRateLimiter {
    limiter: KeyedLimiter,
}

impl ProviderRateLimiter {
    /// Create a limiter allowing `requests_per_minute` calls per key.
    pub fn new(requests_per_minute: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: GovRateLimiter::keyed(quota),
        }
    }
}

impl RateLimit for ProviderRateLimiter {
    fn try_acquire(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }
}

/// Limiter that always grants; used in tests and mock-only deployments.
pub struct NoopRateLimiter;

impl RateLimit for NoopRateLimiter {
    fn try_acquire(&self, _key: &str) -> bool {
        true
    }
}
