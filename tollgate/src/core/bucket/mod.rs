//! Per-client token bucket state
//!
//! This module provides the [`TokenBucket`] type which holds the token count
//! and refill bookkeeping for a single client key. It is plain arithmetic
//! over its own fields; serialization of concurrent access is the job of
//! [`BucketStore`](crate::BucketStore).

use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

/// Refill parameters shared by every bucket created from the same config
///
/// # Example
///
/// ```
/// use tollgate::RefillPolicy;
/// use std::time::Duration;
///
/// // Burst of 3, one token back every 30 seconds
/// let policy = RefillPolicy::new(3, Duration::from_secs(30), 1);
/// assert_eq!(policy.capacity(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillPolicy {
    capacity: u64,
    refill_interval: Duration,
    refill_amount: u64,
}

impl RefillPolicy {
    /// Creates a refill policy
    ///
    /// Parameters are not validated here; [`GateConfig::validate`](crate::GateConfig::validate)
    /// rejects zero values before any bucket is built.
    pub fn new(capacity: u64, refill_interval: Duration, refill_amount: u64) -> Self {
        RefillPolicy {
            capacity,
            refill_interval,
            refill_amount,
        }
    }

    /// Maximum number of tokens a bucket can hold
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Duration after which `refill_amount` tokens are restored
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Tokens restored per elapsed interval
    pub fn refill_amount(&self) -> u64 {
        self.refill_amount
    }
}

/// Token bucket for a single client key
///
/// Tokens are kept in `[0, capacity]`. Refills happen in whole intervals:
/// when `k` full intervals have elapsed since the last refill, `k *
/// refill_amount` tokens are added and the refill clock advances by exactly
/// `k` intervals, so partial progress toward the next token is kept.
///
/// # Example
///
/// ```
/// use tollgate::{RefillPolicy, TokenBucket};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let policy = RefillPolicy::new(2, Duration::from_secs(10), 1);
/// let mut bucket = TokenBucket::new(policy, start);
///
/// assert!(bucket.try_consume());
/// assert!(bucket.try_consume());
/// assert!(!bucket.try_consume());
///
/// bucket.refill(start + Duration::from_secs(10));
/// assert_eq!(bucket.tokens(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    policy: RefillPolicy,
    tokens: u64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// Creates a full bucket whose refill and last-seen clocks start at `now`
    pub fn new(policy: RefillPolicy, now: Instant) -> Self {
        TokenBucket {
            policy,
            tokens: policy.capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Adds the tokens earned since the last refill
    ///
    /// Does nothing until at least one full interval has elapsed. A `now`
    /// earlier than the last refill is ignored, so the refill clock never
    /// moves backwards.
    pub fn refill(&mut self, now: Instant) {
        let Some(elapsed) = now.checked_duration_since(self.last_refill) else {
            return;
        };

        let interval = self.policy.refill_interval;
        if interval.is_zero() || elapsed < interval {
            return;
        }

        let interval_ns = interval.as_nanos();
        let elapsed_ns = elapsed.as_nanos();
        let periods = elapsed_ns / interval_ns;

        let earned = u64::try_from(periods)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.policy.refill_amount);
        self.tokens = self
            .tokens
            .saturating_add(earned)
            .min(self.policy.capacity);

        // Advance by whole periods only: elapsed minus the leftover fraction
        let leftover_ns = elapsed_ns % interval_ns;
        let leftover = Duration::from_nanos(u64::try_from(leftover_ns).unwrap_or(u64::MAX));
        self.last_refill += elapsed.saturating_sub(leftover);
    }

    /// Takes one token if any is available
    ///
    /// Returns `true` when the token was taken. A denial leaves the bucket
    /// untouched.
    pub fn try_consume(&mut self) -> bool {
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Records that the client was seen at `now`
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Whether the client has been idle for longer than `ttl` at `now`
    pub fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn capacity(&self) -> u64 {
        self.policy.capacity
    }

    pub fn policy(&self) -> RefillPolicy {
        self.policy
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}
