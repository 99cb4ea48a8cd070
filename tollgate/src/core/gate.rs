//! Admission decisions for client keys
//!
//! [`AdmissionGate`] is the single entry point callers use: hand it a client
//! key and the current time, get back [`Decision::Allow`] or
//! [`Decision::Deny`]. How the key is derived from a request is up to the
//! caller.

use super::{ConfigError, GateConfig};
use crate::core::evictor::Evictor;
use crate::core::store::BucketStore;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A token was available and has been consumed
    Allow,
    /// The client's bucket is empty
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_denied(self) -> bool {
        matches!(self, Decision::Deny)
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Per-client token bucket admission control
///
/// The gate is cheap to clone; clones share the same bucket store. It holds
/// no state of its own beyond what lives in the buckets.
///
/// # Example
///
/// ```
/// use tollgate::{AdmissionGate, Decision};
/// use std::time::{Duration, Instant};
///
/// // Burst of 3, one token back every 30 seconds
/// let gate = AdmissionGate::builder()
///     .capacity(3)
///     .refill_interval(Duration::from_secs(30))
///     .refill_amount(1)
///     .build()?;
///
/// let t0 = Instant::now();
/// assert_eq!(gate.check("A", t0), Decision::Allow);
/// assert_eq!(gate.check("A", t0), Decision::Allow);
/// assert_eq!(gate.check("A", t0), Decision::Allow);
/// assert_eq!(gate.check("A", t0), Decision::Deny);
///
/// let t31 = t0 + Duration::from_secs(31);
/// assert_eq!(gate.check("A", t31), Decision::Allow);
/// assert_eq!(gate.check("A", t31), Decision::Deny);
/// # Ok::<(), tollgate::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct AdmissionGate {
    store: Arc<BucketStore>,
    config: GateConfig,
}

/// Builder for configuring an AdmissionGate
///
/// Starts from [`GateConfig::default`]; every limit must be positive or
/// [`build`](AdmissionGateBuilder::build) fails.
pub struct AdmissionGateBuilder {
    config: GateConfig,
    shards: Option<usize>,
    store_capacity: Option<usize>,
}

impl AdmissionGate {
    /// Create a gate from a complete configuration
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any parameter is zero.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    /// Create a new builder for configuring an AdmissionGate
    pub fn builder() -> AdmissionGateBuilder {
        AdmissionGateBuilder {
            config: GateConfig::default(),
            shards: None,
            store_capacity: None,
        }
    }

    /// Decide whether a request from `key` is admitted at `now`
    ///
    /// Refill, consume and the last-seen update happen under one lock, so
    /// concurrent checks for the same key are linearized and token
    /// accounting stays exact.
    pub fn check(&self, key: &str, now: Instant) -> Decision {
        let mut bucket = self.store.get_or_create(key, now);
        bucket.refill(now);
        let allowed = bucket.try_consume();
        bucket.touch(now);
        drop(bucket);

        if !allowed {
            tracing::trace!(key, "request denied");
        }

        Decision::from(allowed)
    }

    /// Forget the bucket for `key`
    ///
    /// Returns `true` if one existed. The next check starts from a full bucket.
    pub fn reset(&self, key: &str) -> bool {
        self.store.remove(key)
    }

    /// Tokens currently held by `key`, without refilling or touching it
    pub fn tokens(&self, key: &str) -> Option<u64> {
        self.store.get(key).map(|bucket| bucket.tokens())
    }

    /// An evictor over this gate's store, using the configured TTL and interval
    pub fn evictor(&self) -> Evictor {
        Evictor::new(
            Arc::clone(&self.store),
            self.config.eviction_ttl,
            self.config.sweep_interval,
        )
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

impl AdmissionGateBuilder {
    /// Replace every limit at once
    pub fn config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of tokens per client (burst size)
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the time after which `refill_amount` tokens are restored
    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.config.refill_interval = interval;
        self
    }

    /// Set the number of tokens restored per interval
    pub fn refill_amount(mut self, amount: u64) -> Self {
        self.config.refill_amount = amount;
        self
    }

    /// Set the idle time after which a client's bucket is evicted
    pub fn eviction_ttl(mut self, ttl: Duration) -> Self {
        self.config.eviction_ttl = ttl;
        self
    }

    /// Set the time between eviction sweeps
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the number of lock shards in the bucket store
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Set the expected number of distinct client keys
    pub fn store_capacity(mut self, capacity: usize) -> Self {
        self.store_capacity = Some(capacity);
        self
    }

    /// Validate the configuration and build the gate
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any limit or interval is zero.
    pub fn build(self) -> Result<AdmissionGate, ConfigError> {
        self.config.validate()?;

        let mut store = BucketStore::builder(self.config.refill_policy());
        if let Some(shards) = self.shards {
            store = store.shards(shards);
        }
        if let Some(capacity) = self.store_capacity {
            store = store.capacity(capacity);
        }

        Ok(AdmissionGate {
            store: Arc::new(store.build()),
            config: self.config,
        })
    }
}
