//! Admission gate configuration
//!
//! [`GateConfig`] carries every tunable of the gate. It is validated once, at
//! construction, so that a bad configuration fails at startup instead of
//! surfacing as odd decisions at request time.

use super::ConfigError;
use crate::core::bucket::RefillPolicy;
use std::time::Duration;

// Defaults: 2 requests per second with a burst of 4, idle clients dropped
// after 3 minutes, swept once a minute
const DEFAULT_CAPACITY: u64 = 4;
const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_REFILL_AMOUNT: u64 = 2;
const DEFAULT_EVICTION_TTL: Duration = Duration::from_secs(180);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Limits and eviction timing for an [`AdmissionGate`](crate::AdmissionGate)
///
/// # Example
///
/// ```
/// use tollgate::GateConfig;
/// use std::time::Duration;
///
/// let config = GateConfig {
///     capacity: 3,
///     refill_interval: Duration::from_secs(30),
///     refill_amount: 1,
///     ..GateConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Maximum tokens per client (burst allowance)
    pub capacity: u64,
    /// Time after which `refill_amount` tokens are restored
    pub refill_interval: Duration,
    /// Tokens restored per elapsed interval
    pub refill_amount: u64,
    /// Idle time after which a client's bucket may be evicted
    pub eviction_ttl: Duration,
    /// Time between eviction sweeps
    pub sweep_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            capacity: DEFAULT_CAPACITY,
            refill_interval: DEFAULT_REFILL_INTERVAL,
            refill_amount: DEFAULT_REFILL_AMOUNT,
            eviction_ttl: DEFAULT_EVICTION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl GateConfig {
    /// Check that every parameter is positive
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, in field order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.refill_interval.is_zero() {
            return Err(ConfigError::ZeroRefillInterval);
        }
        if self.refill_amount == 0 {
            return Err(ConfigError::ZeroRefillAmount);
        }
        if self.eviction_ttl.is_zero() {
            return Err(ConfigError::ZeroEvictionTtl);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }

    /// Refill parameters handed to every new bucket
    pub fn refill_policy(&self) -> RefillPolicy {
        RefillPolicy::new(self.capacity, self.refill_interval, self.refill_amount)
    }
}
