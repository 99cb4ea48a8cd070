//! Core components of the tollgate admission control library
//!
//! This module contains the fundamental building blocks:
//! - [`bucket`]: Per-client token bucket arithmetic
//! - [`store`]: Sharded concurrent storage for buckets
//! - [`evictor`]: Removal of buckets for idle clients
//! - [`gate`]: The admission decision entry point

pub mod bucket;
pub mod config;
pub mod evictor;
pub mod gate;
pub mod store;

pub use bucket::{RefillPolicy, TokenBucket};
pub use config::GateConfig;
#[cfg(feature = "tokio")]
pub use evictor::EvictorHandle;
pub use evictor::{Evictor, SweepReport};
pub use gate::{AdmissionGate, AdmissionGateBuilder, Decision};
pub use store::{BucketHandle, BucketStore, BucketStoreBuilder};

/// Errors raised when building an admission gate from invalid parameters
///
/// Checks themselves never fail; every variant here is a startup error.
///
/// # Example
///
/// ```
/// use tollgate::{AdmissionGate, ConfigError};
///
/// let result = AdmissionGate::builder().capacity(0).build();
/// assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    #[error("refill interval must be greater than zero")]
    ZeroRefillInterval,

    #[error("refill amount must be greater than zero")]
    ZeroRefillAmount,

    #[error("eviction TTL must be greater than zero")]
    ZeroEvictionTtl,

    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}
