//! # Tollgate
//!
//! Per-client admission control with token buckets for Rust.
//!
//! ## Overview
//!
//! Tollgate decides, in bounded time, whether a request from a given client
//! should be admitted:
//! - **Burst allowance**: each client starts with `capacity` tokens
//! - **Steady recovery**: `refill_amount` tokens come back every `refill_interval`
//! - **Exact accounting**: concurrent checks for one client are serialized
//! - **Bounded memory**: buckets of idle clients are evicted after a TTL
//!
//! ## Quick Start
//!
//! ```
//! use tollgate::AdmissionGate;
//! use std::time::{Duration, Instant};
//!
//! // Burst of 4, two tokens back every second
//! let gate = AdmissionGate::builder()
//!     .capacity(4)
//!     .refill_interval(Duration::from_secs(1))
//!     .refill_amount(2)
//!     .build()?;
//!
//! if gate.check("ip:203.0.113.7", Instant::now()).is_allowed() {
//!     println!("Request allowed!");
//! } else {
//!     println!("Rate limited!");
//! }
//! # Ok::<(), tollgate::ConfigError>(())
//! ```
//!
//! ## Client Keys
//!
//! The gate accepts any string as a client key and never looks inside it.
//! Deriving the key from a request (peer address, an authenticated user, a
//! body field) is the caller's job. Requests with the same key share a bucket.
//!
//! ## Time
//!
//! Every operation takes the current time as a parameter, so tests can drive
//! the clock explicitly:
//!
//! ```
//! use tollgate::{AdmissionGate, Decision};
//! use std::time::{Duration, Instant};
//!
//! let gate = AdmissionGate::builder()
//!     .capacity(1)
//!     .refill_interval(Duration::from_secs(10))
//!     .refill_amount(1)
//!     .build()?;
//!
//! let t0 = Instant::now();
//! assert_eq!(gate.check("user:1", t0), Decision::Allow);
//! assert_eq!(gate.check("user:1", t0), Decision::Deny);
//! assert_eq!(gate.check("user:1", t0 + Duration::from_secs(10)), Decision::Allow);
//! # Ok::<(), tollgate::ConfigError>(())
//! ```
//!
//! ## Eviction
//!
//! Buckets are created on first sight of a key. [`Evictor::sweep`] removes
//! those whose client has been idle for longer than the eviction TTL. With
//! the `tokio` feature the sweep can run as a background task:
//!
//! ```ignore
//! let gate = AdmissionGate::builder()
//!     .eviction_ttl(Duration::from_secs(180))
//!     .sweep_interval(Duration::from_secs(60))
//!     .build()?;
//!
//! let evictor = gate.evictor().spawn();
//! // ... serve requests ...
//! evictor.shutdown().await;
//! ```
//!
//! ## Thread Safety
//!
//! [`AdmissionGate`] is `Send + Sync` and cheap to clone; clones share one
//! [`BucketStore`]. The store shards keys across several locks, so checks for
//! different clients rarely contend.
//!
//! ## Features
//!
//! - `ahash` (default): Use AHash for shard selection and bucket maps
//! - `tokio`: Background evictor task ([`Evictor::spawn`])

pub mod core;

pub use core::{
    AdmissionGate, AdmissionGateBuilder, BucketHandle, BucketStore, BucketStoreBuilder,
    ConfigError, Decision, Evictor, GateConfig, RefillPolicy, SweepReport, TokenBucket,
};

#[cfg(feature = "tokio")]
pub use core::EvictorHandle;
