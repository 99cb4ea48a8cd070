//! # Tollgate Server
//!
//! An HTTP server that puts per-client admission control in front of a small
//! demo API.
//!
//! ## Purpose
//!
//! The server shows the [`tollgate`] core wired into a real request path:
//!
//! - **Identity resolution**: each limited route derives a client key from
//!   the request (peer address, a JSON body field, or one global key)
//! - **Admission**: the key is checked against one shared [`tollgate::AdmissionGate`]
//! - **Eviction**: a background task drops buckets of idle clients
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! tollgate --help
//!
//! # Burst of 4, two tokens back every second (the defaults)
//! tollgate --port 8080
//!
//! # Stricter limits, evict after 5 idle minutes
//! tollgate --capacity 2 --refill-interval-ms 5000 --refill-amount 1 --eviction-ttl 300
//! ```
//!
//! ## Configuration
//!
//! Configure via CLI arguments or environment variables (CLI takes precedence):
//!
//! ```bash
//! export TOLLGATE_CAPACITY=10
//! export TOLLGATE_LOG_LEVEL=debug
//! tollgate
//!
//! # List all available environment variables
//! tollgate --list-env-vars
//! ```
//!
//! ## Endpoints
//!
//! | Route                  | Limited by          |
//! |------------------------|---------------------|
//! | `GET /ping`            | client address      |
//! | `GET /hello`           | shared global key   |
//! | `GET /hi`              | not limited         |
//! | `POST /api/v1/onboard` | `mobileNumber` field |
//! | `GET /health`          | not limited         |
//! | `GET /metrics`         | not limited         |
//!
//! Rejected requests get `429` with
//! `{"status":"Request Failed","body":"The API is at capacity, try again later."}`.
//!
//! ```bash
//! curl http://localhost:8080/ping
//! curl -X POST http://localhost:8080/api/v1/onboard \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Ada", "mobileNumber": "5551234"}'
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   request ──► IdentityResolver ──► AdmissionGate::check ──► handler
//!                     │                     │
//!                   400                    429
//!
//!   Evictor task ──► sweep every interval ──► Metrics
//! ```

pub mod admission;
pub mod config;
pub mod identity;
pub mod metrics;
pub mod transport;
pub mod types;
