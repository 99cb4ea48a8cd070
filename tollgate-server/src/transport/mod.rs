//! Transport layer for the admission control server
//!
//! A transport accepts client connections and places the shared
//! [`AppState`] in front of its endpoints. All transports limit through the
//! same [`AdmissionGate`], so a client's budget is shared across them.
//!
//! # Available Transports
//!
//! - [`http`]: REST API with JSON bodies

pub mod http;


use crate::metrics::Metrics;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tollgate::AdmissionGate;

/// State shared by every transport
#[derive(Clone)]
pub struct AppState {
    pub gate: AdmissionGate,
    pub metrics: Arc<Metrics>,
    /// Body field used to key the onboarding route
    pub identity_field: String,
    /// Whether `X-Real-IP` / `X-Forwarded-For` are trusted for address keys
    pub trust_proxy_headers: bool,
}

/// Common interface for all transport implementations
#[async_trait]
pub trait Transport {
    /// Start the transport server
    ///
    /// Binds to the configured address and serves until an error occurs or
    /// the surrounding task is cancelled.
    async fn start(self, state: AppState) -> Result<()>;
}
