//! Admission middleware
//!
//! [`admit`] runs in front of a limited route: it resolves the client key,
//! asks the shared [`AdmissionGate`] for a decision and either forwards the
//! request or answers with `429 Too Many Requests`. Identity failures answer
//! `400 Bad Request` without touching the gate.

use crate::identity::IdentityResolver;
use crate::metrics::Metrics;
use crate::types::Message;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tollgate::AdmissionGate;

/// Per-route middleware state
#[derive(Clone)]
pub struct Admission {
    gate: AdmissionGate,
    resolver: Arc<dyn IdentityResolver>,
    metrics: Arc<Metrics>,
}

impl Admission {
    pub fn new(
        gate: AdmissionGate,
        resolver: impl IdentityResolver + 'static,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            gate,
            resolver: Arc::new(resolver),
            metrics,
        }
    }
}

/// Middleware function for use with `axum::middleware::from_fn_with_state`
pub async fn admit(
    State(admission): State<Admission>,
    mut request: Request,
    next: Next,
) -> Response {
    let kind = admission.resolver.kind();

    let key = match admission.resolver.resolve(&mut request).await {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), "identity resolution failed: {}", e);
            admission.metrics.record_identity_error(kind);
            return e.into_response();
        }
    };

    let start = Instant::now();
    let decision = admission.gate.check(&key, start);
    let latency_us = start.elapsed().as_micros() as u64;
    admission
        .metrics
        .record_decision(kind, latency_us, decision.is_allowed());

    if decision.is_denied() {
        tracing::debug!(key = %key, path = %request.uri().path(), "request denied");
        return (StatusCode::TOO_MANY_REQUESTS, Json(Message::at_capacity())).into_response();
    }

    next.run(request).await
}
