//! HTTP/JSON transport
//!
//! Demo endpoints behind the admission gate, one per identity strategy.
//!
//! # API Endpoints
//!
//! ## GET /ping
//!
//! Limited per client address.
//!
//! ```json
//! {"status": "Successful", "body": "Hi! You have reached the API. How may I help you?"}
//! ```
//!
//! ## GET /hello
//!
//! Limited globally: all clients share one bucket.
//!
//! ```json
//! {"status": "Successful", "body": "What can I assist you with?"}
//! ```
//!
//! ## GET /hi
//!
//! Same response as `/hello`, never limited.
//!
//! ## POST /api/v1/onboard
//!
//! Limited per value of the configured body field (`mobileNumber` by default).
//! The response echoes that field's value as `mobile`.
//!
//! ### Request Body
//!
//! ```json
//! {"name": "Ada", "mobileNumber": "5551234"}
//! ```
//!
//! ### Response
//!
//! ```json
//! {"message": "User onboarded successfully!", "mobile": "5551234"}
//! ```
//!
//! ## GET /health
//!
//! Health check endpoint. Returns "OK" with 200 status.
//!
//! ## GET /metrics
//!
//! Prometheus text exposition of the server metrics.
//!
//! # Errors
//!
//! - `429` with `{"status": "Request Failed", "body": "The API is at capacity, try again later."}`
//!   when the client is over its limit
//! - `400` with the same shape when the client key cannot be derived

use super::{AppState, Transport};
use crate::admission::{Admission, admit};
use crate::identity::{BodyFieldResolver, GlobalResolver, IdentityError, RemoteAddrResolver};
use crate::types::{Message, OnboardRequest, OnboardResponse};
use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub const PING_BODY: &str = "Hi! You have reached the API. How may I help you?";
pub const HELLO_BODY: &str = "What can I assist you with?";
pub const ONBOARDED: &str = "User onboarded successfully!";

/// HTTP transport implementation
pub struct HttpTransport {
    host: String,
    port: u16,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(self, state: AppState) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        serve(listener, state).await
    }
}

/// Serve the API on an already bound listener
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Build the API router
///
/// Address-keyed routes need `ConnectInfo<SocketAddr>` on each request; see
/// [`serve`].
pub fn router(state: AppState) -> Router {
    let by_addr = Admission::new(
        state.gate.clone(),
        RemoteAddrResolver::new(state.trust_proxy_headers),
        state.metrics.clone(),
    );
    let global = Admission::new(state.gate.clone(), GlobalResolver, state.metrics.clone());
    let by_field = Admission::new(
        state.gate.clone(),
        BodyFieldResolver::new(state.identity_field.clone()),
        state.metrics.clone(),
    );

    Router::new()
        .route(
            "/ping",
            get(ping).route_layer(middleware::from_fn_with_state(by_addr, admit)),
        )
        .route(
            "/hello",
            get(hello).route_layer(middleware::from_fn_with_state(global, admit)),
        )
        .route("/hi", get(hello))
        .route(
            "/api/v1/onboard",
            post(onboard).route_layer(middleware::from_fn_with_state(by_field, admit)),
        )
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn ping() -> Json<Message> {
    Json(Message::success(PING_BODY))
}

async fn hello() -> Json<Message> {
    Json(Message::success(HELLO_BODY))
}

async fn onboard(
    State(state): State<AppState>,
    Json(req): Json<OnboardRequest>,
) -> Result<Json<OnboardResponse>, IdentityError> {
    // Already checked by the body field resolver in front of this route
    let mobile = req
        .field(&state.identity_field)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| IdentityError::MissingField(state.identity_field.clone()))?;

    tracing::debug!(name = %req.name(), "onboarding user");
    Ok(Json(OnboardResponse {
        message: ONBOARDED.to_string(),
        mobile: mobile.to_string(),
    }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.set_active_keys(state.gate.store().len());
    state.metrics.export_prometheus()
}
