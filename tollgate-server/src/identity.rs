//! Client identity resolution
//!
//! The admission gate only sees opaque string keys. This module turns an
//! incoming HTTP request into such a key. Each resolver prefixes its keys with
//! the strategy that produced them, so an IP address and a body field value
//! can never share a bucket.
//!
//! # Available Resolvers
//!
//! - [`RemoteAddrResolver`]: `ip:<address>` from the peer address
//! - [`BodyFieldResolver`]: `field:<name>:<value>` from a JSON body field
//! - [`GlobalResolver`]: the constant key `global`

use crate::metrics::IdentityKind;
use crate::types::Message;
use async_trait::async_trait;
use axum::{
    Json,
    body::{self, Body},
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};


/// Default body field used by [`BodyFieldResolver`]
pub const DEFAULT_IDENTITY_FIELD: &str = "mobileNumber";

/// Largest body [`BodyFieldResolver`] will buffer
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Key shared by every request on a globally limited route
pub const GLOBAL_KEY: &str = "global";

/// Reasons a client key could not be derived from a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("request body is not valid JSON")]
    InvalidBody,
    #[error("request body needs a non-empty string '{0}' field")]
    MissingField(String),
    #[error("request body exceeds {} bytes", MAX_BODY_BYTES)]
    BodyTooLarge,
    #[error("peer address is unavailable")]
    MissingAddress,
    #[error("invalid client address '{0}'")]
    InvalidAddress(String),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(Message::failed(self.to_string())),
        )
            .into_response()
    }
}

/// Strategy for deriving a client key from a request
///
/// Resolvers receive the request mutably so they can consume and restore the
/// body. Whatever they leave in place is what the downstream handler sees.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, request: &mut Request<Body>) -> Result<String, IdentityError>;

    /// Label used for metrics
    fn kind(&self) -> IdentityKind;
}

/// Keys requests by the address of the connected peer
///
/// The peer address comes from axum's `ConnectInfo<SocketAddr>` extension, so
/// the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// Behind a reverse proxy every request arrives from the proxy. Enabling
/// `trust_proxy_headers` makes the resolver prefer `X-Real-IP`, then the first
/// `X-Forwarded-For` entry. Only enable it when a proxy you control sets those
/// headers; otherwise clients can pick their own key.
#[derive(Debug, Clone, Default)]
pub struct RemoteAddrResolver {
    trust_proxy_headers: bool,
}

impl RemoteAddrResolver {
    pub fn new(trust_proxy_headers: bool) -> Self {
        Self {
            trust_proxy_headers,
        }
    }

    fn forwarded_ip(headers: &HeaderMap) -> Option<&str> {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .or_else(|| {
                headers
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

#[async_trait]
impl IdentityResolver for RemoteAddrResolver {
    async fn resolve(&self, request: &mut Request<Body>) -> Result<String, IdentityError> {
        if self.trust_proxy_headers {
            if let Some(forwarded) = Self::forwarded_ip(request.headers()) {
                let ip: IpAddr = forwarded
                    .parse()
                    .map_err(|_| IdentityError::InvalidAddress(forwarded.to_string()))?;
                return Ok(format!("ip:{ip}"));
            }
        }

        let ConnectInfo(addr) = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .ok_or(IdentityError::MissingAddress)?;
        Ok(format!("ip:{}", addr.ip()))
    }

    fn kind(&self) -> IdentityKind {
        IdentityKind::RemoteAddr
    }
}

/// Keys requests by a field of their JSON body
///
/// The body is buffered (up to [`MAX_BODY_BYTES`]) and put back on the
/// request, so handlers can still extract it. Only non-empty string values
/// are accepted; anything else is a [`IdentityError::MissingField`].
#[derive(Debug, Clone)]
pub struct BodyFieldResolver {
    field: String,
}

impl BodyFieldResolver {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for BodyFieldResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_FIELD)
    }
}

#[async_trait]
impl IdentityResolver for BodyFieldResolver {
    async fn resolve(&self, request: &mut Request<Body>) -> Result<String, IdentityError> {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
            return Err(IdentityError::BodyTooLarge);
        }

        let body = std::mem::take(request.body_mut());
        // Errors here are the length limit on streamed bodies; a failed read
        // means the client is already gone
        let bytes = body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| IdentityError::BodyTooLarge)?;

        let parsed = serde_json::from_slice::<serde_json::Value>(&bytes);
        *request.body_mut() = Body::from(bytes);
        let value = parsed.map_err(|_| IdentityError::InvalidBody)?;

        let field = match value.get(&self.field) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(IdentityError::MissingField(self.field.clone())),
        };

        Ok(format!("field:{}:{field}", self.field))
    }

    fn kind(&self) -> IdentityKind {
        IdentityKind::BodyField
    }
}

/// Puts every request in one shared bucket
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalResolver;

#[async_trait]
impl IdentityResolver for GlobalResolver {
    async fn resolve(&self, _request: &mut Request<Body>) -> Result<String, IdentityError> {
        Ok(GLOBAL_KEY.to_string())
    }

    fn kind(&self) -> IdentityKind {
        IdentityKind::Global
    }
}
