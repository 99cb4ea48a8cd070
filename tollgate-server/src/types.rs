//! Common types used across the server
//!
//! This module defines the JSON bodies exchanged with clients. Rate limit
//! rejections and identity failures share the [`Message`] status/body shape so
//! clients can handle every error the same way.

use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "Successful";
pub const STATUS_FAILED: &str = "Request Failed";

/// Body returned when a client is over its limit
pub const AT_CAPACITY: &str = "The API is at capacity, try again later.";

/// Status/body pair returned by the demo endpoints and by every rejection
///
/// # Example
///
/// ```json
/// {
///   "status": "Request Failed",
///   "body": "The API is at capacity, try again later."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: String,
    pub body: String,
}

impl Message {
    pub fn success(body: impl Into<String>) -> Self {
        Message {
            status: STATUS_SUCCESS.to_string(),
            body: body.into(),
        }
    }

    pub fn failed(body: impl Into<String>) -> Self {
        Message {
            status: STATUS_FAILED.to_string(),
            body: body.into(),
        }
    }

    pub fn at_capacity() -> Self {
        Self::failed(AT_CAPACITY)
    }
}

/// Onboarding request body
///
/// Kept as a raw JSON object because the field identifying the user is
/// configurable (`mobileNumber` by default).
///
/// ```json
/// {"name": "Ada", "mobileNumber": "5551234"}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnboardRequest(pub serde_json::Map<String, serde_json::Value>);

impl OnboardRequest {
    pub fn name(&self) -> &str {
        self.field("name").unwrap_or_default()
    }

    /// String value of `field`, if present
    pub fn field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(serde_json::Value::as_str)
    }
}

/// Onboarding response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardResponse {
    pub message: String,
    pub mobile: String,
}
