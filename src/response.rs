//! Raw response type and the response classification procedure.
//!
//! Every internal API call funnels its raw response through [`classify`],
//! which maps it to exactly one typed outcome.  The precedence is
//! load-bearing and must not be reordered: body content wins over the HTTP
//! status whenever the body parses, and an embedded `success: false` flag
//! wins over everything else (a 200 body can still be a domain failure).

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Raw response
// ---------------------------------------------------------------------------

/// Status code and fully-drained body of one internal API response.
///
/// The transport client reads the body to completion before constructing
/// this value, so the underlying connection is always returned to the pool
/// regardless of which classification branch is taken afterwards.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a raw response into a typed outcome.
///
/// Decision procedure, first match wins:
///
/// 1. well-formed body whose `success` flag is true or absent, decodable as
///    `T` → `Ok(Some(value))`;
/// 2. well-formed body with `success: false`, or with a `message` field on a
///    non-success status → [`ApiError::Domain`] carrying the message verbatim;
/// 3. non-empty body that is not well-formed JSON → [`ApiError::Parse`];
/// 4. empty body with a non-success status → [`ApiError::Status`];
/// 5. empty or `null` body with a success status → `Ok(None)`.
///
/// Operations whose success shape is mandatory map `Ok(None)` to
/// [`ApiError::Parse`] themselves; operations that permit absence (e.g. a
/// key lookup miss) pass it through.
pub fn classify<T: DeserializeOwned>(raw: &RawResponse) -> Result<Option<T>, ApiError> {
    if raw.body.is_empty() {
        if !raw.is_success_status() {
            return Err(ApiError::Status(raw.status));
        }
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(&raw.body).map_err(|_| ApiError::Parse)?;

    // An embedded failure flag overrides the HTTP status entirely.
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(ApiError::Domain(message.to_string()));
    }

    if !raw.is_success_status() {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return Err(ApiError::Domain(message.to_string()));
        }
        return Err(ApiError::Status(raw.status));
    }

    if value.is_null() {
        return Ok(None);
    }

    let decoded = serde_json::from_value(value).map_err(|_| ApiError::Parse)?;
    Ok(Some(decoded))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
