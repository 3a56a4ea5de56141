//! API error types.
//!
//! Client-visible errors carry a numeric `ucode` alongside the message; the
//! HTTP status is derived from the code.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error codes returned in the `ucode` field
pub mod codes {
    pub const UNKNOWN: i32 = 1001;
    pub const UNHANDLED: i32 = 1002;
    pub const UNAVAILABLE: i32 = 1005;
    /// Call rejected by the rate limiter
    pub const HTTP_LIMITATION: i32 = 1006;
    pub const INVALID_PARAMS: i32 = 1101;
    pub const NOT_FOUND: i32 = 2001;
}

/// Client-visible API error
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    /// Optional additional data
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn unknown() -> Self {
        Self::new(codes::UNKNOWN, "An unknown error occurred")
    }

    /// Error raised by a handler that it did not map itself
    pub fn unhandled(details: impl Into<String>) -> Self {
        Self::new(codes::UNHANDLED, details.into())
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            codes::NOT_FOUND,
            format!("Not found: {}", resource.into()),
        )
    }

    /// Service temporarily unable to answer (node syncing, too many connections)
    pub fn unavailable(details: impl Into<String>) -> Self {
        Self::new(
            codes::UNAVAILABLE,
            format!("Unavailable: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::UNKNOWN,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Rate limited on `window`, retry once it rolls over
    pub fn rate_limited(window: &str, retry_after: Duration) -> Self {
        Self::with_data(
            codes::HTTP_LIMITATION,
            "This URI has reached its maximum usage quota. Please retry later.",
            serde_json::json!({
                "window": window,
                "retry_after_ms": retry_after.as_millis() as u64,
            }),
        )
    }

    /// HTTP status this error is answered with
    pub fn http_status(&self) -> StatusCode {
        match self.code {
            codes::HTTP_LIMITATION => StatusCode::TOO_MANY_REQUESTS,
            codes::INVALID_PARAMS => StatusCode::BAD_REQUEST,
            codes::NOT_FOUND => StatusCode::NOT_FOUND,
            codes::UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Seconds to put in `Retry-After`, rounded up, when the error carries one
    fn retry_after_secs(&self) -> Option<u64> {
        let ms = self.data.as_ref()?.get("retry_after_ms")?.as_u64()?;
        Some(ms.div_ceil(1000).max(1))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("ucode", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            ucode: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ApiError {
            code: helper.ucode,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::invalid_params(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let retry_after = self.retry_after_secs();
        let mut response = (status, axum::Json(self)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Listener could not be bound
    #[error("server bind error: {0}")]
    Bind(String),

    #[error("internal error: {0}")]
    Internal(String),
}
