// ABOUTME: Unified error type and stable error codes for the calorie tuner
// ABOUTME: Classifies upstream, validation, storage, and completion-service failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! # Unified Error Handling
//!
//! Every fallible operation in the workspace returns [`AppResult`]. The
//! [`ErrorCode`] carried by an [`AppError`] is what callers branch on: the
//! resilience layer uses it to decide whether an attempt is retryable, and
//! outer layers use [`ErrorCode::http_status`] to map failures onto their
//! transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// Caller supplied an argument outside the accepted domain
    InvalidInput = 3000,

    // Resource Management (4000-4999)
    /// A search produced no usable hit
    ResourceNotFound = 4000,

    // External Services (5000-5999)
    /// The nutrition API answered with a non-success status
    UpstreamError = 5000,
    /// The external service could not be reached
    ExternalUnavailable = 5001,
    /// The external service rejected the call for rate reasons
    ExternalRateLimited = 5003,
    /// The external call did not finish in time
    ExternalTimeout = 5004,
    /// Completion output failed shape validation
    MalformedOutput = 5005,
    /// The extraction capability could not produce a recipe
    ExtractionFailed = 5006,

    // Optimization (7000-7999)
    /// Extraction produced no ingredient line that survived normalization
    NoUsableIngredients = 7000,

    // Configuration (6000-6999)
    /// Configuration is missing or invalid
    ConfigError = 6000,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    InternalError = 9000,
    /// Detail cache storage failed
    DatabaseError = 9001,
    /// Serialization or deserialization failed
    SerializationError = 9003,
}

impl ErrorCode {
    /// HTTP status an outer transport layer should report for this code
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::NoUsableIngredients => 400,
            Self::ResourceNotFound => 404,
            Self::ExternalRateLimited => 429,
            Self::UpstreamError
            | Self::ExternalUnavailable
            | Self::MalformedOutput
            | Self::ExtractionFailed => 502,
            Self::ExternalTimeout => 504,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError => 500,
        }
    }

    /// User-facing description of this error class
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested food was not found",
            Self::UpstreamError => "The nutrition database returned an error",
            Self::ExternalUnavailable => "An external service is currently unavailable",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ExternalTimeout => "An external service did not respond in time",
            Self::MalformedOutput => "The completion service returned malformed output",
            Self::ExtractionFailed => "The recipe could not be extracted",
            Self::NoUsableIngredients => "The recipe has no usable ingredients",
            Self::ConfigError => "Configuration is missing or invalid",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Detail cache operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Unified error type for the workspace
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Structured details (query, status, body, attempt counts)
    pub details: Value,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
            source: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Upstream HTTP status recorded on an `UpstreamError`
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        if self.code != ErrorCode::UpstreamError {
            return None;
        }
        self.details
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
    }

    /// Copy of this error without its source chain
    ///
    /// Used where the same failure has to be reported to several consumers
    /// (for example an event subscriber and the caller).
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            details: self.details.clone(),
            source: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors for common errors
impl AppError {
    /// Invalid caller input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// No search hit for the named resource
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Non-success response from the nutrition API
    #[must_use]
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(ErrorCode::UpstreamError, format!("HTTP {status}: {body}"))
            .with_details(json!({ "status": status, "body": body }))
    }

    /// External service could not be reached
    #[must_use]
    pub fn external_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalUnavailable,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// External service rate limited the call
    #[must_use]
    pub fn rate_limited(service: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalRateLimited,
            format!("{} rate limit exceeded", service.into()),
        )
    }

    /// External call timed out
    #[must_use]
    pub fn timeout(service: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalTimeout,
            format!("{} request timed out", service.into()),
        )
    }

    /// Completion output failed shape validation
    #[must_use]
    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedOutput, message)
    }

    /// Extraction capability failure
    #[must_use]
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExtractionFailed, message)
    }

    /// Extraction produced nothing usable
    #[must_use]
    pub fn no_usable_ingredients() -> Self {
        Self::new(
            ErrorCode::NoUsableIngredients,
            "no ingredient line survived normalization",
        )
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Detail cache storage error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => Self::internal(error.to_string())
                .with_details(json!({ "source": source.to_string() })),
            None => Self::internal(error.to_string()),
        }
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string()).with_source(error)
    }
}

/// Serializable error envelope for outer transport layers
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Stable error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Structured details, omitted when empty
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                details: error.details,
            },
        }
    }
}
