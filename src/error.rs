//! Error types for neura-ai operations.
//!
//! Every failure surfaced by this crate is a [`NeuraError`]. The variants follow
//! the order in which a request can go wrong:
//! - Validation of caller-supplied parameters (bad role, malformed tools JSON)
//! - Configuration of the client (missing API key, unusable base URL)
//! - Upstream failures, classified by [`crate::classifier`]:
//!   structured API errors, bare HTTP errors, connection failures, anything else
//! - Node-level failures for a single item (no choices, unknown operation)
//!
//! # Example
//!
//! ```rust
//! use neura_ai::{NeuraError, NeuraResult};
//!
//! fn require_model(model: &str) -> NeuraResult<&str> {
//!     if model.trim().is_empty() {
//!         return Err(NeuraError::validation("Model name must not be empty"));
//!     }
//!     Ok(model)
//! }
//!
//! assert!(require_model("").is_err());
//! ```

use crate::logging::{log_error, log_warn};
use crate::retry::is_retryable_status;
use thiserror::Error;

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller made a mistake they can fix (bad parameters, bad credentials).
    Client,

    /// The upstream service or the network failed.
    External,

    /// The upstream reported a transient condition; retrying may succeed.
    Transient,

    /// Anything that could not be attributed to the caller or the upstream.
    Internal,
}

/// Low-level connection failures recognized by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The remote host actively refused the connection.
    Refused,
    /// The host name in the base URL could not be resolved.
    NameResolution,
    /// The request did not complete within the configured timeout.
    Timeout,
}

impl ConnectionFailure {
    /// Fixed human-readable message for this failure.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Refused => "Connection refused - check if the API endpoint is accessible",
            Self::NameResolution => "DNS resolution failed - check the base URL",
            Self::Timeout => "Request timeout - try increasing the timeout value",
        }
    }
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Convenient result type for neura-ai operations.
pub type NeuraResult<T> = std::result::Result<T, NeuraError>;

/// Errors that can occur while building or sending requests.
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `Validation` | Client | No |
/// | `Configuration` | Client | No |
/// | `Api` | by status | by status |
/// | `Http` | by status | by status |
/// | `Connection` | External | No |
/// | `Operation` | Client | No |
/// | `Generic` | Internal | No |
#[derive(Error, Debug)]
pub enum NeuraError {
    /// Caller-supplied parameters were rejected before any request was sent.
    #[error("{message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// The client could not be configured from the given credentials.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The upstream answered with a structured `{"error": {...}}` body.
    #[error("{message}")]
    Api {
        /// `"<type or 'API Error'>: <message>"`.
        message: String,
        /// HTTP status of the response.
        http_code: u16,
        /// `error.type` from the body.
        error_type: Option<String>,
        /// `error.param` from the body.
        param: Option<String>,
        /// `error.code` from the body.
        code: Option<String>,
    },

    /// The upstream answered with a failing status and no structured body.
    #[error("{message}")]
    Http {
        /// `"HTTP <status>: <status text>"`.
        message: String,
        /// HTTP status of the response.
        http_code: u16,
    },

    /// The request never produced an HTTP response.
    #[error("{reason}")]
    Connection {
        /// Which low-level failure occurred.
        reason: ConnectionFailure,
    },

    /// A single node item could not be processed.
    #[error("{message}")]
    Operation {
        /// Description of the failure.
        message: String,
        /// Index of the item in the input batch.
        item_index: usize,
    },

    /// Anything else, with its message preserved.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

impl NeuraError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } | Self::Configuration { .. } | Self::Operation { .. } => {
                ErrorCategory::Client
            }
            Self::Api { http_code, .. } | Self::Http { http_code, .. } => {
                if is_retryable_status(*http_code) {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::External
                }
            }
            Self::Connection { .. } => ErrorCategory::External,
            Self::Generic(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status attached to the error, if the upstream produced a response.
    pub fn http_code(&self) -> Option<u16> {
        match self {
            Self::Api { http_code, .. } | Self::Http { http_code, .. } => Some(*http_code),
            _ => None,
        }
    }

    /// Whether a caller could reasonably retry the same request later.
    ///
    /// Mirrors the client's own retry rule: only responses carrying a
    /// retryable HTTP status qualify.
    pub fn is_retryable(&self) -> bool {
        self.http_code().is_some_and(is_retryable_status)
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================

    /// Create a validation error (logs at WARN level).
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "validation_error",
            message = %message,
            "Request parameters rejected"
        );
        Self::Validation { message }
    }

    /// Validation error for a message role outside the accepted set.
    pub fn invalid_role(role: impl AsRef<str>) -> Self {
        Self::validation(format!("Invalid message role: {}", role.as_ref()))
    }

    /// Validation error for a tools document that could not be used.
    pub fn invalid_tools(detail: impl std::fmt::Display) -> Self {
        Self::validation(format!("Invalid tools JSON: {detail}"))
    }

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Client configuration validation failed"
        );
        Self::Configuration { message }
    }

    /// Create an error from a structured upstream error body (logs at WARN level).
    pub fn api_error(
        message: impl Into<String>,
        http_code: u16,
        error_type: Option<String>,
        param: Option<String>,
        code: Option<String>,
    ) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "api_error",
            http_code = http_code,
            api_error_type = ?error_type,
            api_error_code = ?code,
            message = %message,
            "Upstream API returned an error"
        );
        Self::Api {
            message,
            http_code,
            error_type,
            param,
            code,
        }
    }

    pub fn http_error(http_code: u16, status_text: Option<&str>) -> Self {
        let message = format!(
            "HTTP {http_code}: {}",
            status_text
                .filter(|text| !text.is_empty())
                .unwrap_or("Unknown error")
        );
        log_warn!(
            error_type = "http_error",
            http_code = http_code,
            message = %message,
            "Upstream request failed without an error body"
        );
        Self::Http { message, http_code }
    }

    pub fn connection(reason: ConnectionFailure) -> Self {
        log_warn!(
            error_type = "connection_error",
            reason = ?reason,
            "Could not reach the upstream API"
        );
        Self::Connection { reason }
    }

    pub fn operation(message: impl Into<String>, item_index: usize) -> Self {
        let message = message.into();
        log_warn!(
            error_type = "operation_error",
            item_index = item_index,
            message = %message,
            "Node item failed"
        );
        Self::Operation {
            message,
            item_index,
        }
    }

    /// Wrap an arbitrary failure message as a generic error.
    pub fn generic(message: impl std::fmt::Display) -> Self {
        let message = message.to_string();
        log_error!(
            error_type = "generic_error",
            message = %message,
            "Unclassified request failure"
        );
        Self::Generic(anyhow::anyhow!(message))
    }
}
