//! Failure classification
//!
//! A single attempt fails with a [`RequestFailure`], which keeps just enough of
//! the transport outcome to decide on retries. Once the retry loop gives up,
//! [`classify`] turns the last failure into a [`NeuraError`], checking in order:
//! structured API error body, bare HTTP status, recognized connection failure,
//! anything else.

use crate::error::{ConnectionFailure, NeuraError};
use crate::retry::is_retryable_status;
use crate::types::{ApiErrorDetail, ApiErrorEnvelope};
use serde_json::Value;
use std::error::Error as StdError;
use thiserror::Error;

/// Outcome of one failed attempt, before classification
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// The upstream answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        status: u16,
        status_text: Option<String>,
        /// Raw response body, if one could be read.
        body: Option<String>,
    },

    /// No response: the connection failed for a recognized reason.
    #[error("{0}")]
    Connection(ConnectionFailure),

    /// Anything else (unrecognized transport error, unreadable body, ...).
    #[error("{0}")]
    Other(anyhow::Error),
}

impl RequestFailure {
    /// Build a failure from a transport-level error raised while sending.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Connection(ConnectionFailure::Timeout);
        }
        match detect_connection_failure(&error) {
            Some(reason) => Self::Connection(reason),
            None => Self::Other(anyhow::Error::new(error)),
        }
    }

    /// HTTP status of the response, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Only responses with a retryable status are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.http_status().is_some_and(is_retryable_status)
    }
}

/// Walk an error's source chain looking for a known connection failure.
pub fn detect_connection_failure(error: &(dyn StdError + 'static)) -> Option<ConnectionFailure> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);

    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return Some(ConnectionFailure::Refused),
                std::io::ErrorKind::TimedOut => return Some(ConnectionFailure::Timeout),
                _ => {}
            }
        }

        // The resolver surfaces as an opaque error, only its message identifies it.
        let message = err.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return Some(ConnectionFailure::NameResolution);
        }
        if message.contains("connection refused") {
            return Some(ConnectionFailure::Refused);
        }

        current = err.source();
    }

    None
}

/// Extract the structured `{"error": {...}}` detail from a response body.
pub fn parse_api_error(body: &str) -> Option<ApiErrorDetail> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error)
}

/// Convert the last failure of a call into the error surfaced to the caller.
pub fn classify(failure: RequestFailure) -> NeuraError {
    match failure {
        RequestFailure::Status {
            status,
            status_text,
            body,
        } => match body.as_deref().and_then(parse_api_error) {
            Some(detail) => {
                let message = format!(
                    "{}: {}",
                    detail
                        .error_type
                        .as_deref()
                        .filter(|t| !t.is_empty())
                        .unwrap_or("API Error"),
                    detail.message
                );
                NeuraError::api_error(
                    message,
                    status,
                    detail.error_type,
                    detail.param.and_then(value_to_string),
                    detail.code.and_then(value_to_string),
                )
            }
            None => NeuraError::http_error(status, status_text.as_deref()),
        },
        RequestFailure::Connection(reason) => NeuraError::connection(reason),
        RequestFailure::Other(error) => NeuraError::generic(format!("{error:#}")),
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
