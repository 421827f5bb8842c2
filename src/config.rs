//! Credentials and client configuration
//!
//! [`Credentials`] is the bundle the host hands over for each invocation. It is
//! immutable once a client is built from it.

use crate::error::{NeuraError, NeuraResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL of the internal NEURA service, used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://llm-neura-service.llm-neura.svc.cluster.local/v1";

/// Request timeout applied when the credentials carry none (or zero).
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Connection credentials for an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Request timeout in milliseconds; 0 means "use the default".
    #[serde(default, alias = "timeout")]
    pub timeout_ms: u64,
    /// Whether invalid TLS certificates are rejected. Defaults to `true`;
    /// `false` turns off certificate verification for the client.
    #[serde(default = "default_reject_unauthorized")]
    pub reject_unauthorized: bool,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            organization: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            reject_unauthorized: default_reject_unauthorized(),
        }
    }
}

fn default_reject_unauthorized() -> bool {
    true
}

impl Credentials {
    /// Create credentials for the given endpoint and key with default settings.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_reject_unauthorized(mut self, reject_unauthorized: bool) -> Self {
        self.reject_unauthorized = reject_unauthorized;
        self
    }

    /// Effective request timeout, falling back to 60s when unset.
    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Organization id, if one is configured and non-blank.
    pub fn organization(&self) -> Option<&str> {
        self.organization
            .as_deref()
            .filter(|org| !org.trim().is_empty())
    }

    /// Full URL for an endpoint path such as `/chat/completions`.
    ///
    /// A single trailing slash on the base URL is dropped before joining.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        format!("{base}{endpoint}")
    }

    /// Validate the credentials are usable
    ///
    /// # Errors
    ///
    /// Returns [`NeuraError::Configuration`] if:
    /// - The base URL is empty or not http(s)
    /// - The API key is empty
    pub fn validate(&self) -> NeuraResult<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(NeuraError::configuration_error("Base URL is required"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(NeuraError::configuration_error(format!(
                "Base URL must start with http:// or https://, got: {base_url}"
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(NeuraError::configuration_error("API key is required"));
        }
        Ok(())
    }

    /// Load credentials from environment variables
    /// This is the ONLY method that should access environment variables
    ///
    /// Reads `NEURA_BASE_URL`, `NEURA_API_KEY`, `NEURA_ORGANIZATION`,
    /// `NEURA_TIMEOUT_MS` and `NEURA_REJECT_UNAUTHORIZED`; anything unset keeps
    /// its default.
    ///
    /// # Errors
    ///
    /// Returns [`NeuraError::Configuration`] if a numeric or boolean variable
    /// cannot be parsed, or if the resulting credentials fail [`validate`](Self::validate).
    pub fn from_env() -> NeuraResult<Self> {
        let mut credentials = Self::default();

        if let Ok(base_url) = std::env::var("NEURA_BASE_URL") {
            credentials.base_url = base_url;
        }
        if let Ok(api_key) = std::env::var("NEURA_API_KEY") {
            credentials.api_key = api_key;
        }
        if let Ok(organization) = std::env::var("NEURA_ORGANIZATION") {
            credentials.organization = Some(organization);
        }
        if let Ok(timeout) = std::env::var("NEURA_TIMEOUT_MS") {
            credentials.timeout_ms = timeout.trim().parse().map_err(|e| {
                NeuraError::configuration_error(format!("Invalid NEURA_TIMEOUT_MS '{timeout}': {e}"))
            })?;
        }
        if let Ok(reject) = std::env::var("NEURA_REJECT_UNAUTHORIZED") {
            credentials.reject_unauthorized = reject.trim().parse().map_err(|e| {
                NeuraError::configuration_error(format!(
                    "Invalid NEURA_REJECT_UNAUTHORIZED '{reject}': {e}"
                ))
            })?;
        }

        credentials.validate()?;

        log_debug!(
            base_url = %credentials.base_url,
            has_api_key = !credentials.api_key.is_empty(),
            has_organization = credentials.organization().is_some(),
            timeout_ms = credentials.timeout().as_millis() as u64,
            reject_unauthorized = credentials.reject_unauthorized,
            "Credentials loaded from environment"
        );

        Ok(credentials)
    }
}
