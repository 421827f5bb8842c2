//! HTTP client for the OpenAI-compatible API
//!
//! [`NeuraClient`] owns dispatch, retries and error normalization for the
//! three endpoints this crate uses. Each public operation is a thin call into
//! [`NeuraClient::request`] with the method and path fixed.

use crate::classifier::{classify, RequestFailure};
use crate::config::Credentials;
use crate::error::{NeuraError, NeuraResult};
use crate::logging::{log_debug, log_error};
use crate::retry::{RetryExecutor, RetryPolicy, Sleeper};
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest, EmbeddingsResponse,
    ModelList,
};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/chat/completions";
pub const EMBEDDINGS_ENDPOINT: &str = "/embeddings";
pub const MODELS_ENDPOINT: &str = "/models";

const ORGANIZATION_HEADER: &str = "openai-organization";

/// Operations offered by an OpenAI-compatible backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn chat_completions(
        &self,
        payload: &ChatCompletionRequest,
    ) -> NeuraResult<ChatCompletionResponse>;

    async fn embeddings(&self, payload: &EmbeddingsRequest) -> NeuraResult<EmbeddingsResponse>;

    async fn list_models(&self) -> NeuraResult<ModelList>;
}

/// Retrying HTTP client bound to one set of credentials
#[derive(Debug, Clone)]
pub struct NeuraClient {
    http: reqwest::Client,
    credentials: Credentials,
    headers: HeaderMap,
    retry_executor: RetryExecutor,
}

impl NeuraClient {
    /// Create a client with the default retry policy
    ///
    /// # Errors
    ///
    /// Returns [`NeuraError::Configuration`] if the credentials fail
    /// validation, contain characters not allowed in headers, or the HTTP
    /// client cannot be built.
    pub fn new(credentials: Credentials) -> NeuraResult<Self> {
        Self::with_retry_policy(credentials, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy
    pub fn with_retry_policy(credentials: Credentials, policy: RetryPolicy) -> NeuraResult<Self> {
        credentials.validate()?;

        let headers = Self::build_headers(&credentials)?;
        let http = reqwest::Client::builder()
            .timeout(credentials.timeout())
            .danger_accept_invalid_certs(!credentials.reject_unauthorized)
            .build()
            .map_err(|e| NeuraError::configuration_error(format!("Failed to build HTTP client: {e}")))?;

        log_debug!(
            base_url = %credentials.base_url,
            has_organization = credentials.organization().is_some(),
            timeout_ms = credentials.timeout().as_millis() as u64,
            reject_unauthorized = credentials.reject_unauthorized,
            max_retries = policy.max_retries,
            "Created API client"
        );

        Ok(Self {
            http,
            credentials,
            headers,
            retry_executor: RetryExecutor::new(policy),
        })
    }

    /// Replace the sleep capability used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        let policy = self.retry_executor.policy().clone();
        self.retry_executor = RetryExecutor::with_sleeper(policy, sleeper);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry_executor.policy()
    }

    /// Build the headers sent with every request
    ///
    /// `Content-Type` and bearer `Authorization` always; `OpenAI-Organization`
    /// only when an organization id is configured.
    pub fn build_headers(credentials: &Credentials) -> NeuraResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", credentials.api_key)).map_err(|e| {
                NeuraError::configuration_error(format!("Invalid API key format: {e}"))
            })?,
        );

        if let Some(organization) = credentials.organization() {
            headers.insert(
                HeaderName::from_static(ORGANIZATION_HEADER),
                HeaderValue::from_str(organization).map_err(|e| {
                    NeuraError::configuration_error(format!("Invalid organization id: {e}"))
                })?,
            );
        }

        Ok(headers)
    }

    /// Send one logical API call with retries.
    ///
    /// The body is only attached to `POST` requests. After the last attempt
    /// the failure is classified into a [`NeuraError`].
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> NeuraResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.credentials.endpoint_url(endpoint);
        let body = body.filter(|_| method == Method::POST);
        let start_time = Instant::now();

        let result = self
            .retry_executor
            .execute(|_attempt| self.send_once(method.clone(), &url, body))
            .await;

        match result {
            Ok(response) => {
                log_debug!(
                    method = %method,
                    endpoint = endpoint,
                    duration_ms = start_time.elapsed().as_millis() as u64,
                    "Request succeeded"
                );
                Ok(response)
            }
            Err(failure) => {
                log_error!(
                    method = %method,
                    endpoint = endpoint,
                    duration_ms = start_time.elapsed().as_millis() as u64,
                    error = %failure,
                    "Request failed"
                );
                Err(classify(failure))
            }
        }
    }

    /// Execute a single HTTP attempt
    async fn send_once<T, B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, RequestFailure>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .http
            .request(method, url)
            .headers(self.headers.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(RequestFailure::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|text| !text.is_empty());
            return Err(RequestFailure::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().map(str::to_string),
                body,
            });
        }

        let raw_body = response
            .text()
            .await
            .map_err(RequestFailure::from_transport)?;

        serde_json::from_str(&raw_body).map_err(|e| {
            RequestFailure::Other(anyhow::anyhow!("Invalid response body: {e}"))
        })
    }

    /// `POST /chat/completions`
    pub async fn chat_completions(
        &self,
        payload: &ChatCompletionRequest,
    ) -> NeuraResult<ChatCompletionResponse> {
        self.request(Method::POST, CHAT_COMPLETIONS_ENDPOINT, Some(payload))
            .await
    }

    /// `POST /embeddings`
    pub async fn embeddings(&self, payload: &EmbeddingsRequest) -> NeuraResult<EmbeddingsResponse> {
        self.request(Method::POST, EMBEDDINGS_ENDPOINT, Some(payload))
            .await
    }

    /// `GET /models`
    pub async fn list_models(&self) -> NeuraResult<ModelList> {
        self.request::<_, ()>(Method::GET, MODELS_ENDPOINT, None)
            .await
    }

    /// Check that the endpoint is reachable with these credentials.
    pub async fn test_connection(&self) -> NeuraResult<()> {
        let models = self.list_models().await?;
        log_debug!(
            model_count = models.data.len(),
            "Connection test succeeded"
        );
        Ok(())
    }
}

#[async_trait]
impl CompletionApi for NeuraClient {
    async fn chat_completions(
        &self,
        payload: &ChatCompletionRequest,
    ) -> NeuraResult<ChatCompletionResponse> {
        NeuraClient::chat_completions(self, payload).await
    }

    async fn embeddings(&self, payload: &EmbeddingsRequest) -> NeuraResult<EmbeddingsResponse> {
        NeuraClient::embeddings(self, payload).await
    }

    async fn list_models(&self) -> NeuraResult<ModelList> {
        NeuraClient::list_models(self).await
    }
}
