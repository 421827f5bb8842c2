//! Test helper utilities for neura-ai integration tests
//!
//! Shared fixtures for tests that run the client against a wiremock server.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Allow dead code in test utilities - functions are used across different test files
#![allow(dead_code)]

use async_trait::async_trait;
use neura_ai::{
    ChatCompletionRequest, ChatMessage, Credentials, NeuraClient, RetryPolicy, Sleeper,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "test-api-key";

/// Sleeper that records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays_ms(&self) -> Vec<u128> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .map(Duration::as_millis)
            .collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Credentials pointing at the mock server's `/v1` prefix
pub fn test_credentials(server: &MockServer) -> Credentials {
    Credentials::new(format!("{}/v1", server.uri()), TEST_API_KEY)
}

/// Client for the mock server whose retry sleeps are recorded, not awaited
pub fn test_client(server: &MockServer) -> (NeuraClient, Arc<RecordingSleeper>) {
    test_client_with(test_credentials(server), RetryPolicy::default())
}

pub fn test_client_with(
    credentials: Credentials,
    policy: RetryPolicy,
) -> (NeuraClient, Arc<RecordingSleeper>) {
    let sleeper = RecordingSleeper::new();
    let client = NeuraClient::with_retry_policy(credentials, policy)
        .expect("test credentials are valid")
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}

pub fn chat_request() -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "gpt-4o-mini".to_string(),
        messages: vec![ChatMessage::user("Hello")],
        temperature: Some(0.7),
        top_p: None,
        max_tokens: None,
        stream: false,
        tools: None,
        tool_choice: None,
        functions: None,
        function_call: None,
    }
}

pub fn chat_completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-abc",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    })
}

pub fn embeddings_body() -> Value {
    json!({
        "object": "list",
        "data": [
            {"object": "embedding", "embedding": [0.1, -0.2, 0.3], "index": 0},
            {"object": "embedding", "embedding": [0.4, 0.5, -0.6], "index": 1}
        ],
        "model": "text-embedding-ada-002",
        "usage": {"prompt_tokens": 2, "total_tokens": 2}
    })
}

pub fn models_body() -> Value {
    json!({
        "object": "list",
        "data": [
            {"id": "gpt-4o-mini", "object": "model", "created": 1_700_000_000, "owned_by": "neura"},
            {"id": "text-embedding-ada-002", "object": "model"}
        ]
    })
}
