//! Test helper utilities for neura-ai unit tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

#![allow(dead_code)]

use crate::classifier::RequestFailure;
use crate::retry::Sleeper;
use crate::types::{
    ChatChoice, ChatCompletionResponse, EmbeddingData, EmbeddingVector, EmbeddingsResponse,
    ResponseMessage, Usage,
};
use async_trait::async_trait;
use serde_json::Map;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub fn status_failure(status: u16) -> RequestFailure {
    RequestFailure::Status {
        status,
        status_text: None,
        body: None,
    }
}

pub fn test_usage() -> Usage {
    Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
        ..Usage::default()
    }
}

pub fn chat_response(content: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: "chatcmpl-123".to_string(),
        object: "chat.completion".to_string(),
        created: 1_700_000_000,
        model: "gpt-4o-mini".to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ResponseMessage {
                role: "assistant".to_string(),
                content: Some(content.to_string()),
                ..ResponseMessage::default()
            },
            finish_reason: Some("stop".to_string()),
            extra: Map::new(),
        }],
        usage: Some(test_usage()),
        extra: Map::new(),
    }
}

pub fn embeddings_response(vectors: usize) -> EmbeddingsResponse {
    EmbeddingsResponse {
        object: "list".to_string(),
        data: (0..vectors)
            .map(|index| EmbeddingData {
                object: "embedding".to_string(),
                embedding: EmbeddingVector::Float(vec![0.1, 0.2, 0.3]),
                index: index as u32,
            })
            .collect(),
        model: "text-embedding-ada-002".to_string(),
        usage: Some(Usage {
            prompt_tokens: 4,
            completion_tokens: 0,
            total_tokens: 4,
            ..Usage::default()
        }),
        extra: Map::new(),
    }
}
