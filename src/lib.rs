//! # neura-ai
//!
//! Chat completion and embeddings client for NEURA | IANUSTEC AI workflow
//! nodes, speaking the OpenAI-compatible HTTP API.
//!
//! ## Key Features
//!
//! - **Payload building**: validated, clamped request bodies for chat and embeddings
//! - **Tool calling**: tools JSON in three accepted shapes, legacy `functions` pass-through
//! - **Resilience**: bounded retries with backoff on transient HTTP statuses
//! - **Error classification**: API, HTTP, connection and generic failures as one typed error
//! - **Node execution**: per-item processing with continue-on-fail and binary output
//!
//! ## Example
//!
//! ```rust,no_run
//! use neura_ai::{build_chat_completion_request, ChatMessage, ChatOptions, Credentials, NeuraClient};
//!
//! # async fn example() -> neura_ai::NeuraResult<()> {
//! let client = NeuraClient::new(Credentials::new("https://api.example.com/v1", "your-api-key"))?;
//!
//! let request = build_chat_completion_request(
//!     "gpt-4o-mini",
//!     vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hi")],
//!     ChatOptions {
//!         temperature: Some(0.7),
//!         ..ChatOptions::default()
//!     },
//! )?;
//!
//! let response = client.chat_completions(&request).await?;
//! println!("{:?}", response.choices.first().map(|c| &c.message.content));
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod payload;
pub mod retry;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use client::{CompletionApi, NeuraClient};
pub use config::Credentials;
pub use error::{ConnectionFailure, ErrorCategory, NeuraError, NeuraResult};
pub use node::{execute, AdvancedOptions, ItemParameters, NodeOutput, NodeSettings};
pub use payload::{
    build_chat_completion_request, build_embeddings_request, parse_tool_choice,
    parse_tools_json, validate_chat_message, ChatOptions, EmbeddingsOptions, MessageInput,
};
pub use retry::{RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingInput,
    EmbeddingsRequest, EmbeddingsResponse, EncodingFormat, ModelList, Role, Tool, ToolChoice,
};
