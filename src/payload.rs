//! Request payload builders
//!
//! Pure functions turning caller parameters into API request bodies. Values
//! are validated and clamped here so the client only ever sends well-formed
//! requests.

use crate::error::{NeuraError, NeuraResult};
use crate::logging::log_debug;
use crate::types::{
    ChatCompletionRequest, ChatMessage, EmbeddingInput, EmbeddingsRequest, EncodingFormat,
    FunctionCall, Role, Tool, ToolCall, ToolChoice,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Caller-supplied message before validation.
///
/// The role is free text here; [`validate_chat_message`] checks it against
/// the accepted set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageInput {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

impl MessageInput {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

impl From<ChatMessage> for MessageInput {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content,
            name: message.name,
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
            function_call: message.function_call,
        }
    }
}

/// Optional chat parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Values <= 0 are treated as absent
    pub max_tokens: Option<i64>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub functions: Option<Vec<Value>>,
    pub function_call: Option<Value>,
}

/// Optional embeddings parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddingsOptions {
    pub encoding_format: Option<EncodingFormat>,
    /// Values <= 0 are treated as absent
    pub dimensions: Option<i64>,
    pub user: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Validate a single message, rejecting roles outside the accepted set.
///
/// Empty `content`, `name` and `tool_call_id` strings are dropped.
pub fn validate_chat_message(message: MessageInput) -> NeuraResult<ChatMessage> {
    let role: Role = message.role.parse()?;

    Ok(ChatMessage {
        role,
        content: non_empty(message.content),
        name: non_empty(message.name),
        tool_calls: message.tool_calls,
        tool_call_id: non_empty(message.tool_call_id),
        function_call: message.function_call,
    })
}

/// Clamp a sampling parameter into `[min, max]`; non-finite values are dropped.
fn clamp_param(value: Option<f64>, min: f64, max: f64) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(min, max))
}

fn positive_u32(value: Option<i64>) -> Option<u32> {
    value
        .filter(|v| *v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

/// Build a chat completion request.
///
/// `stream` is always false. Tools are attached only when the list is
/// non-empty, and `tool_choice` only alongside them; the same holds for the
/// legacy `functions`/`function_call` pair.
///
/// # Errors
///
/// Returns [`NeuraError::Validation`] if any message has an unknown role.
pub fn build_chat_completion_request<I>(
    model: impl Into<String>,
    messages: I,
    options: ChatOptions,
) -> NeuraResult<ChatCompletionRequest>
where
    I: IntoIterator,
    I::Item: Into<MessageInput>,
{
    let messages = messages
        .into_iter()
        .map(|m| validate_chat_message(m.into()))
        .collect::<NeuraResult<Vec<_>>>()?;

    let (tools, tool_choice) = match options.tools {
        Some(tools) if !tools.is_empty() => (Some(tools), options.tool_choice),
        _ => (None, None),
    };

    let (functions, function_call) = match options.functions {
        Some(functions) if !functions.is_empty() => (
            Some(functions),
            options.function_call.filter(|call| !call.is_null()),
        ),
        _ => (None, None),
    };

    let request = ChatCompletionRequest {
        model: model.into(),
        messages,
        temperature: clamp_param(options.temperature, 0.0, 2.0),
        top_p: clamp_param(options.top_p, 0.0, 1.0),
        max_tokens: positive_u32(options.max_tokens),
        stream: false,
        tools,
        tool_choice,
        functions,
        function_call,
    };

    log_debug!(
        model = %request.model,
        message_count = request.messages.len(),
        tool_count = request.tools.as_ref().map_or(0, Vec::len),
        has_max_tokens = request.max_tokens.is_some(),
        "Built chat completion request"
    );

    Ok(request)
}

/// Build an embeddings request.
pub fn build_embeddings_request(
    model: impl Into<String>,
    input: impl Into<EmbeddingInput>,
    options: EmbeddingsOptions,
) -> EmbeddingsRequest {
    EmbeddingsRequest {
        model: model.into(),
        input: input.into(),
        encoding_format: options.encoding_format,
        dimensions: positive_u32(options.dimensions),
        user: non_empty(options.user),
    }
}

impl EmbeddingInput {
    /// Interpret host text: a JSON array of strings becomes a batch, anything
    /// else is sent verbatim.
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(batch) => Self::Batch(batch),
            Err(error) => {
                if raw.trim_start().starts_with('[') {
                    log_debug!(
                        error = %error,
                        input_len = raw.len(),
                        "Embedding input is not an array of strings, sending it as a single string"
                    );
                }
                Self::Single(raw.to_string())
            }
        }
    }
}

/// The shapes accepted for a tools document
#[derive(Debug, Clone, PartialEq)]
pub enum ToolsDocument {
    /// `[{...}, ...]`
    List(Vec<Value>),
    /// `{"tools": [{...}, ...], ...}`
    Wrapped(Vec<Value>),
    /// `{"type": "function", "function": {...}}`
    Single(Map<String, Value>),
}

impl ToolsDocument {
    /// Decide which shape a parsed JSON value has.
    ///
    /// A `tools` array field wins over a top-level `type`.
    pub fn classify(value: Value) -> NeuraResult<Self> {
        match value {
            Value::Array(items) => Ok(Self::List(items)),
            Value::Object(mut object) => {
                if matches!(object.get("tools"), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = object.remove("tools") {
                        return Ok(Self::Wrapped(items));
                    }
                }
                if object.get("type").and_then(Value::as_str) == Some("function") {
                    return Ok(Self::Single(object));
                }
                Err(NeuraError::invalid_tools("Invalid tools format"))
            }
            _ => Err(NeuraError::invalid_tools("Invalid tools format")),
        }
    }

    /// Convert the document into typed tool definitions.
    pub fn into_tools(self) -> NeuraResult<Vec<Tool>> {
        let items = match self {
            Self::List(items) | Self::Wrapped(items) => items,
            Self::Single(object) => vec![Value::Object(object)],
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Tool>(item)
                    .map_err(|e| NeuraError::invalid_tools(format!("tool {index}: {e}")))
            })
            .collect()
    }
}

/// Parse the tools JSON text supplied by the host.
///
/// Blank input yields `None`.
///
/// # Errors
///
/// Returns [`NeuraError::Validation`] (`Invalid tools JSON: ...`) when the text
/// is not JSON, has an unsupported shape, or contains something other than
/// function tools.
pub fn parse_tools_json(raw: &str) -> NeuraResult<Option<Vec<Tool>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw).map_err(NeuraError::invalid_tools)?;
    let tools = ToolsDocument::classify(value)?.into_tools()?;
    Ok(Some(tools))
}

/// Pull `tool_choice` out of the same tools JSON text.
///
/// Lenient: unparseable text, a missing field or an unknown shape
/// all yield `None`, while [`parse_tools_json`] rejects the same input.
pub fn parse_tool_choice(raw: &str) -> Option<ToolChoice> {
    if raw.trim().is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(raw).ok()?;
    let choice = value.get("tool_choice")?;
    if choice.is_null() {
        return None;
    }
    serde_json::from_value(choice.clone()).ok()
}
