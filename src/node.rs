//! Workflow node executor
//!
//! Processes a batch of host items one after another. Each item names a
//! resource/operation pair and carries the parameters for it; the result is
//! one output record per item, in input order.

use crate::client::CompletionApi;
use crate::error::{NeuraError, NeuraResult};
use crate::logging::{log_debug, log_info, log_warn};
use crate::payload::{
    build_chat_completion_request, build_embeddings_request, parse_tool_choice,
    parse_tools_json, ChatOptions, EmbeddingsOptions, MessageInput,
};
use crate::types::{ChatMessage, EmbeddingData, EmbeddingInput, ResponseMessage, Role, Usage};

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Which API an item targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOperation {
    ChatCreate,
    EmbeddingsCreate,
}

impl NodeOperation {
    /// Resolve the host's resource/operation strings.
    pub fn resolve(resource: &str, operation: &str, item_index: usize) -> NeuraResult<Self> {
        match (resource, operation) {
            ("chat", "create") => Ok(Self::ChatCreate),
            ("embeddings", "create") => Ok(Self::EmbeddingsCreate),
            _ => Err(NeuraError::operation(
                format!("Unknown resource \"{resource}\" or operation \"{operation}\""),
                item_index,
            )),
        }
    }
}

/// Output shaping options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
    /// Duplicate the output object into a `raw` field
    #[serde(default)]
    pub store_raw: bool,
    /// Attach the output as a JSON file under this property name
    #[serde(default)]
    pub binary_file: String,
}

/// Parameters of one host item
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    #[serde(default = "default_resource")]
    pub resource: String,
    #[serde(default = "default_operation")]
    pub operation: String,

    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default)]
    pub user_message: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// The host sends `""` when left blank
    #[serde(default, deserialize_with = "optional_token_limit")]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub tools_json: String,

    #[serde(default = "default_embedding_model")]
    pub emb_model: String,
    #[serde(default)]
    pub emb_input: String,

    #[serde(default)]
    pub advanced_options: AdvancedOptions,
}

fn default_resource() -> String {
    "chat".to_string()
}

fn default_operation() -> String {
    "create".to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    1.0
}

/// `maxTokens` as a number, a numeric string, `""` or `null`.
///
/// Blank and non-numeric text mean no limit.
fn optional_token_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLimit {
        Integer(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<RawLimit>::deserialize(deserializer)? {
        None => None,
        Some(RawLimit::Integer(limit)) => Some(limit),
        Some(RawLimit::Float(limit)) => limit.is_finite().then_some(limit as i64),
        Some(RawLimit::Text(text)) => text.trim().parse().ok(),
    })
}

impl Default for ItemParameters {
    fn default() -> Self {
        Self {
            resource: default_resource(),
            operation: default_operation(),
            model: default_chat_model(),
            system_message: String::new(),
            user_message: String::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: None,
            tools_json: String::new(),
            emb_model: default_embedding_model(),
            emb_input: String::new(),
            advanced_options: AdvancedOptions::default(),
        }
    }
}

/// Batch-level behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeSettings {
    /// Record per-item failures instead of aborting the run
    pub continue_on_fail: bool,
}

/// Output record of a chat item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutput {
    pub content: String,
    pub finish_reason: Option<String>,
    pub model: String,
    pub created: i64,
    pub usage: Option<Usage>,
    /// Full message, including any tool calls
    pub message: ResponseMessage,
}

/// Output record of an embeddings item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingsOutput {
    pub model: String,
    pub embeddings: Vec<EmbeddingData>,
    pub usage: Option<Usage>,
}

/// File attached to an output item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryAttachment {
    /// Property name the host stores the file under
    #[serde(skip)]
    pub property: String,
    /// Base64 of the file bytes
    pub data: String,
    pub mime_type: String,
    pub file_name: String,
}

/// One entry of the node's output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutput {
    pub json: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<BinaryAttachment>,
}

impl NodeOutput {
    /// Error record emitted for a failed item when continuing on failure.
    pub fn failure(error: &NeuraError, item_index: usize) -> Self {
        Self {
            json: serde_json::json!({
                "error": error.to_string(),
                "itemIndex": item_index,
            }),
            binary: None,
        }
    }
}

/// Run every item against the API, sequentially and in order.
///
/// # Errors
///
/// Without `continue_on_fail`, the first failing item aborts the run with
/// its error. With it, failures become [`NodeOutput::failure`] records.
pub async fn execute<A>(
    api: &A,
    items: &[ItemParameters],
    settings: NodeSettings,
) -> NeuraResult<Vec<NodeOutput>>
where
    A: CompletionApi + ?Sized,
{
    log_info!(
        item_count = items.len(),
        continue_on_fail = settings.continue_on_fail,
        "Executing node"
    );

    let mut outputs = Vec::with_capacity(items.len());

    for (item_index, item) in items.iter().enumerate() {
        match execute_item(api, item, item_index).await {
            Ok(output) => outputs.push(output),
            Err(error) if settings.continue_on_fail => {
                log_warn!(
                    item_index = item_index,
                    error = %error,
                    "Item failed, continuing with next item"
                );
                outputs.push(NodeOutput::failure(&error, item_index));
            }
            Err(error) => return Err(error),
        }
    }

    Ok(outputs)
}

/// Process a single item and shape its output.
pub async fn execute_item<A>(
    api: &A,
    item: &ItemParameters,
    item_index: usize,
) -> NeuraResult<NodeOutput>
where
    A: CompletionApi + ?Sized,
{
    let operation = NodeOperation::resolve(&item.resource, &item.operation, item_index)?;

    let response = match operation {
        NodeOperation::ChatCreate => to_json(&execute_chat_completion(api, item, item_index).await?)?,
        NodeOperation::EmbeddingsCreate => to_json(&execute_embeddings(api, item).await?)?,
    };

    shape_output(response, &item.advanced_options)
}

fn to_json<T: Serialize>(value: &T) -> NeuraResult<Value> {
    serde_json::to_value(value).map_err(NeuraError::generic)
}

/// Apply `storeRaw` and `binaryFile` to a response object.
pub fn shape_output(response: Value, options: &AdvancedOptions) -> NeuraResult<NodeOutput> {
    let binary = if options.binary_file.is_empty() {
        None
    } else {
        let pretty = serde_json::to_string_pretty(&response).map_err(NeuraError::generic)?;
        Some(BinaryAttachment {
            property: options.binary_file.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(pretty.as_bytes()),
            mime_type: "application/json".to_string(),
            file_name: options.binary_file.clone(),
        })
    };

    let mut json = response;
    if options.store_raw {
        let raw = json.clone();
        if let Value::Object(map) = &mut json {
            map.insert("raw".to_string(), raw);
        }
    }

    Ok(NodeOutput { json, binary })
}

/// Build the message list from the item's system and user text.
pub fn chat_messages(system_message: &str, user_message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    let system = system_message.trim();
    if !system.is_empty() {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::new(Role::User, user_message));
    messages
}

/// Chat completion for one item
pub async fn execute_chat_completion<A>(
    api: &A,
    item: &ItemParameters,
    item_index: usize,
) -> NeuraResult<ChatOutput>
where
    A: CompletionApi + ?Sized,
{
    let (tools, tool_choice) = if item.tools_json.trim().is_empty() {
        (None, None)
    } else {
        (
            parse_tools_json(&item.tools_json)?,
            parse_tool_choice(&item.tools_json),
        )
    };

    let messages = chat_messages(&item.system_message, &item.user_message)
        .into_iter()
        .map(MessageInput::from);

    let request = build_chat_completion_request(
        item.model.clone(),
        messages,
        ChatOptions {
            temperature: Some(item.temperature),
            top_p: Some(item.top_p),
            max_tokens: item.max_tokens,
            tools,
            tool_choice,
            ..ChatOptions::default()
        },
    )?;

    let response = api.chat_completions(&request).await?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| NeuraError::operation("No choices returned from API", item_index))?;

    log_debug!(
        item_index = item_index,
        model = %response.model,
        finish_reason = ?choice.finish_reason,
        "Chat completion received"
    );

    Ok(ChatOutput {
        content: choice.message.content.clone().unwrap_or_default(),
        finish_reason: choice.finish_reason,
        model: response.model,
        created: response.created,
        usage: response.usage,
        message: choice.message,
    })
}

/// Embeddings for one item
pub async fn execute_embeddings<A>(api: &A, item: &ItemParameters) -> NeuraResult<EmbeddingsOutput>
where
    A: CompletionApi + ?Sized,
{
    let input = EmbeddingInput::from_raw(&item.emb_input);
    let request = build_embeddings_request(item.emb_model.clone(), input, EmbeddingsOptions::default());

    let response = api.embeddings(&request).await?;

    Ok(EmbeddingsOutput {
        model: response.model,
        embeddings: response.data,
        usage: response.usage,
    })
}
