// Unit Tests for the Workflow Node Executor
//
// UNIT UNDER TEST: node (execute, execute_item, shape_output, chat_messages)
//
// BUSINESS RESPONSIBILITY:
//   - Dispatches each host item to chat or embeddings
//   - Builds the request from item parameters (system/user text, tools JSON)
//   - Shapes the success record and optional raw/binary extras
//   - Records per-item failures when configured to continue, aborts otherwise
//   - Preserves input order in the output
//
// TEST COVERAGE:
//   - Chat output fields and request contents sent to the API
//   - Embeddings input parsing and output fields
//   - Unknown resource/operation
//   - Missing choices
//   - storeRaw and binaryFile
//   - continue_on_fail on and off

use crate::client::MockCompletionApi;
use crate::error::NeuraError;
use crate::node::*;
use crate::tests::helpers::{chat_response, embeddings_response};
use crate::types::{ChatCompletionResponse, EmbeddingInput, Role};
use base64::Engine;
use serde_json::json;

fn chat_item(user_message: &str) -> ItemParameters {
    ItemParameters {
        user_message: user_message.to_string(),
        ..ItemParameters::default()
    }
}

#[cfg(test)]
mod chat_item_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_item_output_and_request() {
        // Test verifies the request built from item parameters and the shape of
        // the output record

        // Arrange
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions()
            .withf(|request| {
                request.model == "gpt-4o-mini"
                    && request.messages.len() == 2
                    && request.messages[0].role == Role::System
                    && request.messages[0].content.as_deref() == Some("You are helpful")
                    && request.messages[1].content.as_deref() == Some("Hi")
                    && request.temperature == Some(0.7)
                    && request.top_p == Some(1.0)
                    && request.max_tokens.is_none()
                    && !request.stream
            })
            .times(1)
            .returning(|_| Ok(chat_response("Hello!")));

        let item = ItemParameters {
            system_message: "  You are helpful  ".to_string(),
            ..chat_item("Hi")
        };

        // Act
        let outputs = execute(&api, &[item], NodeSettings::default()).await.unwrap();

        // Assert
        assert_eq!(outputs.len(), 1);
        let json = &outputs[0].json;
        assert_eq!(json["content"], json!("Hello!"));
        assert_eq!(json["finish_reason"], json!("stop"));
        assert_eq!(json["model"], json!("gpt-4o-mini"));
        assert_eq!(json["created"], json!(1_700_000_000));
        assert_eq!(json["usage"]["total_tokens"], json!(15));
        assert_eq!(json["message"]["role"], json!("assistant"));
        assert!(json.get("raw").is_none());
        assert!(outputs[0].binary.is_none());
    }

    #[tokio::test]
    async fn test_chat_output_keeps_extra_message_fields() {
        // Arrange
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions().returning(|_| {
            let mut response = chat_response("hi");
            response.choices[0]
                .message
                .extra
                .insert("reasoning_content".to_string(), json!("thinking..."));
            Ok(response)
        });

        // Act
        let output = execute_item(&api, &chat_item("Hi"), 0).await.unwrap();

        // Assert
        assert_eq!(output.json["content"], json!("hi"));
        assert_eq!(
            output.json["message"]["reasoning_content"],
            json!("thinking...")
        );
    }

    #[test]
    fn test_blank_system_message_skipped() {
        let messages = chat_messages("   ", "Hi");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_tools_json_parsed_into_request() {
        // Arrange
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions()
            .withf(|request| {
                request.tools.as_ref().map(Vec::len) == Some(1)
                    && request.tool_choice.is_some()
            })
            .times(1)
            .returning(|_| Ok(chat_response("")));

        let item = ItemParameters {
            tools_json: json!({
                "tools": [{"type": "function", "function": {"name": "lookup"}}],
                "tool_choice": "required"
            })
            .to_string(),
            ..chat_item("Find it")
        };

        // Act
        let output = execute_item(&api, &item, 0).await.unwrap();

        // Assert
        assert_eq!(output.json["content"], json!(""));
    }

    #[tokio::test]
    async fn test_invalid_tools_json_fails_before_request() {
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions().times(0);

        let item = ItemParameters {
            tools_json: "{broken".to_string(),
            ..chat_item("Hi")
        };

        let result = execute_item(&api, &item, 0).await;

        match result {
            Err(NeuraError::Validation { message }) => {
                assert!(message.starts_with("Invalid tools JSON:"));
            }
            other => panic!("Expected validation error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_choices_is_an_operation_error() {
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions().returning(|_| {
            Ok(ChatCompletionResponse {
                choices: vec![],
                ..chat_response("unused")
            })
        });

        let result = execute_item(&api, &chat_item("Hi"), 4).await;

        match result {
            Err(NeuraError::Operation {
                message,
                item_index,
            }) => {
                assert_eq!(message, "No choices returned from API");
                assert_eq!(item_index, 4);
            }
            other => panic!("Expected operation error, got: {other:?}"),
        }
    }
}

#[cfg(test)]
mod embeddings_item_tests {
    use super::*;

    #[tokio::test]
    async fn test_embeddings_item_with_array_input() {
        // Arrange
        let mut api = MockCompletionApi::new();
        api.expect_embeddings()
            .withf(|request| {
                request.model == "text-embedding-ada-002"
                    && request.input
                        == EmbeddingInput::Batch(vec!["a".to_string(), "b".to_string()])
            })
            .times(1)
            .returning(|_| Ok(embeddings_response(2)));

        let item = ItemParameters {
            resource: "embeddings".to_string(),
            emb_input: r#"["a","b"]"#.to_string(),
            ..ItemParameters::default()
        };

        // Act
        let output = execute_item(&api, &item, 0).await.unwrap();

        // Assert
        assert_eq!(output.json["model"], json!("text-embedding-ada-002"));
        assert_eq!(output.json["embeddings"].as_array().map(Vec::len), Some(2));
        assert_eq!(output.json["usage"]["prompt_tokens"], json!(4));
    }

    #[tokio::test]
    async fn test_embeddings_item_with_plain_text() {
        let mut api = MockCompletionApi::new();
        api.expect_embeddings()
            .withf(|request| request.input == EmbeddingInput::Single("hello world".to_string()))
            .times(1)
            .returning(|_| Ok(embeddings_response(1)));

        let item = ItemParameters {
            resource: "embeddings".to_string(),
            emb_input: "hello world".to_string(),
            ..ItemParameters::default()
        };

        assert!(execute_item(&api, &item, 0).await.is_ok());
    }
}

#[cfg(test)]
mod output_shaping_tests {
    use super::*;

    #[test]
    fn test_store_raw_duplicates_output() {
        let options = AdvancedOptions {
            store_raw: true,
            binary_file: String::new(),
        };

        let output = shape_output(json!({"content": "x"}), &options).unwrap();

        assert_eq!(output.json["raw"], json!({"content": "x"}));
        assert_eq!(output.json["content"], json!("x"));
    }

    #[test]
    fn test_binary_file_attaches_pretty_json() {
        // Arrange
        let options = AdvancedOptions {
            store_raw: false,
            binary_file: "response.json".to_string(),
        };
        let response = json!({"content": "x"});

        // Act
        let output = shape_output(response.clone(), &options).unwrap();

        // Assert
        let binary = output.binary.expect("binary attachment");
        assert_eq!(binary.property, "response.json");
        assert_eq!(binary.file_name, "response.json");
        assert_eq!(binary.mime_type, "application/json");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(binary.data)
            .unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            serde_json::to_string_pretty(&response).unwrap()
        );
    }

    #[test]
    fn test_advanced_options_deserialize_from_host() {
        let item: ItemParameters = serde_json::from_value(json!({
            "resource": "chat",
            "operation": "create",
            "userMessage": "Hi",
            "maxTokens": 128,
            "advancedOptions": {"storeRaw": true, "binaryFile": "out.json"}
        }))
        .unwrap();

        assert_eq!(item.model, "gpt-4o-mini");
        assert_eq!(item.temperature, 0.7);
        assert_eq!(item.max_tokens, Some(128));
        assert!(item.advanced_options.store_raw);
        assert_eq!(item.advanced_options.binary_file, "out.json");
    }

    #[test]
    fn test_blank_max_tokens_means_no_limit() {
        // Test verifies the host's blank default for maxTokens deserializes as
        // no limit instead of rejecting the item

        let parse = |max_tokens: serde_json::Value| -> ItemParameters {
            serde_json::from_value(json!({"userMessage": "Hi", "maxTokens": max_tokens}))
                .unwrap()
        };

        assert_eq!(parse(json!("")).max_tokens, None);
        assert_eq!(parse(json!(null)).max_tokens, None);
        assert_eq!(parse(json!("  ")).max_tokens, None);
        assert_eq!(parse(json!("256")).max_tokens, Some(256));
        assert_eq!(parse(json!(64)).max_tokens, Some(64));
        assert_eq!(parse(json!(32.0)).max_tokens, Some(32));

        let from_text: ItemParameters =
            serde_json::from_str(r#"{"userMessage":"Hi","maxTokens":""}"#).unwrap();
        assert_eq!(from_text.max_tokens, None);
        assert_eq!(from_text.user_message, "Hi");
    }

    #[tokio::test]
    async fn test_blank_max_tokens_omitted_from_request() {
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions()
            .withf(|request| request.max_tokens.is_none())
            .times(1)
            .returning(|_| Ok(chat_response("ok")));

        let item: ItemParameters =
            serde_json::from_value(json!({"userMessage": "Hi", "maxTokens": ""})).unwrap();

        assert!(execute_item(&api, &item, 0).await.is_ok());
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_operation_rejected() {
        let api = MockCompletionApi::new();
        let item = ItemParameters {
            resource: "images".to_string(),
            ..ItemParameters::default()
        };

        let result = execute(&api, &[item], NodeSettings::default()).await;

        match result {
            Err(error) => assert_eq!(
                error.to_string(),
                "Unknown resource \"images\" or operation \"create\""
            ),
            Ok(outputs) => panic!("Expected failure, got: {outputs:?}"),
        }
    }

    #[tokio::test]
    async fn test_continue_on_fail_records_errors_in_order() {
        // Test verifies a failing middle item becomes an error record while the
        // surrounding items still succeed, in input order

        // Arrange
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions()
            .times(2)
            .returning(|request| {
                let text = request.messages[0].content.clone().unwrap_or_default();
                Ok(chat_response(&text))
            });

        let items = vec![
            chat_item("first"),
            ItemParameters {
                resource: "unknown".to_string(),
                ..chat_item("second")
            },
            chat_item("third"),
        ];

        // Act
        let outputs = execute(
            &api,
            &items,
            NodeSettings {
                continue_on_fail: true,
            },
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].json["content"], json!("first"));
        assert_eq!(
            outputs[1].json,
            json!({
                "error": "Unknown resource \"unknown\" or operation \"create\"",
                "itemIndex": 1
            })
        );
        assert_eq!(outputs[2].json["content"], json!("third"));
    }

    #[tokio::test]
    async fn test_failure_aborts_without_continue_on_fail() {
        let mut api = MockCompletionApi::new();
        api.expect_chat_completions()
            .times(1)
            .returning(|_| Err(NeuraError::http_error(400, Some("Bad Request"))));

        let items = vec![chat_item("first"), chat_item("second")];

        let result = execute(&api, &items, NodeSettings::default()).await;

        match result {
            Err(NeuraError::Http { http_code, .. }) => assert_eq!(http_code, 400),
            other => panic!("Expected Http error, got: {other:?}"),
        }
    }
}
