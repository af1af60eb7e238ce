//! Parsing of realistic OpenAI-compatible payloads.

#![allow(
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use mimir_core::{
    ChatCompletionRequest, ChatCompletionResponse, ContentPart, FunctionCallChoice,
    MessageContent, ToolChoice, ToolChoiceMode,
};
use serde_json::{from_str, from_value, json, to_value};

#[test]
fn test_tool_request_with_named_choice() {
    let request: ChatCompletionRequest = from_str(
        r#"{
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "You are a weather bot."},
                {"role": "user", "content": "Weather in Oslo?"},
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Oslo\"}"}
                    }]
                },
                {"role": "tool", "tool_call_id": "call_1", "content": "4C, rain"}
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Current weather for a city",
                    "parameters": {"type": "object", "properties": {"city": {"type": "string"}}}
                }
            }],
            "tool_choice": {"type": "function", "function": {"name": "get_weather"}},
            "temperature": 0.2,
            "seed": 7
        }"#,
    )
    .unwrap();

    assert_eq!(request.messages.len(), 4);
    assert!(request.messages[2].content.is_none());
    assert_eq!(request.messages[2].tool_calls[0].function.name, "get_weather");
    assert_eq!(request.messages[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(request.tools[0].kind, "function");
    assert!(matches!(
        request.tool_choice,
        Some(ToolChoice::Named { ref function, .. }) if function.name == "get_weather"
    ));
    assert_eq!(request.seed, Some(7));
    assert!(!request.stream);
}

#[test]
fn test_legacy_function_call_modes() {
    let auto: ChatCompletionRequest = from_str(
        r#"{"model": "gpt-3.5-turbo", "messages": [], "function_call": "auto"}"#,
    )
    .unwrap();
    assert_eq!(
        auto.function_call,
        Some(FunctionCallChoice::Mode(ToolChoiceMode::Auto))
    );

    let named: ChatCompletionRequest = from_str(
        r#"{"model": "gpt-3.5-turbo", "messages": [], "function_call": {"name": "lookup"}}"#,
    )
    .unwrap();
    assert!(matches!(
        named.function_call,
        Some(FunctionCallChoice::Named(ref function)) if function.name == "lookup"
    ));
}

#[test]
fn test_multimodal_message_text() {
    let request: ChatCompletionRequest = from_str(
        r#"{
            "model": "gpt-4o",
            "stream": true,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is in"},
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png", "detail": "low"}},
                    {"type": "text", "text": "this picture?"}
                ]
            }]
        }"#,
    )
    .unwrap();

    assert!(request.stream);
    let Some(MessageContent::Parts(parts)) = &request.messages[0].content else {
        panic!("expected structured content");
    };
    assert!(matches!(parts[1], ContentPart::ImageUrl { .. }));
    assert_eq!(request.messages[0].text(), "What is in this picture?");
}

#[test]
fn test_response_round_trips_through_json() {
    let body = json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Paris."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 2, "total_tokens": 14},
        "system_fingerprint": "fp_abc"
    });

    let response: ChatCompletionResponse = from_value(body.clone()).unwrap();
    assert_eq!(response.first_text().as_deref(), Some("Paris."));
    assert_eq!(response.usage.total_tokens, 14);

    let reencoded = to_value(&response).unwrap();
    assert_eq!(reencoded["choices"][0]["message"]["content"], "Paris.");
    assert_eq!(reencoded["usage"], body["usage"]);
}
