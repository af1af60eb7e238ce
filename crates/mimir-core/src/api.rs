//! OpenAI-compatible chat completion types.
//!
//! The cache stores these verbatim and never inspects them beyond extracting
//! prompt text. Fields whose wire shape varies (message content, tool choice)
//! are modelled as enums so each shape is an explicit variant.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A chat completion request as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Target model name
    pub model: String,
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling mass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Number of choices to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Whether the client asked for a streamed response
    #[serde(default, skip_serializing_if = "is_false")]
    pub stream: bool,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Presence penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// End-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Legacy function definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDefinition>,
    /// Legacy function call control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallChoice>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    /// Tool call control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Requested response format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Deterministic sampling seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

const fn is_false(value: &bool) -> bool {
    !*value
}

impl ChatCompletionRequest {
    /// Creates a request with the given model and messages and no options set
    pub fn new<T: Into<String>>(model: T, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            top_p: None,
            n: None,
            stream: false,
            stop: Vec::new(),
            max_tokens: None,
            presence_penalty: None,
            frequency_penalty: None,
            user: None,
            functions: Vec::new(),
            function_call: None,
            tools: Vec::new(),
            tool_choice: None,
            response_format: None,
            seed: None,
        }
    }

    /// Marks the request as streamed
    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author role (`system`, `user`, `assistant`, `tool`, ...)
    pub role: String,
    /// Message body; absent on assistant messages that only carry tool calls
    #[serde(default)]
    pub content: Option<MessageContent>,
    /// Optional author name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Legacy function call made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a plain-text message with the given role
    pub fn new<R: Into<String>, T: Into<String>>(role: R, text: T) -> Self {
        Self {
            role: role.into(),
            content: Some(MessageContent::Text(text.into())),
            name: None,
            function_call: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Creates a `user` message
    pub fn user<T: Into<String>>(text: T) -> Self {
        Self::new("user", text)
    }

    /// Creates a `system` message
    pub fn system<T: Into<String>>(text: T) -> Self {
        Self::new("system", text)
    }

    /// Creates an `assistant` message
    pub fn assistant<T: Into<String>>(text: T) -> Self {
        Self::new("assistant", text)
    }

    /// Text of the message, empty when it has no content
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::text)
            .unwrap_or_default()
    }
}

/// Message body: either a plain string or a list of multimodal parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body
    Text(String),
    /// Structured multimodal body
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of the body; image parts contribute nothing
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One part of a multimodal message, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part
    Text {
        /// Part text
        text: String,
    },
    /// Image reference part
    ImageUrl {
        /// Image location
        image_url: ImageUrl,
    },
}

/// Image reference inside a content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Image URL or data URI
    pub url: String,
    /// Requested detail level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A callable function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<JsonValue>,
}

/// A function invocation produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// A tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind, `function` for all current tools
    #[serde(rename = "type")]
    pub kind: String,
    /// Function exposed by the tool
    pub function: FunctionDefinition,
}

/// A tool invocation produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier
    pub id: String,
    /// Tool kind
    #[serde(rename = "type")]
    pub kind: String,
    /// Invoked function
    pub function: FunctionCall,
}

/// Reference to a function by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionName {
    /// Function name
    pub name: String,
}

/// Keyword modes shared by `tool_choice` and `function_call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    /// Never call tools
    None,
    /// Let the model decide
    Auto,
    /// Force some tool call
    Required,
}

/// Tool call control: a keyword mode or a specific tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// Keyword mode
    Mode(ToolChoiceMode),
    /// Force a specific tool
    Named {
        /// Tool kind
        #[serde(rename = "type")]
        kind: String,
        /// Function to call
        function: FunctionName,
    },
}

/// Legacy function call control: a keyword mode or a specific function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionCallChoice {
    /// Keyword mode
    Mode(ToolChoiceMode),
    /// Force a specific function
    Named(FunctionName),
}

/// Requested response format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Format kind (`text`, `json_object`, ...)
    #[serde(rename = "type")]
    pub kind: String,
}

/// A chat completion response from the upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier
    pub id: String,
    /// Object kind, `chat.completion`
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Model that produced the completion
    pub model: String,
    /// Generated choices
    pub choices: Vec<Choice>,
    /// Token accounting
    #[serde(default)]
    pub usage: Usage,
    /// Backend configuration fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<String> {
        self.choices.first().map(|choice| choice.message.text())
    }
}

/// One generated choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Position among the choices
    pub index: u32,
    /// Generated message
    pub message: Message,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Token log probabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Logprobs>,
}

/// Log probability information for a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logprobs {
    /// Per-token entries
    #[serde(default)]
    pub content: Vec<TokenLogprob>,
}

/// Log probability of one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLogprob {
    /// Token text
    pub token: String,
    /// Natural log probability
    pub logprob: f64,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u64,
    /// Tokens in the completion
    pub completion_tokens: u64,
    /// Sum of both
    pub total_tokens: u64,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test code is allowed to use unwrap and has different conventions"
)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_content_string_and_parts() {
        let plain: Message = from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(plain.content, Some(MessageContent::Text("hello".to_owned())));
        assert_eq!(plain.text(), "hello");

        let parts: Message = from_str(
            r#"{"role":"user","content":[
                {"type":"text","text":"what is"},
                {"type":"image_url","image_url":{"url":"https://example.com/cat.png"}},
                {"type":"text","text":"this?"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(parts.content, Some(MessageContent::Parts(ref items)) if items.len() == 3));
        assert_eq!(parts.text(), "what is this?");
    }

    #[test]
    fn test_null_content_for_tool_calls() {
        let message: Message = from_str(
            r#"{"role":"assistant","content":null,"tool_calls":[
                {"id":"call_1","type":"function","function":{"name":"lookup","arguments":"{}"}}
            ]}"#,
        )
        .unwrap();
        assert!(message.content.is_none());
        assert_eq!(message.text(), "");
        assert_eq!(message.tool_calls[0].function.name, "lookup");
    }

    #[test]
    fn test_tool_choice_variants() {
        let auto: ToolChoice = from_str(r#""auto""#).unwrap();
        assert_eq!(auto, ToolChoice::Mode(ToolChoiceMode::Auto));

        let named: ToolChoice =
            from_str(r#"{"type":"function","function":{"name":"get_weather"}}"#).unwrap();
        assert!(matches!(named, ToolChoice::Named { ref function, .. } if function.name == "get_weather"));

        let legacy: FunctionCallChoice = from_str(r#"{"name":"get_weather"}"#).unwrap();
        assert!(matches!(legacy, FunctionCallChoice::Named(_)));
        let legacy_none: FunctionCallChoice = from_str(r#""none""#).unwrap();
        assert_eq!(legacy_none, FunctionCallChoice::Mode(ToolChoiceMode::None));
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        let value = to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_response_first_text() {
        let response: ChatCompletionResponse = from_str(
            r#"{"id":"chatcmpl-1","object":"chat.completion","created":1700000000,
                "model":"gpt-4o","choices":[{"index":0,
                "message":{"role":"assistant","content":"Paris"},"finish_reason":"stop"}],
                "usage":{"prompt_tokens":9,"completion_tokens":1,"total_tokens":10}}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("Paris"));
        assert_eq!(response.usage.total_tokens, 10);
    }
}
