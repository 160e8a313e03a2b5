//! Conversation types shared by the clients and the agent
//!
//! Messages carry content blocks so a multi-turn tool conversation (assistant
//! `tool_use`, then user `tool_result`) can be replayed to the API verbatim.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One piece of message content, serialized in the API's block shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Speaker,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: Speaker::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Echo an assistant turn back into the conversation
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Message {
            role: Speaker::Assistant,
            content,
        }
    }

    /// User turn answering the previous assistant turn's tool calls
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Message {
            role: Speaker::User,
            content: results,
        }
    }
}

/// A tool as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One `tool_use` block lifted out of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Everything one model call needs. `None` fields fall back to the client's config.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>) -> Self {
        CompletionRequest {
            system: system.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_user_message(self, text: impl Into<String>) -> Self {
        self.with_message(Message::user(text))
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// One model turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// A plain text turn that ends the conversation
    pub fn text(text: impl Into<String>) -> Self {
        CompletionResponse {
            content: vec![ContentBlock::text(text)],
            ..Default::default()
        }
    }

    /// A turn that asks for tools to be run
    pub fn tool_use(calls: Vec<ToolCall>) -> Self {
        let content = calls
            .into_iter()
            .map(|ToolCall { id, name, input }| ContentBlock::ToolUse { id, name, input })
            .collect();
        CompletionResponse {
            content,
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }

    /// All text blocks, newline-joined
    pub fn text_content(&self) -> String {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        texts.join("\n")
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall::new(id, name, input.clone())),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Only a tool_use stop expects the caller to answer with tool results
    pub fn needs_continuation(&self) -> bool {
        *self == StopReason::ToolUse
    }
}

/// Token counts as reported by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Usage {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_conversation_serializes_in_api_shape() {
        let conversation = vec![
            Message::user("fix the tests"),
            Message::assistant(vec![
                ContentBlock::text("Reading first"),
                ContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "read_file".to_string(),
                    input: json!({"path": "a"}),
                },
            ]),
            Message::tool_results(vec![ContentBlock::tool_result("toolu_1", "contents", false)]),
        ];
        let value = serde_json::to_value(&conversation).unwrap();

        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[0]["content"][0], json!({"type": "text", "text": "fix the tests"}));
        assert_eq!(value[1]["role"], "assistant");
        assert_eq!(value[1]["content"][1]["type"], "tool_use");
        assert_eq!(value[1]["content"][1]["input"]["path"], "a");
        assert_eq!(value[2]["role"], "user");
        assert_eq!(
            value[2]["content"][0],
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "contents", "is_error": false})
        );
    }

    #[test]
    fn test_text_content_skips_tool_blocks() {
        let response = CompletionResponse {
            content: vec![
                ContentBlock::text("Let me look"),
                ContentBlock::ToolUse {
                    id: "toolu_1".to_string(),
                    name: "glob".to_string(),
                    input: json!({"pattern": "*.rs"}),
                },
                ContentBlock::text("and then"),
            ],
            stop_reason: StopReason::ToolUse,
            usage: Usage::new(10, 5),
        };

        assert_eq!(response.text_content(), "Let me look\nand then");
        let calls = response.tool_calls();
        assert_eq!(calls, vec![ToolCall::new("toolu_1", "glob", json!({"pattern": "*.rs"}))]);
    }

    #[test]
    fn test_response_shortcuts() {
        let done = CompletionResponse::text("finished");
        assert_eq!(done.stop_reason, StopReason::EndTurn);
        assert!(!done.stop_reason.needs_continuation());
        assert!(done.tool_calls().is_empty());

        let call = CompletionResponse::tool_use(vec![ToolCall::new("t1", "read_file", json!({}))]);
        assert!(call.stop_reason.needs_continuation());
        assert_eq!(call.tool_calls()[0].id, "t1");
        assert_eq!(call.text_content(), "");
    }

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("system")
            .with_user_message("first")
            .with_messages(vec![Message::user("replaced")])
            .with_max_tokens(1000);

        assert_eq!(req.messages, vec![Message::user("replaced")]);
        assert_eq!(req.max_tokens, Some(1000));
        assert!(req.model.is_none());
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = Usage::default();
        usage += Usage::new(100, 50);
        usage += Usage::new(200, 100);
        assert_eq!(usage, Usage::new(300, 150));
        assert_eq!(usage.total(), 450);
    }

    #[test]
    fn test_usage_tolerates_extra_and_missing_fields() {
        let usage: Usage = serde_json::from_value(json!({"input_tokens": 7, "cache_read_input_tokens": 3})).unwrap();
        assert_eq!(usage, Usage::new(7, 0));
    }
}
