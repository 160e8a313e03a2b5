//! LLM Client Layer - Anthropic API integration and the tool-using agent
//!
//! This module provides:
//! - Content-block message types for LLM communication
//! - LlmClient trait for API abstraction
//! - AnthropicClient implementation
//! - AgentInvoker, which runs a role's model/tool conversation

pub mod agent;
pub mod anthropic;
pub mod client;
pub mod types;

pub use agent::AgentInvoker;
pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, MockLlmClient};
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, Speaker, StopReason, ToolCall, ToolDefinition, Usage,
};
