//! Core types shared across the Mimir semantic cache.
//!
//! This crate provides the error type, configuration, the OpenAI-compatible
//! request/response schema stored in cache entries, and the standard tracing
//! setup used by hosts embedding the cache.

/// OpenAI-compatible chat completion schema.
pub mod api;
/// Configuration for the cache and embedding backend.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Tracing subscriber setup.
pub mod telemetry;

pub use api::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ContentPart, FunctionCall,
    FunctionCallChoice, FunctionDefinition, FunctionName, ImageUrl, Logprobs, Message,
    MessageContent, ResponseFormat, TokenLogprob, Tool, ToolCall, ToolChoice, ToolChoiceMode,
    Usage,
};
pub use config::{CacheConfig, EmbeddingConfig, MimirConfig};
pub use error::{Error, Result};
