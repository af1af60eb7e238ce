//! Semantic cache gateway for OpenAI-compatible chat completions.
//!
//! [`SemanticGateway`] embeds each non-streaming request, replays a stored
//! response when a similar enough request was served before, and records
//! upstream responses on misses. [`CacheStatus`] describes the outcome as
//! response headers.

/// Cache flow around an upstream backend.
pub mod gateway;
/// Prompt text used as the cache key.
pub mod prompt;
/// Cache status reporting.
pub mod status;

pub use gateway::{Lookup, SemanticGateway};
pub use prompt::prompt_text;
pub use status::{CACHE_HEADER, CacheOutcome, CacheStatus, SIMILARITY_HEADER};
