//! Summarizer trait for the language-model step.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Turns an assembled prompt into free text.
///
/// Implementations wrap a specific LLM provider. Output is best-effort and
/// non-deterministic: it may be prose, fenced JSON or malformed JSON, so
/// callers decode it with [`decode_analysis`](crate::pipeline::analysis::decode_analysis)
/// and treat a failed decode as "no structured data".
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Complete a prompt, spending at most `max_tokens` on the answer.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Get the summarizer name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: Summarizer + ?Sized> Summarizer for Arc<T> {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        (**self).complete(prompt, max_tokens).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
