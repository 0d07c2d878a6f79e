//! Summarizer implementations for the sync library.
//!
//! This module provides reference implementations of the `Summarizer` trait.
//! Users can use these directly or implement their own.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAiSummarizer;
