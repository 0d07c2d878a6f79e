//! Core trait abstractions for the portfolio sync library.
//!
//! These traits define the interfaces that applications implement
//! to provide content, storage and summarization.

pub mod source;
pub mod store;
pub mod summarizer;
