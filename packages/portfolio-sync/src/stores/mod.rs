//! Storage implementations for the sync library.
//!
//! Available backends:
//! - `MemoryStore` - In-memory record store (always available)

pub mod memory;

pub use memory::MemoryStore;
