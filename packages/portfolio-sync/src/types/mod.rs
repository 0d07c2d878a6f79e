//! Data types for the portfolio sync library.

pub mod config;
pub mod item;
pub mod record;
pub mod scan;
