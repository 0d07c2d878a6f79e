// Portfolio Sync - API Core
//
// HTTP surface over the portfolio-sync pipeline: company folder listing,
// per-folder analysis and sync, holdings sheet sync, and the record list.

pub mod config;
pub mod server;

pub use config::*;
