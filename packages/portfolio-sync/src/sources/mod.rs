//! Content source implementations.
//!
//! - [`RateLimitedSource`] - wraps any source with a request quota
//! - `GoogleDriveSource` - Drive v3 and Sheets v4 over REST (requires `google-drive` feature)

pub mod rate_limited;

#[cfg(feature = "google-drive")]
pub mod drive;

pub use rate_limited::{RateLimitedSource, SourceExt};

#[cfg(feature = "google-drive")]
pub use drive::GoogleDriveSource;
