//! Fetch → sanitize → write for a single feed.

pub mod fetch;
mod parse;
pub mod sanitize;
pub mod types;
mod write;

pub use fetch::{FeedSource, FetchError};
pub use types::IngestReport;
pub use write::ingest;
