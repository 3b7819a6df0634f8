//! Dataset retrieval.
//!
//! Fetching over HTTP and the strategies that decide which URL to fetch.

pub mod fetcher;
pub mod resolver;

pub use fetcher::Fetcher;
pub use resolver::{DirectSource, MetadataSource, SourceResolver};
