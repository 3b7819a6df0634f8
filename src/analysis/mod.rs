//! Analysis modules.
//!
//! Aggregation of the renewal CSV into the dashboard dataset.

pub mod aggregator;

pub use aggregator::aggregate;
