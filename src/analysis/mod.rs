//! Insight collection.
//!
//! Fans analytics-process calls out across reporting periods and merges the
//! results into a period-keyed dataset.

pub mod aggregator;
pub mod fan_out;
pub mod filters;

pub use aggregator::InsightAggregator;
pub use filters::InsightFilter;
