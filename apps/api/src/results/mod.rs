// Results aggregation, the summary cache, and dashboard statistics.

pub mod aggregator;
pub mod cache;
pub mod dashboard;
pub mod handlers;
