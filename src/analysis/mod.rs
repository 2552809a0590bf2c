//! Analysis modules.
//!
//! Aggregation over a fetched event set: totals, strongest events and
//! per-year statistics.

pub mod aggregator;

pub use aggregator::*;
