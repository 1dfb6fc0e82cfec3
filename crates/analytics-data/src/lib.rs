//! Data layer for player analytics.
//!
//! Loads the player CSV, selects records by the dashboard filters, runs the
//! aggregation queries and assembles them into a dashboard report.

pub mod aggregator;
pub mod analysis;
pub mod dashboard;
pub mod filter;
pub mod reader;

pub use analytics_core as core;
